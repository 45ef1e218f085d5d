//! `rostrum validate`
//!
//! Loads each tournament file through the configuration loader without
//! touching any data.

use serde_json::json;

use super::{log_warnings, print_json};
use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, RostrumError};

/// Validate tournament files.
///
/// # Errors
///
/// Returns an I/O error if any file does not exist, a config error if
/// validation fails, or a usage error when `--strict` is set and a file
/// produced warnings.
pub fn run(args: &ValidateArgs) -> Result<(), RostrumError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        if !path.exists() {
            return Err(ConfigError::MissingFile { path: path.clone() }.into());
        }
        tracing::info!(file = %path.display(), "validating configuration");

        let loaded = loader.load(path)?;
        log_warnings(&loaded.warnings);

        if args.strict && !loaded.warnings.is_empty() {
            return Err(RostrumError::Usage(format!(
                "{}: {} warning(s) with --strict",
                path.display(),
                loaded.warnings.len()
            )));
        }

        match args.format {
            OutputFormat::Human => {
                println!(
                    "{}: ok ({} phase(s), {} warning(s))",
                    path.display(),
                    loaded.config.phases.len(),
                    loaded.warnings.len()
                );
            }
            OutputFormat::Json => reports.push(json!({
                "file": path.display().to_string(),
                "valid": true,
                "phases": loaded.config.phases.keys().collect::<Vec<_>>(),
                "warnings": loaded
                    .warnings
                    .iter()
                    .map(|w| json!({ "message": w.message, "location": w.location }))
                    .collect::<Vec<_>>(),
            })),
        }
    }

    if args.format == OutputFormat::Json {
        print_json(&reports)?;
    }
    Ok(())
}
