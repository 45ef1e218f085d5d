//! `rostrum version`

use serde::Serialize;

use super::print_json;
use crate::cli::args::{OutputFormat, VersionArgs};
use crate::config::QualificationPolicy;
use crate::error::RostrumError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    policies: &'static [&'static str],
}

impl VersionInfo {
    const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            policies: QualificationPolicy::NAMES,
        }
    }
}

/// Prints the crate version and the qualification policies it understands.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn run(args: &VersionArgs) -> Result<(), RostrumError> {
    let info = VersionInfo::current();
    match args.format {
        OutputFormat::Human => {
            println!("{} {}", info.name, info.version);
            println!("{}", info.description);
            println!("policies: {}", info.policies.join(", "));
            Ok(())
        }
        OutputFormat::Json => print_json(&info),
    }
}
