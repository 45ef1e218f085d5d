//! Configuration loader
//!
//! Loading pipeline:
//! 1. File size check
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing
//! 4. Deserialization to typed config
//! 5. Validation
//! 6. Freeze with `Arc`

use crate::config::schema::TournamentConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of phases.
    pub max_phases: usize,

    /// Maximum number of round overrides.
    pub max_rounds: usize,

    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_phases: env_or("ROSTRUM_MAX_PHASES", 32),
            max_rounds: env_or("ROSTRUM_MAX_ROUNDS", 512),
            max_config_size: env_or("ROSTRUM_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<TournamentConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a tournament file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is unset
    /// - YAML parsing or deserialization fails
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > limit {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {limit} bytes"),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: format!("cannot read file: {e}"),
        })?;

        self.load_str(&raw, path)
    }

    /// Loads a tournament definition from already-read text.
    ///
    /// `source` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus file access.
    pub fn load_str(&self, raw: &str, source: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        // Handle UTF-8 BOM
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, source)?;
        warnings.extend(env_sub.warnings);

        let root: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: source.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: source.to_path_buf(),
                line: None,
                message: "Configuration file is empty".to_string(),
            });
        }

        let config: TournamentConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: source.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: format!("Failed to deserialize configuration: {e}"),
            })?;

        let validation = Validator::new().validate(&config, &self.options.config_limits);
        if validation.has_errors() {
            return Err(ConfigError::ValidationError {
                path: source.display().to_string(),
                errors: validation.errors,
            });
        }

        warnings.extend(validation.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        tracing::debug!(
            tournament = %config.tournament.name,
            phases = config.phases.len(),
            overrides = config.rounds.len(),
            "tournament configuration loaded"
        );

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text BEFORE parsing to preserve type inference.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw: &str, source: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = Self::parse_var_spec(&mut chars, source)?;
                    match std::env::var(&spec.name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => match (spec.default, spec.required) {
                            (Some(default), _) => result.push_str(&default),
                            (None, Some(message)) => {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: spec.name,
                                    location: message,
                                });
                            }
                            (None, None) => self.warnings.push(LoadWarning {
                                message: format!(
                                    "Environment variable '{}' is not set, using empty string",
                                    spec.name
                                ),
                                location: Some(source.display().to_string()),
                            }),
                        },
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Parses a variable specification after `${`.
    fn parse_var_spec(
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
        source: &Path,
    ) -> Result<VarSpec, ConfigError> {
        let mut name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => {
                    return Ok(VarSpec {
                        name,
                        default: None,
                        required: None,
                    });
                }
                ':' if chars.peek() == Some(&'-') => {
                    chars.next();
                    let default = Self::read_until_close(chars, source)?;
                    return Ok(VarSpec {
                        name,
                        default: Some(default),
                        required: None,
                    });
                }
                ':' if chars.peek() == Some(&'?') => {
                    chars.next();
                    let message = Self::read_until_close(chars, source)?;
                    return Ok(VarSpec {
                        name,
                        default: None,
                        required: Some(message),
                    });
                }
                _ => name.push(c),
            }
        }

        Err(ConfigError::ParseError {
            path: source.to_path_buf(),
            line: None,
            message: format!("Unclosed environment variable reference: ${{{name}"),
        })
    }

    /// Reads content until the matching `}`.
    fn read_until_close(
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
        source: &Path,
    ) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                }
                _ => {}
            }
            value.push(c);
        }

        Err(ConfigError::ParseError {
            path: source.to_path_buf(),
            line: None,
            message: "Unclosed environment variable reference".to_string(),
        })
    }
}

/// A parsed `${...}` reference.
struct VarSpec {
    name: String,
    default: Option<String>,
    required: Option<String>,
}

/// Reads a numeric limit from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = "tournament: { name: Torneo }\nphases: { Fase de Grupos: {} }\n";

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal() {
        let file = write_temp(MINIMAL);
        let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(result.config.tournament.name, "Torneo");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::with_defaults()
            .load(Path::new("/nonexistent/tournament.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = write_temp("");
        let err = ConfigLoader::with_defaults().load(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = format!("\u{feff}{MINIMAL}");
        let result = ConfigLoader::with_defaults()
            .load_str(&text, Path::new("bom.yaml"))
            .unwrap();
        assert_eq!(result.config.phases.len(), 1);
    }

    #[test]
    fn test_size_limit() {
        let file = write_temp(MINIMAL);
        let loader = ConfigLoader::new(LoaderOptions {
            config_limits: ConfigLimits {
                max_config_size: 10,
                ..ConfigLimits::default()
            },
        });
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_env_default_used() {
        let text = "tournament: { name: \"${ROSTRUM_TEST_UNSET_NAME_XYZ:-Copa Escolar}\" }\nphases: { G: {} }\n";
        let result = ConfigLoader::with_defaults()
            .load_str(text, Path::new("env.yaml"))
            .unwrap();
        assert_eq!(result.config.tournament.name, "Copa Escolar");
    }

    #[test]
    fn test_env_required_missing() {
        let text = "tournament: { name: \"${ROSTRUM_TEST_REQUIRED_XYZ:?set the name}\" }\nphases: { G: {} }\n";
        let err = ConfigLoader::with_defaults()
            .load_str(text, Path::new("env.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotSet { .. }));
    }

    #[test]
    fn test_env_unset_warns() {
        let text = "tournament: { name: \"Copa ${ROSTRUM_TEST_WARN_XYZ}\" }\nphases: { G: {} }\n";
        let result = ConfigLoader::with_defaults()
            .load_str(text, Path::new("env.yaml"))
            .unwrap();
        assert_eq!(result.config.tournament.name, "Copa ");
        assert!(result.warnings[0].message.contains("ROSTRUM_TEST_WARN_XYZ"));
    }

    #[test]
    fn test_dollar_escape() {
        let text = "tournament: { name: \"Premio $$100\" }\nphases: { G: {} }\n";
        let result = ConfigLoader::with_defaults()
            .load_str(text, Path::new("env.yaml"))
            .unwrap();
        assert_eq!(result.config.tournament.name, "Premio $100");
    }

    #[test]
    fn test_validation_errors_surface() {
        let text = "tournament: { name: T }\nphases:\n  Final:\n    qualification: { policy: top_from_phase, phase: Nope, count: 2 }\n";
        let err = ConfigLoader::with_defaults()
            .load_str(text, Path::new("bad.yaml"))
            .unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => {
                assert!(errors[0].message.contains("Unknown source phase"));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_validation_warnings_become_load_warnings() {
        let text = "tournament: { name: T }\nphases:\n  Final:\n    qualification: { policy: winners_of, rounds: [S1, S1] }\n";
        let result = ConfigLoader::with_defaults()
            .load_str(text, Path::new("warn.yaml"))
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.warnings[0].location.as_deref(),
            Some("phases.Final.qualification")
        );
    }
}
