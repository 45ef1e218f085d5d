//! Logging setup for the `rostrum` binary.
//!
//! `-v` flags raise the level of rostrum's own targets only; dependencies
//! stay at `warn`. `ROSTRUM_LOG_LEVEL` replaces the whole filter.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{ColorChoice, LogFormatChoice};

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "ROSTRUM_LOG_LEVEL";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Human => Self::Human,
            LogFormatChoice::Json => Self::Json,
        }
    }
}

/// Filter directive for a `-v` count: `warn`, `info`, `debug`, then `trace`
/// for rostrum targets.
#[must_use]
pub fn directive_for(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,rostrum={level}")
}

/// Whether to emit ANSI colours on stderr.
#[must_use]
pub const fn wants_ansi(color: ColorChoice, stderr_is_tty: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_tty && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directive_for(verbosity)));
    let with_target = verbosity >= 2;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(with_target)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder
            .with_ansi(wants_ansi(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            ))
            .try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_only_raises_own_targets() {
        assert_eq!(directive_for(0), "warn,rostrum=warn");
        assert_eq!(directive_for(1), "warn,rostrum=info");
        assert_eq!(directive_for(2), "warn,rostrum=debug");
        assert_eq!(directive_for(9), "warn,rostrum=trace");
    }

    #[test]
    fn directives_parse() {
        for v in 0..4 {
            assert!(directive_for(v).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn auto_color_needs_a_terminal_and_no_opt_out() {
        assert!(wants_ansi(ColorChoice::Auto, true, false));
        assert!(!wants_ansi(ColorChoice::Auto, true, true));
        assert!(!wants_ansi(ColorChoice::Auto, false, false));
        assert!(wants_ansi(ColorChoice::Always, false, true));
        assert!(!wants_ansi(ColorChoice::Never, true, false));
    }

    #[test]
    fn format_choice_maps_across() {
        assert_eq!(LogFormat::from(LogFormatChoice::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(LogFormatChoice::Human), LogFormat::Human);
    }

    #[test]
    fn repeated_init_is_ignored() {
        init_logging(LogFormat::Human, 0, ColorChoice::Auto);
        init_logging(LogFormat::Json, 3, ColorChoice::Never);
    }
}
