//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Scoring, qualification and bracket engine for debate tournaments.
#[derive(Parser, Debug)]
#[command(name = "rostrum", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "ROSTRUM_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "ROSTRUM_LOG_FORMAT")]
    pub log_format: LogFormatChoice,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate tournament files.
    Validate(ValidateArgs),

    /// Show the aggregated result of a round.
    Result(RoundArgs),

    /// Show the cumulative standings of a phase.
    Standings(StandingsArgs),

    /// Show which teams play a round.
    Qualify(RoundArgs),

    /// Show the whole bracket.
    Bracket(BracketArgs),

    /// Record an uncontested advance.
    Bye(ByeArgs),

    /// Settle a tied round with dice and record the winner.
    Tiebreak(TiebreakArgs),

    /// Set the active round.
    Activate(ActivateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Tournament file, data file and observability options shared by every
/// command that works on tournament data.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Tournament configuration (YAML).
    #[arg(short, long, env = "ROSTRUM_CONFIG")]
    pub config: PathBuf,

    /// Tournament data snapshot (JSON).
    #[arg(short, long, env = "ROSTRUM_DATA")]
    pub data: PathBuf,

    /// Append structured events (JSONL) to this file.
    #[arg(long, env = "ROSTRUM_EVENTS")]
    pub events: Option<PathBuf>,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "ROSTRUM_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Tournament files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for commands addressing one round.
#[derive(Args, Debug)]
pub struct RoundArgs {
    /// Data options.
    #[command(flatten)]
    pub data: DataArgs,

    /// Round name.
    pub round: String,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `standings`.
#[derive(Args, Debug)]
pub struct StandingsArgs {
    /// Data options.
    #[command(flatten)]
    pub data: DataArgs,

    /// Phase name.
    pub phase: String,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `bracket`.
#[derive(Args, Debug)]
pub struct BracketArgs {
    /// Data options.
    #[command(flatten)]
    pub data: DataArgs,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `bye`.
#[derive(Args, Debug)]
pub struct ByeArgs {
    /// Data options.
    #[command(flatten)]
    pub data: DataArgs,

    /// Round name.
    pub round: String,

    /// Advancing team.
    pub team: String,
}

/// Arguments for `tiebreak`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("dice_source").multiple(false))]
pub struct TiebreakArgs {
    /// Data options.
    #[command(flatten)]
    pub data: DataArgs,

    /// Round name.
    pub round: String,

    /// Seed for reproducible rolls.
    #[arg(long, group = "dice_source")]
    pub seed: Option<u64>,

    /// Faces rolled with physical dice, in team order, comma separated.
    #[arg(long, value_delimiter = ',', group = "dice_source")]
    pub dice: Vec<u8>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `activate`.
#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Data options.
    #[command(flatten)]
    pub data: DataArgs,

    /// Round name.
    pub round: String,

    /// Place these teams instead of the computed line-up (repeatable).
    #[arg(short, long = "team")]
    pub teams: Vec<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatChoice {
    /// Human-readable lines.
    #[default]
    Human,
    /// JSON lines.
    Json,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_result_command() {
        let cli = parse(&["rostrum", "result", "-c", "t.yaml", "-d", "d.json", "Ronda 1"]);
        match cli.command {
            Commands::Result(args) => {
                assert_eq!(args.round, "Ronda 1");
                assert_eq!(args.format, OutputFormat::Human);
                assert!(args.data.events.is_none());
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn test_data_args_required() {
        let result = Cli::try_parse_from(["rostrum", "result", "Ronda 1"]);
        // Only an error when the environment does not provide them.
        if std::env::var_os("ROSTRUM_CONFIG").is_none() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_tiebreak_dice_list() {
        let cli = parse(&[
            "rostrum", "tiebreak", "-c", "t.yaml", "-d", "d.json", "Ronda 1", "--dice", "5,2",
        ]);
        match cli.command {
            Commands::Tiebreak(args) => {
                assert_eq!(args.dice, [5, 2]);
                assert!(args.seed.is_none());
            }
            other => panic!("expected tiebreak, got {other:?}"),
        }
    }

    #[test]
    fn test_seed_and_dice_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "rostrum", "tiebreak", "-c", "t.yaml", "-d", "d.json", "R", "--seed", "1", "--dice",
            "1,2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_activate_repeated_teams() {
        let cli = parse(&[
            "rostrum", "activate", "-c", "t.yaml", "-d", "d.json", "Final", "--team", "TeamA",
            "-t", "TeamB",
        ]);
        match cli.command {
            Commands::Activate(args) => assert_eq!(args.teams, ["TeamA", "TeamB"]),
            other => panic!("expected activate, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&["rostrum", "-vv", "--color", "never", "version", "--format", "json"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(matches!(
            cli.command,
            Commands::Version(VersionArgs {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_validate_requires_files() {
        assert!(Cli::try_parse_from(["rostrum", "validate"]).is_err());
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["rostrum", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
