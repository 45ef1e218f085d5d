//! Error types for `Rostrum`
//!
//! Steady states of a running tournament (a pending match, a tied match,
//! an undetermined bracket slot) are modelled as values, not errors. The
//! types here cover configuration problems, store failures and the
//! write-side guards that must be reported back to staff.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `Rostrum` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Store error (unreadable snapshot, rejected write)
    pub const STORE_ERROR: i32 = 4;

    /// Engine error (duplicate bye, duplicate tie-break, unknown team)
    pub const ENGINE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `Rostrum` operations.
#[derive(Debug, Error)]
pub enum RostrumError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persistence boundary error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tournament engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),
}

impl RostrumError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Store(_) => ExitCode::STORE_ERROR,
            Self::Engine(_) => ExitCode::ENGINE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "phases.Fase de Finales.qualification")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Store Errors
// ============================================================================

/// Errors raised at the document-store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot file could not be read or written
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot document could not be (de)serialized
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot document is structurally invalid
    #[error("malformed snapshot {path}: {message}")]
    Malformed {
        /// Path of the snapshot file
        path: PathBuf,
        /// What is wrong with it
        message: String,
    },
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Tournament engine errors.
///
/// Only the write-side guards and referential problems end up here;
/// pending and tied matches are ordinary [`Resolution`](crate::engine::Resolution)
/// values.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Round name not present in the `rounds` collection
    #[error("unknown round '{round}'{}", hint(.suggestion))]
    UnknownRound {
        /// The requested round name
        round: String,
        /// Closest known round name, if any is close enough
        suggestion: Option<String>,
    },

    /// Phase name not declared in the tournament configuration
    #[error("unknown phase '{phase}'{}", hint(.suggestion))]
    UnknownPhase {
        /// The requested phase name
        phase: String,
        /// Closest declared phase name, if any is close enough
        suggestion: Option<String>,
    },

    /// A team name that is not on the verified roster
    #[error("team '{team}' referenced by round '{round}' is not a registered team{}", hint(.suggestion))]
    UnknownTeam {
        /// The offending team name
        team: String,
        /// Round whose computation referenced the team
        round: String,
        /// Closest roster name, if any is close enough
        suggestion: Option<String>,
    },

    /// A bye for this team and round has already been recorded
    #[error("the bye for '{team}' in round '{round}' has already been confirmed")]
    AlreadyAdvanced {
        /// Round of the bye
        round: String,
        /// Team that was advanced
        team: String,
    },

    /// A tie-break override for this round has already been recorded
    #[error("round '{round}' already has a tie-break result (winner: {winner})")]
    AlreadyResolved {
        /// Round of the tie-break
        round: String,
        /// Winner recorded by the existing override
        winner: String,
    },

    /// Tie-break requested for a round that is not tied
    #[error("round '{round}' is not tied")]
    NotATie {
        /// Round that was inspected
        round: String,
    },

    /// Qualification for a round still has empty slots
    #[error("round '{round}' is not fully determined yet ({open} open slot(s))")]
    NotDetermined {
        /// Round whose qualification was requested
        round: String,
        /// Number of slots still waiting on a feeder
        open: usize,
    },

    /// Tie-break state machine was driven out of order
    #[error("invalid tie-break transition: {0}")]
    InvalidTransition(String),

    /// Dice kept tying beyond the configured reroll limit
    #[error("tie-break for round '{round}' still tied after {attempts} rolls")]
    RerollLimit {
        /// Round of the tie-break
        round: String,
        /// Number of rolls performed
        attempts: u32,
    },

    /// A submitted score is structurally invalid
    #[error("invalid score submission: {0}")]
    InvalidSubmission(String),
}

#[allow(clippy::ref_option)]
fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_deref()
        .map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `Rostrum` operations.
pub type Result<T> = std::result::Result<T, RostrumError>;

// ============================================================================
// Tests
// ============================================================================
