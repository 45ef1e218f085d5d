//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler. Every
//! data command opens the tournament through [`Workspace`], which loads
//! the configuration and the JSON snapshot into an in-memory store and
//! writes the snapshot back after a successful write.

pub mod activate;
pub mod bracket;
pub mod bye;
pub mod qualify;
pub mod result;
pub mod standings;
pub mod tiebreak;
pub mod validate;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::cli::args::{Cli, Commands, DataArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::RostrumError;
use crate::observability::{EventEmitter, init_metrics};
use crate::store::{MemoryStore, TournamentStore, snapshot};
use crate::tournament::Tournament;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), RostrumError> {
    match cli.command {
        Commands::Validate(args) => validate::run(&args),
        Commands::Result(args) => result::run(&args).await,
        Commands::Standings(args) => standings::run(&args).await,
        Commands::Qualify(args) => qualify::run(&args).await,
        Commands::Bracket(args) => bracket::run(&args).await,
        Commands::Bye(args) => bye::run(&args).await,
        Commands::Tiebreak(args) => tiebreak::run(&args).await,
        Commands::Activate(args) => activate::run(&args).await,
        Commands::Version(args) => version::run(&args),
    }
}

/// A tournament opened from a configuration file and a data snapshot.
pub struct Workspace {
    tournament: Tournament,
    data: PathBuf,
}

impl Workspace {
    /// Loads the configuration and snapshot named by `args`.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid tournament file, a store error
    /// for an unreadable snapshot, or an I/O error when the events file or
    /// metrics listener cannot be set up.
    pub async fn open(args: &DataArgs) -> Result<Self, RostrumError> {
        if let Some(port) = args.metrics_port {
            init_metrics(Some(port))?;
            tracing::info!(port, "Prometheus metrics endpoint started");
        }

        tracing::debug!(config = %args.config.display(), "loading configuration");
        let loaded = ConfigLoader::with_defaults().load(&args.config)?;
        log_warnings(&loaded.warnings);

        let store: Arc<dyn TournamentStore> = Arc::new(load_store(args)?);
        let events = match args.events {
            Some(ref path) => EventEmitter::from_file(path)?,
            None => EventEmitter::noop(),
        }
        .with_tournament(loaded.config.tournament.name.clone());

        let tournament = Tournament::open(loaded.config, store, Arc::new(events)).await?;
        Ok(Self {
            tournament,
            data: args.data.clone(),
        })
    }

    /// The opened tournament.
    #[must_use]
    pub const fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    /// Writes the store back to the data file.
    ///
    /// # Errors
    ///
    /// Returns a store error if the file cannot be written.
    pub async fn save(&self) -> Result<(), RostrumError> {
        snapshot::persist(self.tournament.store().as_ref(), &self.data).await?;
        Ok(())
    }
}

fn load_store(args: &DataArgs) -> Result<MemoryStore, RostrumError> {
    tracing::debug!(data = %args.data.display(), "loading snapshot");
    Ok(snapshot::open(&args.data)?)
}

pub(crate) fn log_warnings(warnings: &[LoadWarning]) {
    for warning in warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), RostrumError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
