//! `Rostrum` - tournament progression engine for debate competitions
//!
//! Turns judges' score submissions into match results, phase standings,
//! qualified line-ups and a bracket view, settles ties with dice and keeps
//! track of the active round.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod observability;
pub mod store;
pub mod tournament;

pub use error::{Result, RostrumError};
pub use tournament::Tournament;
