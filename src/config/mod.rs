//! Configuration module
//!
//! Loads and validates tournament files: the ordered phase table, the
//! qualification policy of each phase and per-round overrides.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator, suggest};
