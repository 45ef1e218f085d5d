//! Configuration validation
//!
//! Runs on the fully deserialized `TournamentConfig`. Validation collects
//! every error and warning instead of stopping at the first one so staff
//! can fix a tournament file in one pass.

use std::collections::{HashMap, HashSet};

use crate::config::loader::ConfigLimits;
use crate::config::schema::{QualificationPolicy, TournamentConfig};
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(
        &mut self,
        config: &TournamentConfig,
        limits: &ConfigLimits,
    ) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_metadata(config);
        self.validate_phase_names(config);
        self.validate_policies(config);
        self.validate_dependency_order(config);
        self.validate_tiebreak(config);
        self.validate_limits(config, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    fn validate_metadata(&mut self, config: &TournamentConfig) {
        if config.tournament.name.trim().is_empty() {
            self.add_error(
                "tournament.name",
                "Tournament name is required and cannot be empty",
            );
        }

        if config.tournament.name.len() > 100 {
            self.add_warning(
                "tournament.name",
                "Tournament name is unusually long (> 100 characters)",
            );
        }

        if config.phases.is_empty() {
            self.add_error("phases", "At least one phase must be declared");
        }
    }

    // ========================================================================
    // Phase names and aliases
    // ========================================================================

    /// Every name and alias must identify exactly one phase.
    fn validate_phase_names(&mut self, config: &TournamentConfig) {
        let mut owners: HashMap<String, &str> = HashMap::new();

        for name in config.phases.keys() {
            if name.trim().is_empty() {
                self.add_error("phases", "Phase name cannot be empty");
            }
            owners.insert(name.trim().to_lowercase(), name);
        }

        for (name, phase) in &config.phases {
            for alias in &phase.aliases {
                let key = alias.trim().to_lowercase();
                match owners.get(&key) {
                    Some(owner) if *owner != name.as_str() => {
                        self.add_error(
                            &format!("phases.{name}.aliases"),
                            &format!("Alias '{alias}' is already used by phase '{owner}'"),
                        );
                    }
                    Some(_) => {
                        self.add_warning(
                            &format!("phases.{name}.aliases"),
                            &format!("Alias '{alias}' repeats the phase name"),
                        );
                    }
                    None => {
                        owners.insert(key, name);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Qualification policies
    // ========================================================================

    fn validate_policies(&mut self, config: &TournamentConfig) {
        for (name, phase) in &config.phases {
            let path = format!("phases.{name}.qualification");
            self.validate_policy(config, &path, &phase.qualification);

            if let Some(source) = phase.qualification.source_phase() {
                if config.phase_key(source) == Some(name.as_str()) {
                    self.add_error(&path, "Phase cannot qualify teams from itself");
                }
            }
        }

        for (round, o) in &config.rounds {
            if round.trim().is_empty() {
                self.add_error("rounds", "Round override name cannot be empty");
            }
            let path = format!("rounds.{round}.qualification");
            self.validate_policy(config, &path, &o.qualification);

            if let QualificationPolicy::WinnersOf { rounds } = &o.qualification {
                if rounds.iter().any(|r| r == round) {
                    self.add_error(&path, "Round cannot be fed by its own winner");
                }
            }
        }
    }

    fn validate_policy(
        &mut self,
        config: &TournamentConfig,
        path: &str,
        policy: &QualificationPolicy,
    ) {
        if let Some(source) = policy.source_phase() {
            if config.phase_key(source).is_none() {
                let hint = suggest(source, config.phases.keys().map(String::as_str))
                    .map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"));
                self.add_error(path, &format!("Unknown source phase '{source}'{hint}"));
            }
        }

        match policy {
            QualificationPolicy::TopFromPhase { count, .. } => {
                if *count == 0 {
                    self.add_error(path, "count must be at least 1");
                }
            }
            QualificationPolicy::SeedsFromPhase { seeds, .. } => {
                if seeds.is_empty() {
                    self.add_error(path, "seeds must list at least one position");
                }
                if seeds.contains(&0) {
                    self.add_error(path, "Seed positions are 1-based; 0 is not a valid seed");
                }
                let mut seen = HashSet::new();
                for seed in seeds {
                    if !seen.insert(seed) {
                        self.add_error(path, &format!("Seed {seed} is listed more than once"));
                    }
                }
            }
            QualificationPolicy::WinnersOf { rounds } => {
                if rounds.is_empty() {
                    self.add_error(path, "rounds must list at least one feeder round");
                }
                let mut seen = HashSet::new();
                for round in rounds {
                    if round.trim().is_empty() {
                        self.add_error(path, "Feeder round name cannot be empty");
                    }
                    if !seen.insert(round) {
                        self.add_warning(
                            path,
                            &format!("Feeder round '{round}' is listed more than once"),
                        );
                    }
                }
            }
            QualificationPolicy::FullRoster | QualificationPolicy::ManualDraw => {}
        }
    }

    // ========================================================================
    // Phase dependency graph
    // ========================================================================

    /// Phase-to-phase dependencies must be acyclic and should point backwards
    /// in tournament order.
    fn validate_dependency_order(&mut self, config: &TournamentConfig) {
        for (index, (name, phase)) in config.phases.iter().enumerate() {
            let Some(source) = phase.qualification.source_phase() else {
                continue;
            };
            let Some(source_index) = config.phase_index(source) else {
                continue;
            };
            if source_index > index {
                self.add_warning(
                    &format!("phases.{name}.qualification"),
                    &format!("Source phase '{source}' is declared after this phase"),
                );
            }

            // Walk the chain of source phases looking for a way back here.
            let mut visited = HashSet::from([name.as_str()]);
            let mut current = config.phase_key(source);
            while let Some(key) = current {
                if key == name.as_str() && source_index != index {
                    self.add_error(
                        &format!("phases.{name}.qualification"),
                        "Circular phase dependency",
                    );
                    break;
                }
                if !visited.insert(key) {
                    break;
                }
                current = config.phases[key]
                    .qualification
                    .source_phase()
                    .and_then(|s| config.phase_key(s));
            }
        }
    }

    // ========================================================================
    // Tie-break and limits
    // ========================================================================

    fn validate_tiebreak(&mut self, config: &TournamentConfig) {
        if config.tiebreak.faces < 2 {
            self.add_error("tiebreak.faces", "A die needs at least 2 faces");
        }
        if config.tiebreak.max_rolls == 0 {
            self.add_error("tiebreak.max_rolls", "max_rolls must be at least 1");
        }
    }

    fn validate_limits(&mut self, config: &TournamentConfig, limits: &ConfigLimits) {
        if config.phases.len() > limits.max_phases {
            self.add_error(
                "phases",
                &format!(
                    "Too many phases: {} (limit: {})",
                    config.phases.len(),
                    limits.max_phases
                ),
            );
        }
        if config.rounds.len() > limits.max_rounds {
            self.add_error(
                "rounds",
                &format!(
                    "Too many round overrides: {} (limit: {})",
                    config.rounds.len(),
                    limits.max_rounds
                ),
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

/// Returns the candidate closest to `input`, if it is close enough to be
/// a likely typo.
#[must_use]
pub fn suggest<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let input_lower = input.to_lowercase();
    candidates
        .into_iter()
        .map(|c| (c, strsim::damerau_levenshtein(&input_lower, &c.to_lowercase())))
        .filter(|(c, d)| *d <= 3_usize.max(c.chars().count() / 4))
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c.to_owned())
}

// ============================================================================
// Tests
// ============================================================================
