//! Configuration schema types
//!
//! The tournament file declares the phases of the tournament in order and,
//! for each phase, the policy that decides which teams play its rounds.
//! Stored rounds only carry a phase name; everything the engine knows
//! about how a phase is fed comes from here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Round;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a tournament.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TournamentConfig {
    /// Tournament metadata (required)
    pub tournament: TournamentMetadata,

    /// Phases in tournament order, keyed by the phase name stored on rounds
    pub phases: IndexMap<String, PhaseConfig>,

    /// Per-round qualification overrides, keyed by round name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rounds: IndexMap<String, RoundOverride>,

    /// Tie-break dice settings
    #[serde(default)]
    pub tiebreak: TieBreakConfig,
}

/// Tournament identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TournamentMetadata {
    /// Display name (required)
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// Phases
// ============================================================================

/// One stage of the tournament.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct PhaseConfig {
    /// How rounds of this phase are displayed
    #[serde(default)]
    pub kind: PhaseKind,

    /// Alternative spellings of the phase name found in stored rounds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Which teams play the rounds of this phase
    #[serde(default)]
    pub qualification: QualificationPolicy,
}

/// Display kind of a phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Cumulative standings table
    #[default]
    Group,
    /// Elimination matches
    Knockout,
}

/// Policy deciding the teams of a round.
///
/// Serialized with an inline `policy` tag:
///
/// ```yaml
/// qualification: { policy: top_from_phase, phase: Fase de Grupos, count: 8 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum QualificationPolicy {
    /// Every verified team on the roster.
    #[default]
    FullRoster,

    /// The `count` highest cumulative totals across every round of `phase`.
    TopFromPhase {
        /// Source phase
        phase: String,
        /// Number of teams that qualify
        count: usize,
    },

    /// Specific 1-based positions of the cumulative ranking of `phase`,
    /// used to pair knockout rounds off one ranking (e.g. seeds 1 and 4).
    SeedsFromPhase {
        /// Source phase
        phase: String,
        /// Ranking positions, in slot order
        seeds: Vec<usize>,
    },

    /// The winner of each listed round, one slot per round in order.
    WinnersOf {
        /// Feeder rounds
        rounds: Vec<String>,
    },

    /// Only a staff draw decides the teams.
    ManualDraw,
}

impl QualificationPolicy {
    /// Every policy name accepted in a tournament file.
    pub const NAMES: &'static [&'static str] = &[
        "full_roster",
        "top_from_phase",
        "seeds_from_phase",
        "winners_of",
        "manual_draw",
    ];

    /// Phase this policy reads from, if it ranks a phase.
    #[must_use]
    pub fn source_phase(&self) -> Option<&str> {
        match self {
            Self::TopFromPhase { phase, .. } | Self::SeedsFromPhase { phase, .. } => {
                Some(phase.as_str())
            }
            _ => None,
        }
    }

    /// Short name used in logs and output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FullRoster => "full_roster",
            Self::TopFromPhase { .. } => "top_from_phase",
            Self::SeedsFromPhase { .. } => "seeds_from_phase",
            Self::WinnersOf { .. } => "winners_of",
            Self::ManualDraw => "manual_draw",
        }
    }
}

/// Qualification override for a single round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RoundOverride {
    /// Policy replacing the phase policy for this round
    pub qualification: QualificationPolicy,
}

// ============================================================================
// Tie-break
// ============================================================================

/// Tie-break dice settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TieBreakConfig {
    /// Faces on each die
    #[serde(default = "default_faces")]
    pub faces: u8,

    /// Rolls attempted before giving up on a run of equal throws
    #[serde(default = "default_max_rolls")]
    pub max_rolls: u32,
}

const fn default_faces() -> u8 {
    6
}

const fn default_max_rolls() -> u32 {
    50
}

impl Default for TieBreakConfig {
    fn default() -> Self {
        Self {
            faces: default_faces(),
            max_rolls: default_max_rolls(),
        }
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// Where the policy applied to a round came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOrigin {
    /// A `rounds:` override
    Round,
    /// The policy of the round's phase
    Phase,
    /// The round's phase is not declared
    Default,
}

impl TournamentConfig {
    /// Resolves a stored phase name to the declared phase key.
    ///
    /// Matches the key, then aliases, then either of them ignoring case
    /// and surrounding whitespace.
    #[must_use]
    pub fn phase_key(&self, stored: &str) -> Option<&str> {
        let exact = self.phases.iter().find(|(name, phase)| {
            name.as_str() == stored || phase.aliases.iter().any(|a| a == stored)
        });
        if let Some((name, _)) = exact {
            return Some(name.as_str());
        }

        let wanted = stored.trim().to_lowercase();
        self.phases
            .iter()
            .find(|(name, phase)| {
                name.trim().to_lowercase() == wanted
                    || phase
                        .aliases
                        .iter()
                        .any(|a| a.trim().to_lowercase() == wanted)
            })
            .map(|(name, _)| name.as_str())
    }

    /// Returns the declared phase for a stored phase name.
    #[must_use]
    pub fn phase(&self, stored: &str) -> Option<(&str, &PhaseConfig)> {
        let key = self.phase_key(stored)?;
        self.phases.get_key_value(key).map(|(k, v)| (k.as_str(), v))
    }

    /// Position of a phase in tournament order.
    #[must_use]
    pub fn phase_index(&self, stored: &str) -> Option<usize> {
        self.phase_key(stored)
            .and_then(|key| self.phases.get_index_of(key))
    }

    /// Returns the policy that decides the teams of `round`.
    #[must_use]
    pub fn policy_for(&self, round: &Round) -> (&QualificationPolicy, PolicyOrigin) {
        if let Some(o) = self.rounds.get(&round.name) {
            return (&o.qualification, PolicyOrigin::Round);
        }
        self.phase(&round.phase).map_or(
            (&QualificationPolicy::FullRoster, PolicyOrigin::Default),
            |(_, p)| (&p.qualification, PolicyOrigin::Phase),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
tournament:
  name: Torneo Escolar de Debate
phases:
  Fase de Grupos:
    kind: group
  Fase de semifinales:
    kind: knockout
    aliases: [Fase de semifinal]
    qualification: { policy: top_from_phase, phase: Fase de Grupos, count: 4 }
  Fase de Finales:
    kind: knockout
    qualification:
      policy: winners_of
      rounds: [Semifinal 1, Semifinal 2]
rounds:
  Semifinal 1:
    qualification: { policy: seeds_from_phase, phase: Fase de Grupos, seeds: [1, 4] }
";

    fn sample() -> TournamentConfig {
        serde_yaml::from_str(SAMPLE).unwrap()
    }

    fn round(name: &str, phase: &str) -> Round {
        Round {
            id: name.to_lowercase(),
            name: name.to_string(),
            phase: phase.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_parse_sample() {
        let config = sample();
        assert_eq!(config.tournament.name, "Torneo Escolar de Debate");
        assert_eq!(config.phases.len(), 3);
        assert_eq!(config.tiebreak, TieBreakConfig::default());
        assert_eq!(
            config.phases["Fase de Grupos"].qualification,
            QualificationPolicy::FullRoster
        );
        assert_eq!(
            config.phases["Fase de Finales"].qualification,
            QualificationPolicy::WinnersOf {
                rounds: vec!["Semifinal 1".to_string(), "Semifinal 2".to_string()]
            }
        );
    }

    #[test]
    fn test_phase_order_is_preserved() {
        let config = sample();
        let names: Vec<&str> = config.phases.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            ["Fase de Grupos", "Fase de semifinales", "Fase de Finales"]
        );
    }

    #[test]
    fn test_phase_key_matches_alias_and_case() {
        let config = sample();
        assert_eq!(
            config.phase_key("Fase de semifinal"),
            Some("Fase de semifinales")
        );
        assert_eq!(
            config.phase_key("  fase de finales "),
            Some("Fase de Finales")
        );
        assert_eq!(config.phase_key("Fase de Cuartos"), None);
        assert_eq!(config.phase_index("Fase de Finales"), Some(2));
    }

    #[test]
    fn test_round_override_takes_precedence() {
        let config = sample();
        let (policy, origin) = config.policy_for(&round("Semifinal 1", "Fase de semifinales"));
        assert_eq!(origin, PolicyOrigin::Round);
        assert_eq!(policy.label(), "seeds_from_phase");

        let (policy, origin) = config.policy_for(&round("Semifinal 2", "Fase de semifinal"));
        assert_eq!(origin, PolicyOrigin::Phase);
        assert_eq!(policy.source_phase(), Some("Fase de Grupos"));
    }

    #[test]
    fn test_undeclared_phase_defaults_to_full_roster() {
        let config = sample();
        let (policy, origin) = config.policy_for(&round("Exhibición", "Amistosos"));
        assert_eq!(origin, PolicyOrigin::Default);
        assert_eq!(*policy, QualificationPolicy::FullRoster);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "tournament: { name: x }\nphases: {}\nbogus: 1\n";
        assert!(serde_yaml::from_str::<TournamentConfig>(yaml).is_err());
    }

    #[test]
    fn test_manual_draw_policy_parses() {
        let yaml = "policy: manual_draw";
        let policy: QualificationPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy, QualificationPolicy::ManualDraw);
    }

    #[test]
    fn labels_are_listed_names() {
        let policies = [
            QualificationPolicy::FullRoster,
            QualificationPolicy::TopFromPhase { phase: "G".into(), count: 2 },
            QualificationPolicy::SeedsFromPhase { phase: "G".into(), seeds: vec![1] },
            QualificationPolicy::WinnersOf { rounds: vec!["R".into()] },
            QualificationPolicy::ManualDraw,
        ];
        let labels: Vec<_> = policies.iter().map(QualificationPolicy::label).collect();
        assert_eq!(labels, QualificationPolicy::NAMES);
    }
}
