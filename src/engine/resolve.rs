//! Winner resolution.

use serde::Serialize;

use super::aggregate::{Aggregation, Totals};
use crate::model::Points;

/// Outcome of resolving a round's totals.
///
/// `Pending` and `Tie` are steady states of an in-progress tournament, not
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// No submissions yet.
    Pending,
    /// Two or more teams share the highest total.
    Tie {
        /// The shared highest total.
        score: Points,
        /// Tied teams, in name order.
        teams: Vec<String>,
    },
    /// A single team holds the highest total.
    Decided {
        /// Winning team.
        winner: String,
        /// Winning total.
        score: Points,
    },
}

impl Resolution {
    /// Winning team, if decided.
    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        match self {
            Self::Decided { winner, .. } => Some(winner),
            _ => None,
        }
    }

    /// Returns `true` for a tie.
    #[must_use]
    pub const fn is_tie(&self) -> bool {
        matches!(self, Self::Tie { .. })
    }

    /// Returns `true` while nothing has been submitted.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Short label for logs and human output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Tie { .. } => "tie",
            Self::Decided { .. } => "decided",
        }
    }
}

/// Decides the winner of a round from its totals.
pub struct WinnerResolver;

impl WinnerResolver {
    /// Resolves totals into `Pending`, `Tie` or `Decided`.
    ///
    /// Works for any number of teams: every team holding the highest total
    /// is part of the tie.
    #[must_use]
    pub fn resolve(totals: &Totals) -> Resolution {
        let Some(&max) = totals.values().max() else {
            return Resolution::Pending;
        };

        let mut leaders = totals
            .iter()
            .filter(|&(_, &points)| points == max)
            .map(|(team, _)| team.clone());

        match (leaders.next(), leaders.next()) {
            (Some(winner), None) => Resolution::Decided { winner, score: max },
            (Some(first), Some(second)) => {
                let mut teams = vec![first, second];
                teams.extend(leaders);
                Resolution::Tie { score: max, teams }
            }
            (None, _) => Resolution::Pending,
        }
    }
}

/// One team's line in a match result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTotal {
    /// Team name.
    pub name: String,
    /// Sum of every counted submission for this team.
    pub total_points: Points,
}

/// Display state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    /// No submissions.
    Pending,
    /// Decided by an uncontested advance.
    Bye,
    /// Highest total shared.
    Tied,
    /// Single winner by score or tie-break.
    Decided,
}

/// Aggregated view of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Round name.
    pub round: String,
    /// Team totals, highest first.
    pub teams: Vec<TeamTotal>,
    /// Tagged resolution.
    pub resolution: Resolution,
    /// Winner, when decided.
    pub winner: Option<String>,
    /// Whether the highest total is shared.
    pub is_tie: bool,
    /// Submissions counted.
    pub submissions: usize,
    /// Whether a bye was recorded for the round.
    pub has_bye: bool,
    /// Whether a tie-break override was recorded for the round.
    pub has_tie_break: bool,
}

impl MatchResult {
    /// Builds the result of an aggregated round.
    #[must_use]
    pub fn from_aggregation(agg: &Aggregation) -> Self {
        let resolution = WinnerResolver::resolve(&agg.totals);

        let mut teams: Vec<TeamTotal> = agg
            .totals
            .iter()
            .map(|(name, &total_points)| TeamTotal {
                name: name.clone(),
                total_points,
            })
            .collect();
        teams.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            round: agg.round.clone(),
            teams,
            winner: resolution.winner().map(str::to_owned),
            is_tie: resolution.is_tie(),
            resolution,
            submissions: agg.counted,
            has_bye: !agg.byes.is_empty(),
            has_tie_break: agg.tie_break_winner.is_some(),
        }
    }

    /// Derived display state.
    #[must_use]
    pub const fn state(&self) -> MatchState {
        match self.resolution {
            Resolution::Pending => MatchState::Pending,
            Resolution::Tie { .. } => MatchState::Tied,
            Resolution::Decided { .. } if self.has_bye => MatchState::Bye,
            Resolution::Decided { .. } => MatchState::Decided,
        }
    }
}
