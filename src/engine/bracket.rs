//! Read-side bracket view.
//!
//! Recomputed from scratch on every change; nothing here writes.

use serde::Serialize;
use tracing::warn;

use super::aggregate::ScoreAggregator;
use super::qualify::{QualificationResolver, Slot};
use super::resolve::{MatchResult, MatchState, TeamTotal};
use super::standings::{PhaseTable, Standing, phase_rounds};
use crate::config::{PhaseKind, TournamentConfig};
use crate::model::{Round, Submission};
use crate::store::Snapshot;

/// Whole-tournament display tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    /// Tournament name.
    pub tournament: String,
    /// Phases in configured order, then undeclared phases in round order.
    pub phases: Vec<PhaseView>,
    /// Match to highlight.
    pub highlight: Option<Highlight>,
}

/// One phase of the display tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseView {
    /// Cumulative standings table.
    Group {
        /// Phase name
        name: String,
        /// Ranked rows
        standings: Vec<Standing>,
        /// Every round of the phase
        matches: Vec<MatchView>,
    },
    /// Column of elimination matches.
    Knockout {
        /// Phase name
        name: String,
        /// Matches in round order
        matches: Vec<MatchView>,
    },
}

impl PhaseView {
    /// Phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Group { name, .. } | Self::Knockout { name, .. } => name,
        }
    }

    /// Matches of the phase.
    #[must_use]
    pub fn matches(&self) -> &[MatchView] {
        match self {
            Self::Group { matches, .. } | Self::Knockout { matches, .. } => matches,
        }
    }
}

/// One match box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    /// Round name.
    pub round: String,
    /// Display state.
    pub state: MatchState,
    /// Scored teams, highest first.
    pub teams: Vec<TeamTotal>,
    /// Winner, if decided.
    pub winner: Option<String>,
    /// Computed line-up (empty for group rounds).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
}

impl MatchView {
    fn new(result: MatchResult, slots: Vec<Slot>) -> Self {
        Self {
            state: result.state(),
            round: result.round,
            teams: result.teams,
            winner: result.winner,
            slots,
        }
    }
}

/// Why a match is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// It is the active round.
    Current,
    /// It is the first open knockout match.
    Next,
}

/// Highlighted match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    /// Round name.
    pub round: String,
    /// Reason.
    pub kind: HighlightKind,
}

/// Builds [`Bracket`] views.
pub struct BracketProjection<'a> {
    config: &'a TournamentConfig,
    snapshot: &'a Snapshot,
    submissions: Vec<Submission>,
}

impl<'a> BracketProjection<'a> {
    /// Creates a projection over one snapshot.
    #[must_use]
    pub fn new(config: &'a TournamentConfig, snapshot: &'a Snapshot) -> Self {
        Self {
            config,
            snapshot,
            submissions: snapshot.submissions(),
        }
    }

    /// Projects the whole tournament.
    #[must_use]
    pub fn project(&self) -> Bracket {
        let mut phases: Vec<PhaseView> = self
            .config
            .phases
            .iter()
            .map(|(name, phase)| {
                let rounds = phase_rounds(self.config, &self.snapshot.rounds, name);
                match phase.kind {
                    PhaseKind::Group => self.group(name, &rounds),
                    PhaseKind::Knockout => self.knockout(name, &rounds),
                }
            })
            .collect();

        let mut undeclared: Vec<&str> = Vec::new();
        for round in &self.snapshot.rounds {
            if self.config.phase_key(&round.phase).is_none()
                && !undeclared.contains(&round.phase.as_str())
            {
                undeclared.push(&round.phase);
            }
        }
        for name in undeclared {
            let rounds = phase_rounds(self.config, &self.snapshot.rounds, name);
            phases.push(self.group(name, &rounds));
        }

        let highlight = self.highlight(&phases);
        Bracket {
            tournament: self.config.tournament.name.clone(),
            phases,
            highlight,
        }
    }

    fn group(&self, name: &str, rounds: &[&Round]) -> PhaseView {
        let table = PhaseTable::compute(name, rounds, &self.submissions);
        PhaseView::Group {
            name: name.to_owned(),
            standings: table.rows,
            matches: table
                .results
                .into_iter()
                .map(|r| MatchView::new(r, Vec::new()))
                .collect(),
        }
    }

    fn knockout(&self, name: &str, rounds: &[&Round]) -> PhaseView {
        let aggregator = ScoreAggregator::new(&self.submissions);
        let resolver = QualificationResolver::new(
            self.config,
            &self.snapshot.rounds,
            &self.submissions,
            &self.snapshot.schools,
            &self.snapshot.draw_state,
        );

        let matches = rounds
            .iter()
            .map(|round| {
                let result = MatchResult::from_aggregation(&aggregator.round(&round.name));
                let slots = match resolver.resolve(&round.name) {
                    Ok(q) => q.slots,
                    Err(e) => {
                        warn!(round = %round.name, error = %e, "cannot place teams for bracket");
                        Vec::new()
                    }
                };
                MatchView::new(result, slots)
            })
            .collect();

        PhaseView::Knockout {
            name: name.to_owned(),
            matches,
        }
    }

    fn highlight(&self, phases: &[PhaseView]) -> Option<Highlight> {
        if let Some(current) = &self.snapshot.debate_state.current_round
            && self.snapshot.rounds.iter().any(|r| &r.name == current)
        {
            return Some(Highlight {
                round: current.clone(),
                kind: HighlightKind::Current,
            });
        }

        phases
            .iter()
            .filter(|p| matches!(p, PhaseView::Knockout { .. }))
            .flat_map(PhaseView::matches)
            .find(|m| matches!(m.state, MatchState::Pending | MatchState::Tied))
            .map(|m| Highlight {
                round: m.round.clone(),
                kind: HighlightKind::Next,
            })
    }
}
