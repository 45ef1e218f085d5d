//! Cumulative phase standings.

use serde::Serialize;

use super::aggregate::{ScoreAggregator, Totals, accumulate, ranked};
use super::resolve::{MatchResult, Resolution};
use crate::config::TournamentConfig;
use crate::model::{Points, Round, Submission};

/// One row of a phase table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// 1-based position.
    pub rank: usize,
    /// Team name.
    pub team: String,
    /// Cumulative total across the phase.
    pub total: Points,
    /// Rounds in which the team has points recorded.
    pub played: usize,
    /// Rounds the team won outright.
    pub wins: usize,
    /// Rounds the team is part of an unresolved tie.
    pub ties: usize,
}

/// Rounds of a phase, ordered by creation time then name.
///
/// Rounds are matched through the configured phase key, so spelling
/// variants covered by aliases land in the same phase.
#[must_use]
pub fn phase_rounds<'r>(config: &TournamentConfig, rounds: &'r [Round], phase: &str) -> Vec<&'r Round> {
    let key = config.phase_key(phase);
    let mut selected: Vec<&Round> = rounds
        .iter()
        .filter(|r| match key {
            Some(key) => config.phase_key(&r.phase) == Some(key),
            None => r.phase == phase,
        })
        .collect();
    selected.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
    selected
}

/// Results and cumulative ranking of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTable {
    /// Phase name.
    pub phase: String,
    /// Result of every round in the phase, in round order.
    pub results: Vec<MatchResult>,
    /// Ranked rows, highest total first, then by name.
    pub rows: Vec<Standing>,
}

impl PhaseTable {
    /// Builds the table for the given rounds of a phase.
    #[must_use]
    pub fn compute(phase: &str, rounds: &[&Round], submissions: &[Submission]) -> Self {
        let aggregator = ScoreAggregator::new(submissions);
        let mut totals = Totals::new();
        let mut results = Vec::with_capacity(rounds.len());

        for round in rounds {
            let agg = aggregator.round(&round.name);
            for (team, points) in &agg.totals {
                accumulate(&mut totals, team, *points);
            }
            results.push(MatchResult::from_aggregation(&agg));
        }

        let rows = ranked(&totals)
            .into_iter()
            .enumerate()
            .map(|(i, (team, total))| {
                let mut row = Standing {
                    rank: i + 1,
                    team: team.to_owned(),
                    total,
                    played: 0,
                    wins: 0,
                    ties: 0,
                };
                for result in &results {
                    if !result.teams.iter().any(|t| t.name == team) {
                        continue;
                    }
                    row.played += 1;
                    match &result.resolution {
                        Resolution::Decided { winner, .. } if winner == team => row.wins += 1,
                        Resolution::Tie { teams, .. } if teams.iter().any(|t| t == team) => {
                            row.ties += 1;
                        }
                        _ => {}
                    }
                }
                row
            })
            .collect();

        Self {
            phase: phase.to_owned(),
            results,
            rows,
        }
    }

    /// Rounds that are still pending or tied.
    pub fn open_rounds(&self) -> impl Iterator<Item = &MatchResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.resolution, Resolution::Pending | Resolution::Tie { .. }))
    }

    /// Team names in ranking order.
    pub fn ranking(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.team.as_str())
    }
}
