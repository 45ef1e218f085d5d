//! Score aggregation.
//!
//! A round's totals are the plain sum of every submission counted for it:
//! judges' rubric totals, bye points and tie-break override points. Sums are
//! never averaged, and the order in which submissions arrived does not
//! matter.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::{Points, Submission, SubmissionKind, TeamScore};

/// Per-team cumulative totals, ordered by team name.
pub type Totals = BTreeMap<String, Points>;

/// Everything known about one round's submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Round name.
    pub round: String,
    /// Summed points per team.
    pub totals: Totals,
    /// Number of submissions counted (duplicates excluded).
    pub counted: usize,
    /// Number of judged submissions counted.
    pub judged: usize,
    /// Teams advanced by a bye.
    pub byes: Vec<String>,
    /// Winner recorded by a tie-break override, if one exists.
    pub tie_break_winner: Option<String>,
    /// Duplicate system entries that were ignored.
    pub ignored_duplicates: usize,
}

impl Aggregation {
    /// Returns `true` when nothing has been submitted for the round.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.counted == 0
    }
}

/// Which system entry a submission occupies. At most one submission may
/// hold each slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SystemSlot {
    Bye(String),
    TieBreak,
}

/// Sort key deciding which of several duplicate system entries is kept:
/// the earliest timestamp, then the smallest content.
type SlotOrder<'a> = (Option<DateTime<Utc>>, Vec<&'a TeamScore>, Points);

fn slot_order(submission: &Submission) -> SlotOrder<'_> {
    match &submission.kind {
        SubmissionKind::TieBreak { scores } | SubmissionKind::Judged { scores, .. } => {
            (submission.created_at, scores.iter().collect(), 0)
        }
        SubmissionKind::Bye { points, .. } => (submission.created_at, Vec::new(), *points),
    }
}

/// Reduces decoded submissions into per-round and per-phase totals.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregator<'a> {
    submissions: &'a [Submission],
}

impl<'a> ScoreAggregator<'a> {
    /// Creates an aggregator over the full submission history.
    #[must_use]
    pub const fn new(submissions: &'a [Submission]) -> Self {
        Self { submissions }
    }

    /// Aggregates every submission for `round`, plain or bye.
    ///
    /// Duplicate system entries for the same slot (a second bye for the same
    /// team, a second tie-break) are ignored, keeping the earliest.
    #[must_use]
    pub fn round(&self, round: &str) -> Aggregation {
        let mut agg = Aggregation {
            round: round.to_owned(),
            ..Aggregation::default()
        };
        let mut system: BTreeMap<SystemSlot, &Submission> = BTreeMap::new();

        for sub in self.submissions.iter().filter(|s| s.round == round) {
            let slot = match &sub.kind {
                SubmissionKind::Judged { .. } => {
                    add(&mut agg.totals, sub);
                    agg.counted += 1;
                    agg.judged += 1;
                    continue;
                }
                SubmissionKind::Bye { team, .. } => SystemSlot::Bye(team.clone()),
                SubmissionKind::TieBreak { .. } => SystemSlot::TieBreak,
            };

            match system.get(&slot) {
                Some(kept) => {
                    agg.ignored_duplicates += 1;
                    if slot_order(sub) < slot_order(kept) {
                        system.insert(slot, sub);
                    }
                }
                None => {
                    system.insert(slot, sub);
                }
            }
        }

        for (slot, sub) in &system {
            add(&mut agg.totals, sub);
            agg.counted += 1;
            match slot {
                SystemSlot::Bye(team) => agg.byes.push(team.clone()),
                SystemSlot::TieBreak => {
                    agg.tie_break_winner = sub.tie_break_winner().map(str::to_owned);
                }
            }
        }

        if agg.ignored_duplicates > 0 {
            warn!(
                round,
                ignored = agg.ignored_duplicates,
                "ignoring duplicate system score entries"
            );
        }
        if !agg.byes.is_empty() && agg.judged > 0 {
            warn!(
                round,
                byes = ?agg.byes,
                judged = agg.judged,
                "round has both a bye and judged scores"
            );
        }
        debug!(round, counted = agg.counted, teams = agg.totals.len(), "aggregated round");

        agg
    }

    /// Sums each team's totals across the given rounds.
    #[must_use]
    pub fn across<S: AsRef<str>>(&self, rounds: &[S]) -> Totals {
        let mut totals = Totals::new();
        for round in rounds {
            for (team, points) in self.round(round.as_ref()).totals {
                accumulate(&mut totals, &team, points);
            }
        }
        totals
    }
}

fn add(totals: &mut Totals, submission: &Submission) {
    for (team, points) in submission.contributions() {
        accumulate(totals, team, points);
    }
}

/// Adds `points` to a team's total, saturating at [`Points::MAX`].
pub(super) fn accumulate(totals: &mut Totals, team: &str, points: Points) {
    let total = totals.entry(team.to_owned()).or_default();
    let (sum, overflowed) = total.overflowing_add(points);
    if overflowed {
        warn!(team, "team total saturated");
        *total = Points::MAX;
    } else {
        *total = sum;
    }
}

/// Orders totals for ranking: highest first, then by team name.
#[must_use]
pub fn ranked(totals: &Totals) -> Vec<(&str, Points)> {
    let mut rows: Vec<(&str, Points)> = totals.iter().map(|(t, p)| (t.as_str(), *p)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScoreRecord, decode_all};

    fn judged(round: &str, judge: &str, scores: &[(&str, Points)]) -> ScoreRecord {
        ScoreRecord::judged(
            round,
            judge,
            scores.iter().map(|(n, t)| TeamScore::new(*n, *t)).collect(),
        )
    }

    #[test]
    fn sums_across_judges() {
        let subs = decode_all(&[
            judged("Ronda 1", "j1", &[("TeamA", 7), ("TeamB", 5)]),
            judged("Ronda 1", "j2", &[("TeamA", 6), ("TeamB", 8)]),
            judged("Ronda 2", "j1", &[("TeamC", 9), ("TeamD", 1)]),
        ]);
        let agg = ScoreAggregator::new(&subs).round("Ronda 1");
        assert_eq!(agg.totals["TeamA"], 13);
        assert_eq!(agg.totals["TeamB"], 13);
        assert_eq!(agg.counted, 2);
        assert_eq!(agg.judged, 2);
        assert!(!agg.totals.contains_key("TeamC"));
    }

    #[test]
    fn oversized_totals_saturate() {
        let subs = decode_all(&[
            judged("R1", "j1", &[("TeamA", Points::MAX), ("TeamB", 3)]),
            judged("R1", "j2", &[("TeamA", 1), ("TeamB", 4)]),
            judged("R2", "j1", &[("TeamA", Points::MAX)]),
        ]);
        let aggregator = ScoreAggregator::new(&subs);
        let agg = aggregator.round("R1");
        assert_eq!(agg.totals["TeamA"], Points::MAX);
        assert_eq!(agg.totals["TeamB"], 7);
        assert_eq!(aggregator.across(&["R1", "R2"])["TeamA"], Points::MAX);
    }

    #[test]
    fn empty_round_is_empty() {
        let subs = decode_all(&[judged("Ronda 1", "j1", &[("TeamA", 7)])]);
        let agg = ScoreAggregator::new(&subs).round("Ronda 2");
        assert!(agg.is_empty());
        assert!(agg.totals.is_empty());
    }

    #[test]
    fn bye_counts_one_point() {
        let subs = decode_all(&[ScoreRecord::bye("Cuartos 1", "TeamX")]);
        let agg = ScoreAggregator::new(&subs).round("Cuartos 1");
        assert_eq!(agg.totals.len(), 1);
        assert_eq!(agg.totals["TeamX"], 1);
        assert_eq!(agg.byes, vec!["TeamX".to_string()]);
    }

    #[test]
    fn duplicate_bye_is_ignored() {
        let subs = decode_all(&[
            ScoreRecord::bye("Cuartos 1", "TeamX"),
            ScoreRecord::bye("Cuartos 1", "TeamX"),
        ]);
        let agg = ScoreAggregator::new(&subs).round("Cuartos 1");
        assert_eq!(agg.totals["TeamX"], 1);
        assert_eq!(agg.ignored_duplicates, 1);
        assert_eq!(agg.counted, 1);
    }

    #[test]
    fn earliest_tie_break_is_kept_regardless_of_order() {
        let mut first = ScoreRecord::tie_break("Ronda 1", "TeamA", &["TeamB".to_string()]);
        first.created_at = Some("2025-05-10T10:00:00Z".parse().unwrap());
        let mut second = ScoreRecord::tie_break("Ronda 1", "TeamB", &["TeamA".to_string()]);
        second.created_at = Some("2025-05-10T10:05:00Z".parse().unwrap());

        for records in [
            vec![first.clone(), second.clone()],
            vec![second.clone(), first.clone()],
        ] {
            let subs = decode_all(&records);
            let agg = ScoreAggregator::new(&subs).round("Ronda 1");
            assert_eq!(agg.tie_break_winner.as_deref(), Some("TeamA"));
            assert_eq!(agg.totals["TeamA"], 1);
            assert_eq!(agg.totals["TeamB"], 0);
        }
    }

    #[test]
    fn tie_break_adds_on_top_of_judged_scores() {
        let subs = decode_all(&[
            judged("Ronda 1", "j1", &[("TeamA", 7), ("TeamB", 5)]),
            judged("Ronda 1", "j2", &[("TeamA", 6), ("TeamB", 8)]),
            ScoreRecord::tie_break("Ronda 1", "TeamA", &["TeamB".to_string()]),
        ]);
        let agg = ScoreAggregator::new(&subs).round("Ronda 1");
        assert_eq!(agg.totals["TeamA"], 14);
        assert_eq!(agg.totals["TeamB"], 13);
        assert_eq!(agg.tie_break_winner.as_deref(), Some("TeamA"));
    }

    #[test]
    fn across_rounds_sums_phase() {
        let subs = decode_all(&[
            judged("R1", "j1", &[("TeamA", 10), ("TeamB", 8)]),
            judged("R2", "j1", &[("TeamA", 5), ("TeamC", 9)]),
            ScoreRecord::bye("R3", "TeamB"),
        ]);
        let totals = ScoreAggregator::new(&subs).across(&["R1", "R2", "R3"]);
        assert_eq!(totals["TeamA"], 15);
        assert_eq!(totals["TeamB"], 9);
        assert_eq!(totals["TeamC"], 9);
    }

    #[test]
    fn ranked_breaks_equal_totals_by_name() {
        let totals: Totals = [("TeamC", 9), ("TeamA", 15), ("TeamB", 9)]
            .into_iter()
            .map(|(t, p)| (t.to_string(), p))
            .collect();
        let rows = ranked(&totals);
        assert_eq!(rows, vec![("TeamA", 15), ("TeamB", 9), ("TeamC", 9)]);
    }
}
