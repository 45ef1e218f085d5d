//! Qualification: which teams play a round.
//!
//! Resolution order for a round:
//!
//! 1. a staff draw assignment for the round, used verbatim;
//! 2. the round's `rounds:` override in the configuration;
//! 3. the policy of the round's phase;
//! 4. the full verified roster.
//!
//! A round whose slots still wait on an undecided feeder is returned with
//! `determined = false` so callers never promote a partial list as final.

use serde::Serialize;
use tracing::{debug, warn};

use super::aggregate::ScoreAggregator;
use super::resolve::{Resolution, WinnerResolver};
use super::standings::{PhaseTable, phase_rounds};
use crate::config::{PolicyOrigin, QualificationPolicy, TournamentConfig, suggest};
use crate::error::EngineError;
use crate::model::{DrawState, Round, Submission, Team};

/// Why a slot has no team yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeederStatus {
    /// The feeder has no result yet.
    Pending,
    /// The feeder is tied and needs a tie-break.
    Tied,
    /// The source ranking has fewer teams than slots.
    Unranked,
    /// The round waits on a staff draw.
    Undrawn,
}

/// One position in a round's line-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum Slot {
    /// A qualified team.
    Team {
        /// Team name.
        name: String,
    },
    /// A position still waiting on its feeder.
    Awaiting {
        /// Round, phase or draw the slot depends on.
        feeder: String,
        /// What the feeder is waiting for.
        status: FeederStatus,
    },
}

impl Slot {
    fn team(name: impl Into<String>) -> Self {
        Self::Team { name: name.into() }
    }

    fn awaiting(feeder: impl Into<String>, status: FeederStatus) -> Self {
        Self::Awaiting {
            feeder: feeder.into(),
            status,
        }
    }

    /// Team in the slot, if filled.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Team { name } => Some(name),
            Self::Awaiting { .. } => None,
        }
    }
}

/// Where a qualification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationSource {
    /// Staff draw assignment
    Draw,
    /// Round override in the configuration
    RoundOverride,
    /// Phase policy
    Phase,
    /// Undeclared phase, full roster
    Default,
}

impl From<PolicyOrigin> for QualificationSource {
    fn from(origin: PolicyOrigin) -> Self {
        match origin {
            PolicyOrigin::Round => Self::RoundOverride,
            PolicyOrigin::Phase => Self::Phase,
            PolicyOrigin::Default => Self::Default,
        }
    }
}

/// Computed line-up of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualification {
    /// Round name.
    pub round: String,
    /// Policy label (`manual_draw` for draw assignments).
    pub policy: String,
    /// Where the policy came from.
    pub source: QualificationSource,
    /// Slots in positional order.
    pub slots: Vec<Slot>,
    /// Whether every slot is final.
    pub determined: bool,
}

impl Qualification {
    /// Teams currently placed, in slot order.
    #[must_use]
    pub fn teams(&self) -> Vec<&str> {
        self.slots.iter().filter_map(Slot::name).collect()
    }

    /// Number of slots still waiting on a feeder.
    #[must_use]
    pub fn open_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.name().is_none()).count()
    }

    /// Final team list.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotDetermined`] while any slot is open.
    pub fn into_teams(self) -> Result<Vec<String>, EngineError> {
        if !self.determined {
            return Err(EngineError::NotDetermined {
                open: self.open_slots(),
                round: self.round,
            });
        }
        Ok(self
            .slots
            .into_iter()
            .filter_map(|s| match s {
                Slot::Team { name } => Some(name),
                Slot::Awaiting { .. } => None,
            })
            .collect())
    }
}

/// Computes round line-ups from the configuration, the round list, the
/// score history, the roster and staff draws.
pub struct QualificationResolver<'a> {
    config: &'a TournamentConfig,
    rounds: &'a [Round],
    submissions: &'a [Submission],
    roster: &'a [Team],
    draws: &'a DrawState,
}

impl<'a> QualificationResolver<'a> {
    /// Creates a resolver over one snapshot of tournament state.
    #[must_use]
    pub const fn new(
        config: &'a TournamentConfig,
        rounds: &'a [Round],
        submissions: &'a [Submission],
        roster: &'a [Team],
        draws: &'a DrawState,
    ) -> Self {
        Self {
            config,
            rounds,
            submissions,
            roster,
            draws,
        }
    }

    /// Looks up a stored round by name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRound`] with the closest known name.
    pub fn find_round(&self, name: &str) -> Result<&'a Round, EngineError> {
        self.rounds
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| EngineError::UnknownRound {
                round: name.to_owned(),
                suggestion: suggest(name, self.rounds.iter().map(|r| r.name.as_str())),
            })
    }

    /// Computes the line-up of `round`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRound`] if the round does not exist and
    /// [`EngineError::UnknownTeam`] if any placed team is not on the
    /// verified roster.
    pub fn resolve(&self, round: &str) -> Result<Qualification, EngineError> {
        let target = self.find_round(round)?;

        let qualification = if let Some(teams) = self.draws.get(round) {
            debug!(round, teams = teams.len(), "using draw assignment");
            Qualification {
                round: round.to_owned(),
                policy: QualificationPolicy::ManualDraw.label().to_owned(),
                source: QualificationSource::Draw,
                slots: teams.iter().map(Slot::team).collect(),
                determined: true,
            }
        } else {
            let (policy, origin) = self.config.policy_for(target);
            let (slots, determined) = self.apply(round, policy);
            Qualification {
                round: round.to_owned(),
                policy: policy.label().to_owned(),
                source: origin.into(),
                slots,
                determined,
            }
        };

        self.check_roster(&qualification)?;
        debug!(
            round,
            policy = %qualification.policy,
            determined = qualification.determined,
            teams = ?qualification.teams(),
            "resolved qualification"
        );
        Ok(qualification)
    }

    fn apply(&self, round: &str, policy: &QualificationPolicy) -> (Vec<Slot>, bool) {
        match policy {
            QualificationPolicy::FullRoster => {
                let mut names: Vec<&str> = self.verified().collect();
                names.sort_unstable();
                (names.into_iter().map(Slot::team).collect(), true)
            }
            QualificationPolicy::TopFromPhase { phase, count } => {
                let positions: Vec<usize> = (1..=*count).collect();
                self.from_ranking(round, phase, &positions)
            }
            QualificationPolicy::SeedsFromPhase { phase, seeds } => {
                self.from_ranking(round, phase, seeds)
            }
            QualificationPolicy::WinnersOf { rounds } => self.winners_of(rounds),
            QualificationPolicy::ManualDraw => {
                (vec![Slot::awaiting(round, FeederStatus::Undrawn)], false)
            }
        }
    }

    /// Fills slots from 1-based positions of a phase's cumulative ranking.
    fn from_ranking(&self, round: &str, phase: &str, positions: &[usize]) -> (Vec<Slot>, bool) {
        let rounds = phase_rounds(self.config, self.rounds, phase);
        let table = PhaseTable::compute(phase, &rounds, self.submissions);

        let open: Vec<&str> = table.open_rounds().map(|r| r.round.as_str()).collect();
        let mut determined = open.is_empty();
        if !determined {
            debug!(round, phase, open = ?open, "source phase still has open rounds");
        }

        // Position just below the last slot decides whether the cut is clean.
        if let Some(&last) = positions.iter().max()
            && let Some(inside) = last.checked_sub(1).and_then(|i| table.rows.get(i))
            && let Some(outside) = table.rows.get(last)
            && inside.total == outside.total
        {
            warn!(
                round,
                phase,
                total = inside.total,
                inside = %inside.team,
                outside = %outside.team,
                "tie at the qualification cut line, ordering by name"
            );
        }

        let status = if table.open_rounds().any(|r| r.resolution.is_tie()) {
            FeederStatus::Tied
        } else {
            FeederStatus::Pending
        };

        let slots = positions
            .iter()
            .map(|&pos| match table.rows.get(pos.saturating_sub(1)) {
                Some(row) if pos > 0 => Slot::team(row.team.clone()),
                _ => {
                    determined = false;
                    let status = if open.is_empty() {
                        FeederStatus::Unranked
                    } else {
                        status
                    };
                    Slot::awaiting(phase, status)
                }
            })
            .collect();

        (slots, determined)
    }

    fn winners_of(&self, feeders: &[String]) -> (Vec<Slot>, bool) {
        let aggregator = ScoreAggregator::new(self.submissions);
        let mut determined = true;

        let slots = feeders
            .iter()
            .map(|feeder| {
                let totals = aggregator.round(feeder).totals;
                match WinnerResolver::resolve(&totals) {
                    Resolution::Decided { winner, .. } => Slot::team(winner),
                    Resolution::Tie { .. } => {
                        determined = false;
                        Slot::awaiting(feeder.clone(), FeederStatus::Tied)
                    }
                    Resolution::Pending => {
                        determined = false;
                        Slot::awaiting(feeder.clone(), FeederStatus::Pending)
                    }
                }
            })
            .collect();

        (slots, determined)
    }

    fn verified(&self) -> impl Iterator<Item = &'a str> {
        self.roster
            .iter()
            .filter(|t| t.verified)
            .map(|t| t.name.as_str())
    }

    fn check_roster(&self, qualification: &Qualification) -> Result<(), EngineError> {
        for team in qualification.teams() {
            if !self.verified().any(|name| name == team) {
                return Err(EngineError::UnknownTeam {
                    team: team.to_owned(),
                    round: qualification.round.clone(),
                    suggestion: suggest(team, self.verified()),
                });
            }
        }
        Ok(())
    }
}
