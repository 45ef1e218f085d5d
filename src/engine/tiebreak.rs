//! Tie-break decisions.
//!
//! A tied round is settled by dice: every tied team rolls, a unique highest
//! roll wins, a shared highest roll means everyone rolls again. The winner
//! is persisted as a `system` score entry worth one point to the winner and
//! zero to the others, which is enough to give the round a unique maximum.
//!
//! ```text
//! NoTieDetected
//! TieDetected -> RollPending -> RollResolved -> WinnerConfirmed
//!                     ^     \
//!                     |      RollTied
//!                     +--------/
//! ```

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use super::resolve::{MatchResult, Resolution};
use crate::config::TieBreakConfig;
use crate::error::EngineError;
use crate::model::{Points, ScoreRecord};

// ============================================================================
// Dice
// ============================================================================

/// Source of die rolls.
pub trait Dice: Send {
    /// Rolls one die with faces numbered `1..=faces`.
    fn roll(&mut self, faces: u8) -> u8;
}

/// Dice backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDice;

impl Dice for ThreadDice {
    fn roll(&mut self, faces: u8) -> u8 {
        rand::rng().random_range(1..=faces.max(1))
    }
}

/// Reproducible dice.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    /// Creates dice from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Dice for SeededDice {
    fn roll(&mut self, faces: u8) -> u8 {
        self.rng.random_range(1..=faces.max(1))
    }
}

/// Dice returning a fixed sequence of values, then ones.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    values: VecDeque<u8>,
}

impl ScriptedDice {
    /// Creates dice that return `values` in order.
    pub fn new(values: impl IntoIterator<Item = u8>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Creates dice from faces thrown by hand on a `faces`-sided die.
    ///
    /// # Errors
    ///
    /// Returns the first value outside `1..=faces`.
    pub fn thrown(values: impl IntoIterator<Item = u8>, faces: u8) -> Result<Self, u8> {
        let values: VecDeque<u8> = values.into_iter().collect();
        match values.iter().find(|v| !(1..=faces).contains(*v)) {
            Some(&bad) => Err(bad),
            None => Ok(Self { values }),
        }
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, faces: u8) -> u8 {
        self.values.pop_front().unwrap_or(1).clamp(1, faces.max(1))
    }
}

// ============================================================================
// Session
// ============================================================================

/// One team's throw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiceRoll {
    /// Team that rolled.
    pub team: String,
    /// Face shown.
    pub value: u8,
}

/// Tie-break progress for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TieBreakState {
    /// The round is not tied.
    NoTieDetected,
    /// The round is tied and has no persisted tie-break.
    TieDetected,
    /// Waiting for the next throw.
    RollPending,
    /// The last throw shared its highest value; roll again.
    RollTied,
    /// The last throw produced a unique highest value.
    RollResolved {
        /// Team with the highest roll
        winner: String,
    },
    /// The decision has been persisted.
    WinnerConfirmed {
        /// Persisted winner
        winner: String,
    },
}

impl TieBreakState {
    const fn name(&self) -> &'static str {
        match self {
            Self::NoTieDetected => "no_tie_detected",
            Self::TieDetected => "tie_detected",
            Self::RollPending => "roll_pending",
            Self::RollTied => "roll_tied",
            Self::RollResolved { .. } => "roll_resolved",
            Self::WinnerConfirmed { .. } => "winner_confirmed",
        }
    }
}

/// A tie-break in progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TieBreak {
    round: String,
    teams: Vec<String>,
    score: Points,
    state: TieBreakState,
    rolls: Vec<Vec<DiceRoll>>,
}

impl TieBreak {
    /// Inspects a round result and opens a session for it.
    ///
    /// The session starts in `TieDetected` for a tied round and in
    /// `NoTieDetected` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyResolved`] if a tie-break has already
    /// been persisted for the round.
    pub fn detect(result: &MatchResult) -> Result<Self, EngineError> {
        if result.has_tie_break {
            return Err(EngineError::AlreadyResolved {
                round: result.round.clone(),
                winner: result.winner.clone().unwrap_or_default(),
            });
        }

        let (teams, score, state) = match &result.resolution {
            Resolution::Tie { score, teams } => {
                (teams.clone(), *score, TieBreakState::TieDetected)
            }
            _ => (Vec::new(), 0, TieBreakState::NoTieDetected),
        };
        debug!(round = %result.round, state = state.name(), "tie-break session opened");

        Ok(Self {
            round: result.round.clone(),
            teams,
            score,
            state,
            rolls: Vec::new(),
        })
    }

    /// Round being settled.
    #[must_use]
    pub fn round(&self) -> &str {
        &self.round
    }

    /// Tied teams, in name order.
    #[must_use]
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Shared total that caused the tie.
    #[must_use]
    pub const fn score(&self) -> Points {
        self.score
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &TieBreakState {
        &self.state
    }

    /// Number of throws so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        u32::try_from(self.rolls.len()).unwrap_or(u32::MAX)
    }

    /// The most recent throw.
    #[must_use]
    pub fn last_roll(&self) -> Option<&[DiceRoll]> {
        self.rolls.last().map(Vec::as_slice)
    }

    /// Winner of the last throw or of the confirmed decision.
    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        match &self.state {
            TieBreakState::RollResolved { winner } | TieBreakState::WinnerConfirmed { winner } => {
                Some(winner)
            }
            _ => None,
        }
    }

    /// Moves a detected tie to `RollPending`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotATie`] when the round is not tied and
    /// [`EngineError::InvalidTransition`] from any other state.
    pub fn begin(&mut self) -> Result<(), EngineError> {
        match self.state {
            TieBreakState::TieDetected => {
                self.state = TieBreakState::RollPending;
                Ok(())
            }
            TieBreakState::NoTieDetected => Err(EngineError::NotATie {
                round: self.round.clone(),
            }),
            _ => Err(self.invalid("begin")),
        }
    }

    /// Throws one die per tied team.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless a throw is pending.
    pub fn roll(&mut self, dice: &mut dyn Dice, faces: u8) -> Result<&TieBreakState, EngineError> {
        if !matches!(
            self.state,
            TieBreakState::RollPending | TieBreakState::RollTied
        ) {
            return Err(self.invalid("roll"));
        }

        let throw: Vec<DiceRoll> = self
            .teams
            .iter()
            .map(|team| DiceRoll {
                team: team.clone(),
                value: dice.roll(faces),
            })
            .collect();

        let high = throw.iter().map(|r| r.value).max().unwrap_or_default();
        let mut leaders = throw.iter().filter(|r| r.value == high);
        self.state = match (leaders.next(), leaders.next()) {
            (Some(winner), None) => TieBreakState::RollResolved {
                winner: winner.team.clone(),
            },
            _ => TieBreakState::RollTied,
        };
        debug!(
            round = %self.round,
            attempt = self.rolls.len() + 1,
            rolls = ?throw,
            state = self.state.name(),
            "tie-break roll"
        );
        self.rolls.push(throw);

        Ok(&self.state)
    }

    /// The `system` score entry recording the resolved winner.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless the last throw
    /// resolved the tie.
    pub fn confirmation_record(&self) -> Result<ScoreRecord, EngineError> {
        let TieBreakState::RollResolved { winner } = &self.state else {
            return Err(self.invalid("confirm"));
        };
        let losers: Vec<String> = self.teams.iter().filter(|t| *t != winner).cloned().collect();
        Ok(ScoreRecord::tie_break(&self.round, winner, &losers))
    }

    /// Marks the resolved winner as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless the last throw
    /// resolved the tie.
    pub fn mark_confirmed(&mut self) -> Result<&str, EngineError> {
        let TieBreakState::RollResolved { winner } = &self.state else {
            return Err(self.invalid("confirm"));
        };
        info!(round = %self.round, winner = %winner, rolls = self.rolls.len(), "tie-break confirmed");
        self.state = TieBreakState::WinnerConfirmed {
            winner: winner.clone(),
        };
        Ok(self.winner().unwrap_or_default())
    }

    fn invalid(&self, action: &str) -> EngineError {
        EngineError::InvalidTransition(format!(
            "cannot {action} tie-break for round '{}' in state {}",
            self.round,
            self.state.name()
        ))
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Runs a tie-break session to a decision.
#[derive(Debug, Clone, Copy)]
pub struct TieBreakEngine {
    faces: u8,
    max_rolls: u32,
}

impl TieBreakEngine {
    /// Creates an engine from the dice settings.
    #[must_use]
    pub const fn new(config: TieBreakConfig) -> Self {
        Self {
            faces: config.faces,
            max_rolls: config.max_rolls,
        }
    }

    /// Faces on each die.
    #[must_use]
    pub const fn faces(&self) -> u8 {
        self.faces
    }

    /// Rolls once, from `TieDetected` or a pending throw.
    ///
    /// # Errors
    ///
    /// Propagates transition errors and returns
    /// [`EngineError::RerollLimit`] once the roll budget is spent.
    pub fn step<'s>(
        &self,
        session: &'s mut TieBreak,
        dice: &mut dyn Dice,
    ) -> Result<&'s TieBreakState, EngineError> {
        if matches!(session.state, TieBreakState::TieDetected) {
            session.begin()?;
        }
        if session.attempts() >= self.max_rolls {
            return Err(EngineError::RerollLimit {
                round: session.round.clone(),
                attempts: session.attempts(),
            });
        }
        session.roll(dice, self.faces)
    }

    /// Rolls until a unique highest value appears and returns the winner.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RerollLimit`] when every allowed throw tied,
    /// or a transition error when the session cannot roll.
    pub fn run(&self, session: &mut TieBreak, dice: &mut dyn Dice) -> Result<String, EngineError> {
        loop {
            if let TieBreakState::RollResolved { winner } = self.step(session, dice)? {
                return Ok(winner.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregate::Aggregation;

    #[test]
    fn thrown_faces_must_exist_on_the_die() {
        assert_eq!(ScriptedDice::thrown([9, 2], 6).unwrap_err(), 9);
        assert_eq!(ScriptedDice::thrown([3, 0], 6).unwrap_err(), 0);

        let mut dice = ScriptedDice::thrown([6, 1], 6).unwrap();
        assert_eq!((dice.roll(6), dice.roll(6)), (6, 1));
    }

    fn tied(round: &str, teams: &[&str], score: Points) -> MatchResult {
        MatchResult::from_aggregation(&Aggregation {
            round: round.to_string(),
            totals: teams.iter().map(|t| ((*t).to_string(), score)).collect(),
            counted: 2,
            judged: 2,
            ..Aggregation::default()
        })
    }

    fn engine() -> TieBreakEngine {
        TieBreakEngine::new(TieBreakConfig::default())
    }

    #[test]
    fn full_cycle_to_confirmed() {
        let mut session = TieBreak::detect(&tied("Ronda 1", &["TeamA", "TeamB"], 13)).unwrap();
        assert_eq!(*session.state(), TieBreakState::TieDetected);
        assert_eq!(session.score(), 13);

        let mut dice = ScriptedDice::new([5, 2]);
        let winner = engine().run(&mut session, &mut dice).unwrap();
        assert_eq!(winner, "TeamA");
        assert_eq!(session.attempts(), 1);

        let record = session.confirmation_record().unwrap();
        assert_eq!(record.judge_id, "system");
        assert_eq!(record.match_id, "Ronda 1");
        assert_eq!(record.teams[0].name, "TeamA");
        assert_eq!(record.teams[0].total, 1);
        assert_eq!(record.teams[1].total, 0);

        assert_eq!(session.mark_confirmed().unwrap(), "TeamA");
        assert!(matches!(
            session.state(),
            TieBreakState::WinnerConfirmed { .. }
        ));
    }

    #[test]
    fn equal_rolls_reroll() {
        let mut session = TieBreak::detect(&tied("R", &["TeamA", "TeamB"], 4)).unwrap();
        let mut dice = ScriptedDice::new([3, 3, 6, 6, 1, 2]);
        let winner = engine().run(&mut session, &mut dice).unwrap();
        assert_eq!(winner, "TeamB");
        assert_eq!(session.attempts(), 3);
    }

    #[test]
    fn three_way_tie_needs_unique_high() {
        let mut session = TieBreak::detect(&tied("R", &["TeamA", "TeamB", "TeamC"], 4)).unwrap();
        let engine = engine();
        let mut dice = ScriptedDice::new([6, 6, 1, 2, 5, 4]);
        assert_eq!(
            *engine.step(&mut session, &mut dice).unwrap(),
            TieBreakState::RollTied
        );
        assert_eq!(session.last_roll().unwrap().len(), 3);
        assert_eq!(
            *engine.step(&mut session, &mut dice).unwrap(),
            TieBreakState::RollResolved {
                winner: "TeamB".to_string()
            }
        );
        let record = session.confirmation_record().unwrap();
        assert_eq!(record.teams.len(), 3);
    }

    #[test]
    fn not_tied_round_cannot_begin() {
        let result = MatchResult::from_aggregation(&Aggregation {
            round: "R".to_string(),
            totals: [("TeamA".to_string(), 3), ("TeamB".to_string(), 2)].into(),
            counted: 1,
            judged: 1,
            ..Aggregation::default()
        });
        let mut session = TieBreak::detect(&result).unwrap();
        assert_eq!(*session.state(), TieBreakState::NoTieDetected);
        assert!(matches!(session.begin(), Err(EngineError::NotATie { .. })));
    }

    #[test]
    fn persisted_tie_break_is_already_resolved() {
        let mut result = tied("R", &["TeamA", "TeamB"], 4);
        result.has_tie_break = true;
        result.winner = Some("TeamA".to_string());
        assert!(matches!(
            TieBreak::detect(&result),
            Err(EngineError::AlreadyResolved { .. })
        ));
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut session = TieBreak::detect(&tied("R", &["TeamA", "TeamB"], 4)).unwrap();
        let mut dice = ScriptedDice::new([1, 2]);
        assert!(matches!(
            session.roll(&mut dice, 6),
            Err(EngineError::InvalidTransition(_))
        ));
        assert!(session.confirmation_record().is_err());
        session.begin().unwrap();
        assert!(session.begin().is_err());
    }

    #[test]
    fn reroll_limit() {
        let mut session = TieBreak::detect(&tied("R", &["TeamA", "TeamB"], 4)).unwrap();
        let engine = TieBreakEngine::new(TieBreakConfig {
            faces: 6,
            max_rolls: 3,
        });
        let mut dice = ScriptedDice::new([2; 10]);
        match engine.run(&mut session, &mut dice) {
            Err(EngineError::RerollLimit { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RerollLimit, got {other:?}"),
        }
    }

    #[test]
    fn seeded_dice_are_reproducible_and_in_range() {
        let mut a = SeededDice::new(7);
        let mut b = SeededDice::new(7);
        for _ in 0..100 {
            let roll = a.roll(6);
            assert_eq!(roll, b.roll(6));
            assert!((1..=6).contains(&roll));
        }
        let roll = ThreadDice.roll(6);
        assert!((1..=6).contains(&roll));
    }
}
