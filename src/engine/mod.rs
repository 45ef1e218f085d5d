//! Tournament progression engine.
//!
//! Everything here except [`round_state::confirm_bye`] is a pure function of
//! a snapshot: score history, rounds, roster, draws and configuration go
//! in; totals, results, qualification and bracket views come out.
//!
//! Data flows one way:
//!
//! ```text
//! submissions -> ScoreAggregator -> WinnerResolver -> QualificationResolver
//!                                       |                    |
//!                                  TieBreakEngine        RoundState -> BracketProjection
//! ```

pub mod aggregate;
pub mod bracket;
pub mod qualify;
pub mod resolve;
pub mod round_state;
pub mod standings;
pub mod tiebreak;

pub use aggregate::{Aggregation, ScoreAggregator, Totals};
pub use bracket::{Bracket, BracketProjection, Highlight, HighlightKind, MatchView, PhaseView};
pub use qualify::{FeederStatus, Qualification, QualificationResolver, QualificationSource, Slot};
pub use resolve::{MatchResult, MatchState, Resolution, TeamTotal, WinnerResolver};
pub use round_state::{ActivationReport, RoundState, TeamMismatch, confirm_bye};
pub use standings::{PhaseTable, Standing, phase_rounds};
pub use tiebreak::{
    Dice, DiceRoll, ScriptedDice, SeededDice, ThreadDice, TieBreak, TieBreakEngine, TieBreakState,
};
