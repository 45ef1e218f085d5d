//! Active round state.
//!
//! [`RoundState`] holds the `debateState` singleton behind a watch channel.
//! Writers replace the whole value; displays subscribe and re-render on
//! every change.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use super::qualify::Qualification;
use crate::error::{EngineError, RostrumError};
use crate::model::{DebateState, ScoreRecord, TeamRef};
use crate::store::{InsertOutcome, TournamentStore};

/// Difference between an activated line-up and the computed one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMismatch {
    /// Activated teams the computation did not place.
    pub unexpected: Vec<String>,
    /// Computed teams left out of the activation.
    pub missing: Vec<String>,
    /// Same teams, different slot order.
    pub reordered: bool,
    /// The computed line-up was not final.
    pub undetermined: bool,
}

impl TeamMismatch {
    /// Compares an activated line-up against a computed qualification.
    ///
    /// Returns `None` when they agree.
    #[must_use]
    pub fn between(activated: &[String], expected: &Qualification) -> Option<Self> {
        let computed = expected.teams();
        let mismatch = Self {
            unexpected: activated
                .iter()
                .filter(|t| !computed.contains(&t.as_str()))
                .cloned()
                .collect(),
            missing: computed
                .iter()
                .filter(|t| !activated.iter().any(|a| a == *t))
                .map(|t| (*t).to_owned())
                .collect(),
            reordered: false,
            undetermined: !expected.determined,
        };

        let reordered = mismatch.unexpected.is_empty()
            && mismatch.missing.is_empty()
            && !activated.iter().map(String::as_str).eq(computed.iter().copied());

        let mismatch = Self {
            reordered,
            ..mismatch
        };
        (!mismatch.unexpected.is_empty()
            || !mismatch.missing.is_empty()
            || mismatch.reordered
            || mismatch.undetermined)
            .then_some(mismatch)
    }
}

/// Result of changing the active round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReport {
    /// State after the change.
    pub state: DebateState,
    /// Disagreement with the computed line-up, if one was checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<TeamMismatch>,
}

/// Observable holder of the active round.
pub struct RoundState {
    tx: watch::Sender<DebateState>,
}

impl RoundState {
    /// Creates the holder with an initial value, usually read from the store.
    #[must_use]
    pub fn new(initial: DebateState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Current value.
    #[must_use]
    pub fn current(&self) -> DebateState {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DebateState> {
        self.tx.subscribe()
    }

    /// Stream of values, starting with the current one.
    #[must_use]
    pub fn updates(&self) -> WatchStream<DebateState> {
        WatchStream::new(self.subscribe())
    }

    /// Replaces the value wholesale, e.g. after reloading the store.
    pub fn replace(&self, state: DebateState) {
        self.tx.send_replace(state);
    }

    /// Sets the active round and its teams and publishes the change.
    ///
    /// The write is never refused; staff may place any teams. When the
    /// computed line-up is supplied and disagrees, a warning is logged and
    /// the difference is reported. Presentation fields are preserved.
    pub fn set_active_round(
        &self,
        round: &str,
        teams: Vec<String>,
        expected: Option<&Qualification>,
    ) -> ActivationReport {
        let report = self.plan_activation(round, teams, expected);
        self.publish(report.state.clone());
        report
    }

    /// Builds the state [`set_active_round`](Self::set_active_round) would
    /// publish, without notifying subscribers.
    pub fn plan_activation(
        &self,
        round: &str,
        teams: Vec<String>,
        expected: Option<&Qualification>,
    ) -> ActivationReport {
        let mismatch = expected.and_then(|q| TeamMismatch::between(&teams, q));
        if let Some(m) = &mismatch {
            warn!(
                round,
                unexpected = ?m.unexpected,
                missing = ?m.missing,
                reordered = m.reordered,
                undetermined = m.undetermined,
                "active round teams differ from computed qualification"
            );
        }

        let mut state = self.current();
        state.current_round = Some(round.to_owned());
        state.teams = teams.into_iter().map(|name| TeamRef { name }).collect();
        state.updated_at = Some(Utc::now());
        ActivationReport { state, mismatch }
    }

    /// Publishes a planned state to subscribers.
    pub fn publish(&self, state: DebateState) {
        info!(
            round = state.current_round.as_deref().unwrap_or_default(),
            teams = ?state.team_names(),
            "active round changed"
        );
        self.tx.send_replace(state);
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(DebateState::default())
    }
}

/// Records an uncontested advance of `team` in `round`.
///
/// The active round is left untouched; only the result is recorded.
///
/// # Errors
///
/// Returns [`EngineError::AlreadyAdvanced`] when the bye already exists,
/// or a store error.
pub async fn confirm_bye(
    store: &dyn TournamentStore,
    round: &str,
    team: &str,
) -> Result<ScoreRecord, RostrumError> {
    match store.insert_system_score(ScoreRecord::bye(round, team)).await? {
        InsertOutcome::Inserted(record) => {
            info!(round, team, "bye confirmed");
            Ok(record)
        }
        InsertOutcome::AlreadyExists(_) => Err(EngineError::AlreadyAdvanced {
            round: round.to_owned(),
            team: team.to_owned(),
        }
        .into()),
    }
}
