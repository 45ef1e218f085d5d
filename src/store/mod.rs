//! Persistence boundary.
//!
//! The engine reads a [`Snapshot`] of every collection and writes only two
//! kinds of document: new score entries and the `debateState` singleton.
//! Synthetic bye and tie-break entries go through
//! [`TournamentStore::insert_system_score`], a conditional insert keyed on
//! `(matchId, judgeId = "system")` so a second write for the same key is
//! rejected by the store instead of racing in application code.

pub mod memory;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::StoreError;
use crate::model::{DebateState, DrawState, Round, ScoreRecord, Submission, Team, decode_all};

pub use memory::MemoryStore;

/// Every collection the engine reads, at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Registered teams.
    #[serde(default)]
    pub schools: Vec<Team>,
    /// Rounds created by staff.
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Score submissions, in arrival order.
    #[serde(default)]
    pub scores: Vec<ScoreRecord>,
    /// Staff draw assignments.
    #[serde(default)]
    pub draw_state: DrawState,
    /// Active round singleton.
    #[serde(default)]
    pub debate_state: DebateState,
}

impl Snapshot {
    /// Decodes every score record.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        decode_all(&self.scores)
    }

    /// Existing system entry for `match_id`, if any.
    #[must_use]
    pub fn system_entry(&self, match_id: &str) -> Option<&ScoreRecord> {
        self.scores
            .iter()
            .find(|s| s.is_system() && s.match_id == match_id)
    }
}

/// Outcome of a conditional system insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted(ScoreRecord),
    /// A system entry with the same `matchId` already exists.
    AlreadyExists(ScoreRecord),
}

/// Document store holding the tournament collections.
#[async_trait::async_trait]
pub trait TournamentStore: Send + Sync {
    /// Reads every collection.
    async fn snapshot(&self) -> Result<Snapshot, StoreError>;

    /// Appends a judge's score submission.
    ///
    /// Returns the stored record with its id assigned.
    async fn append_score(&self, record: ScoreRecord) -> Result<ScoreRecord, StoreError>;

    /// Inserts a `system` entry unless one already exists for its `matchId`.
    ///
    /// The existence check and the write happen atomically.
    async fn insert_system_score(&self, record: ScoreRecord) -> Result<InsertOutcome, StoreError>;

    /// Overwrites the `debateState` singleton.
    async fn put_debate_state(&self, state: DebateState) -> Result<(), StoreError>;

    /// Revision counter that changes on every write.
    fn subscribe(&self) -> watch::Receiver<u64>;
}
