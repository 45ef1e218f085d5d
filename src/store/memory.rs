//! In-memory store.

use tokio::sync::{RwLock, watch};
use tracing::{debug, trace};

use super::{InsertOutcome, Snapshot, TournamentStore};
use crate::error::StoreError;
use crate::model::{DebateState, ScoreRecord};

/// Store holding every collection in memory.
///
/// Writes take the lock exclusively, so the system-entry check and insert
/// cannot interleave with another writer.
pub struct MemoryStore {
    data: RwLock<Snapshot>,
    revision: watch::Sender<u64>,
}

impl MemoryStore {
    /// Creates a store seeded with `snapshot`.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            data: RwLock::new(snapshot),
            revision,
        }
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
        trace!(revision = self.revision(), "store revision");
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

fn assign_id(record: &mut ScoreRecord) {
    if record.id.is_none() {
        record.id = Some(uuid::Uuid::new_v4().to_string());
    }
}

#[async_trait::async_trait]
impl TournamentStore for MemoryStore {
    async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.data.read().await.clone())
    }

    async fn append_score(&self, mut record: ScoreRecord) -> Result<ScoreRecord, StoreError> {
        assign_id(&mut record);
        self.data.write().await.scores.push(record.clone());
        debug!(match_id = %record.match_id, judge = %record.judge_id, "score appended");
        self.bump();
        Ok(record)
    }

    async fn insert_system_score(&self, mut record: ScoreRecord) -> Result<InsertOutcome, StoreError> {
        let mut data = self.data.write().await;
        if let Some(existing) = data.system_entry(&record.match_id) {
            return Ok(InsertOutcome::AlreadyExists(existing.clone()));
        }
        assign_id(&mut record);
        data.scores.push(record.clone());
        drop(data);

        debug!(match_id = %record.match_id, "system score inserted");
        self.bump();
        Ok(InsertOutcome::Inserted(record))
    }

    async fn put_debate_state(&self, state: DebateState) -> Result<(), StoreError> {
        self.data.write().await.debate_state = state;
        self.bump();
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::TeamScore;

    #[tokio::test]
    async fn append_assigns_id_and_bumps_revision() {
        let store = MemoryStore::default();
        let mut rx = store.subscribe();
        let mut record = ScoreRecord::judged("R1", "j1", vec![TeamScore::new("TeamA", 3)]);
        record.id = None;

        let stored = store.append_score(record).await.unwrap();
        assert!(stored.id.is_some());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(store.snapshot().await.unwrap().scores.len(), 1);
    }

    #[tokio::test]
    async fn second_system_insert_is_rejected() {
        let store = MemoryStore::default();
        let first = store
            .insert_system_score(ScoreRecord::bye("Cuartos 1", "TeamX"))
            .await
            .unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = store
            .insert_system_score(ScoreRecord::bye("Cuartos 1", "TeamX"))
            .await
            .unwrap();
        assert!(matches!(second, InsertOutcome::AlreadyExists(_)));
        assert_eq!(store.snapshot().await.unwrap().scores.len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test]
    async fn judged_scores_do_not_block_system_insert() {
        let store = MemoryStore::default();
        store
            .append_score(ScoreRecord::judged("R1", "j1", vec![TeamScore::new("TeamA", 3)]))
            .await
            .unwrap();
        let outcome = store
            .insert_system_score(ScoreRecord::tie_break("R1", "TeamA", &[]))
            .await
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));
    }

    #[tokio::test]
    async fn concurrent_system_inserts_store_one() {
        let store = Arc::new(MemoryStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert_system_score(ScoreRecord::tie_break("R1", "TeamA", &["TeamB".to_string()]))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), InsertOutcome::Inserted(_)) {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.snapshot().await.unwrap().scores.len(), 1);
    }
}
