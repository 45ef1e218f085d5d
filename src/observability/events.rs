//! Structured event stream.
//!
//! Every write the engine performs is reported as a typed event, serialized
//! as one JSON line with a monotonically increasing sequence number.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{trace, warn};

use crate::engine::DiceRoll;
use crate::model::Points;

/// A discrete tournament event, tagged with `"type"` in JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The active round changed.
    RoundActivated {
        /// When the change happened.
        timestamp: DateTime<Utc>,
        /// Activated round.
        round: String,
        /// Teams placed in the round.
        teams: Vec<String>,
        /// Whether the teams match the computed qualification.
        matches_qualification: Option<bool>,
    },

    /// A bye was recorded.
    ByeConfirmed {
        /// When the bye was recorded.
        timestamp: DateTime<Utc>,
        /// Round of the bye.
        round: String,
        /// Advancing team.
        team: String,
    },

    /// A tie-break session was opened on a tied round.
    TieDetected {
        /// When the tie was detected.
        timestamp: DateTime<Utc>,
        /// Tied round.
        round: String,
        /// Tied teams.
        teams: Vec<String>,
        /// Shared total.
        score: Points,
    },

    /// The tied teams rolled.
    DiceRolled {
        /// When the dice were thrown.
        timestamp: DateTime<Utc>,
        /// Round being settled.
        round: String,
        /// 1-based attempt number.
        attempt: u32,
        /// Each team's throw.
        rolls: Vec<DiceRoll>,
        /// Winner of the throw, if unique.
        winner: Option<String>,
    },

    /// A tie-break decision was persisted.
    TieBreakConfirmed {
        /// When the decision was persisted.
        timestamp: DateTime<Utc>,
        /// Settled round.
        round: String,
        /// Winning team.
        winner: String,
        /// Throws it took.
        attempts: u32,
    },

    /// A judge's score submission was stored.
    ScoreRecorded {
        /// When the score was stored.
        timestamp: DateTime<Utc>,
        /// Round scored.
        round: String,
        /// Judge id.
        judge: String,
        /// Teams scored.
        teams: usize,
    },
}

impl Event {
    /// The `"type"` tag this event is written with.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RoundActivated { .. } => "RoundActivated",
            Self::ByeConfirmed { .. } => "ByeConfirmed",
            Self::TieDetected { .. } => "TieDetected",
            Self::DiceRolled { .. } => "DiceRolled",
            Self::TieBreakConfirmed { .. } => "TieBreakConfirmed",
            Self::ScoreRecorded { .. } => "ScoreRecorded",
        }
    }

    /// Round the event concerns.
    #[must_use]
    pub fn round(&self) -> &str {
        match self {
            Self::RoundActivated { round, .. }
            | Self::ByeConfirmed { round, .. }
            | Self::TieDetected { round, .. }
            | Self::DiceRolled { round, .. }
            | Self::TieBreakConfirmed { round, .. }
            | Self::ScoreRecorded { round, .. } => round,
        }
    }
}

#[derive(Serialize)]
struct Line<'a> {
    sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tournament: Option<&'a str>,
    #[serde(flatten)]
    event: &'a Event,
}

/// Appends events to a JSONL sink.
///
/// A failed write is logged and dropped; it never fails the operation that
/// produced the event.
pub struct EventEmitter {
    sink: Mutex<Box<dyn Write + Send>>,
    sequence: AtomicU64,
    tournament: Option<String>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("tournament", &self.tournament)
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter writing to `sink`.
    #[must_use]
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
            sequence: AtomicU64::new(0),
            tournament: None,
        }
    }

    /// Discards events but keeps counting them.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Appends to `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Stamps every line with the tournament name.
    #[must_use]
    pub fn with_tournament(mut self, name: impl Into<String>) -> Self {
        self.tournament = Some(name.into());
        self
    }

    /// Writes `event` as one JSON line with the next sequence number.
    pub fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        trace!(sequence, kind = event.kind(), round = event.round(), "event");

        let line = Line {
            sequence,
            tournament: self.tournament.as_deref(),
            event: &event,
        };
        let written = serde_json::to_string(&line)
            .map_err(std::io::Error::from)
            .and_then(|json| {
                let mut sink = self
                    .sink
                    .lock()
                    .map_err(|_| std::io::Error::other("event sink poisoned"))?;
                writeln!(sink, "{json}")?;
                sink.flush()
            });
        if let Err(error) = written {
            warn!(%error, kind = event.kind(), "dropped event");
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
