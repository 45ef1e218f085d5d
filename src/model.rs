//! Tournament records as stored in the document collections, and the
//! decoded form of score submissions used by the engine.
//!
//! Stored score documents identify byes and tie-break overrides by string
//! convention (`"<round>-bye-<team>"` match ids, the `"system"` judge).
//! [`Submission`] decodes that convention once so the aggregation code
//! never has to look at match-id strings again.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Judge id used by synthetic bye and tie-break submissions.
pub const SYSTEM_JUDGE: &str = "system";

/// Separator between the round name and the team in a bye match id.
pub const BYE_SEPARATOR: &str = "-bye-";

/// Points awarded to a team by an uncontested advance.
pub const BYE_POINTS: Points = 1;

/// Rubric points. Judges' totals are whole numbers.
pub type Points = u32;

/// Staff draw assignments (`drawState` collection): round name to the teams
/// placed in it, in slot order.
pub type DrawState = BTreeMap<String, Vec<String>>;

/// A registered school team (`schools` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Document id.
    pub id: String,
    /// Display name, unique within the tournament.
    pub name: String,
    /// Whether staff approved the registration. Only verified teams compete.
    #[serde(default = "default_verified")]
    pub verified: bool,
}

const fn default_verified() -> bool {
    true
}

/// A round as stored in the `rounds` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Document id.
    pub id: String,
    /// Round name; also the `matchId` of its score submissions.
    pub name: String,
    /// Phase name as entered by staff.
    pub phase: String,
    /// Creation time, used to order rounds within a phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A team placed in the active round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    /// Team display name.
    pub name: String,
}

/// The `debateState` singleton observed by every live display.
///
/// Presentation fields owned by other screens (timer, question, video) are
/// kept untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateState {
    /// Name of the active round.
    #[serde(default)]
    pub current_round: Option<String>,
    /// Teams of the active round, in slot order.
    #[serde(default)]
    pub teams: Vec<TeamRef>,
    /// Time of the last round change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DebateState {
    /// Team names of the active round.
    #[must_use]
    pub fn team_names(&self) -> Vec<&str> {
        self.teams.iter().map(|t| t.name.as_str()).collect()
    }
}

/// One team's total inside a score submission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamScore {
    /// Team display name.
    pub name: String,
    /// Rubric total given by this judge.
    pub total: Points,
}

impl TeamScore {
    /// Creates a team score entry.
    #[must_use]
    pub fn new(name: impl Into<String>, total: Points) -> Self {
        Self {
            name: name.into(),
            total,
        }
    }
}

/// A score document as stored in the `scores` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Document id, assigned on write when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Round name, optionally suffixed with `-bye-<team>`.
    pub match_id: String,
    /// Judge id, or [`SYSTEM_JUDGE`] for synthetic entries.
    pub judge_id: String,
    /// One entry per team in the match.
    pub teams: Vec<TeamScore>,
    /// Submission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScoreRecord {
    /// A judge's rubric evaluation of a round.
    #[must_use]
    pub fn judged(round: &str, judge: &str, teams: Vec<TeamScore>) -> Self {
        Self::stamped(round.to_owned(), judge.to_owned(), teams)
    }

    /// The synthetic entry recording an uncontested advance of `team`.
    #[must_use]
    pub fn bye(round: &str, team: &str) -> Self {
        Self::stamped(
            bye_match_id(round, team),
            SYSTEM_JUDGE.to_owned(),
            vec![TeamScore::new(team, BYE_POINTS)],
        )
    }

    /// The synthetic entry recording a tie-break decision: one point for
    /// the winner and zero for every other tied team.
    #[must_use]
    pub fn tie_break(round: &str, winner: &str, losers: &[String]) -> Self {
        let mut teams = vec![TeamScore::new(winner, 1)];
        teams.extend(losers.iter().map(|l| TeamScore::new(l.clone(), 0)));
        Self::stamped(round.to_owned(), SYSTEM_JUDGE.to_owned(), teams)
    }

    fn stamped(match_id: String, judge_id: String, teams: Vec<TeamScore>) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            match_id,
            judge_id,
            teams,
            created_at: Some(Utc::now()),
        }
    }

    /// Returns `true` for bye and tie-break entries.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.judge_id == SYSTEM_JUDGE
    }

    /// Round name this record belongs to, with any bye suffix removed.
    #[must_use]
    pub fn round(&self) -> &str {
        self.match_id
            .split_once(BYE_SEPARATOR)
            .map_or(self.match_id.as_str(), |(round, _)| round)
    }
}

/// Builds the match id of a bye entry.
#[must_use]
pub fn bye_match_id(round: &str, team: &str) -> String {
    format!("{round}{BYE_SEPARATOR}{team}")
}

/// A score submission after decoding the storage conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Round the submission counts towards.
    pub round: String,
    /// Submission time, if recorded.
    pub created_at: Option<DateTime<Utc>>,
    /// What kind of submission this is.
    pub kind: SubmissionKind,
}

/// The three kinds of score submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionKind {
    /// A human judge's rubric totals.
    Judged {
        /// Judge id.
        judge: String,
        /// Per-team totals.
        scores: Vec<TeamScore>,
    },
    /// An uncontested advance.
    Bye {
        /// The advancing team.
        team: String,
        /// Points the entry contributes (normally [`BYE_POINTS`]).
        points: Points,
    },
    /// A tie-break override injected after a dice decision.
    TieBreak {
        /// Per-team override points (winner 1, others 0).
        scores: Vec<TeamScore>,
    },
}

impl Submission {
    /// Per-team points this submission adds to its round.
    #[must_use]
    pub fn contributions(&self) -> Vec<(&str, Points)> {
        match &self.kind {
            SubmissionKind::Judged { scores, .. } | SubmissionKind::TieBreak { scores } => scores
                .iter()
                .map(|s| (s.name.as_str(), s.total))
                .collect(),
            SubmissionKind::Bye { team, points } => vec![(team.as_str(), *points)],
        }
    }

    /// Returns `true` for bye and tie-break submissions.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        !matches!(self.kind, SubmissionKind::Judged { .. })
    }

    /// Winner recorded by a tie-break override.
    #[must_use]
    pub fn tie_break_winner(&self) -> Option<&str> {
        match &self.kind {
            SubmissionKind::TieBreak { scores } => scores
                .iter()
                .max_by(|a, b| a.total.cmp(&b.total).then_with(|| b.name.cmp(&a.name)))
                .map(|s| s.name.as_str()),
            _ => None,
        }
    }

    /// Encodes the submission back into its stored form.
    #[must_use]
    pub fn to_record(&self) -> ScoreRecord {
        let (match_id, judge_id, teams) = match &self.kind {
            SubmissionKind::Judged { judge, scores } => {
                (self.round.clone(), judge.clone(), scores.clone())
            }
            SubmissionKind::Bye { team, points } => (
                bye_match_id(&self.round, team),
                SYSTEM_JUDGE.to_owned(),
                vec![TeamScore::new(team.clone(), *points)],
            ),
            SubmissionKind::TieBreak { scores } => {
                (self.round.clone(), SYSTEM_JUDGE.to_owned(), scores.clone())
            }
        };
        ScoreRecord {
            id: None,
            match_id,
            judge_id,
            teams,
            created_at: self.created_at,
        }
    }
}

impl From<&ScoreRecord> for Submission {
    fn from(record: &ScoreRecord) -> Self {
        let kind = if let Some((_, team)) = record.match_id.split_once(BYE_SEPARATOR) {
            let points = record
                .teams
                .iter()
                .find(|t| t.name == team)
                .map_or(BYE_POINTS, |t| t.total);
            SubmissionKind::Bye {
                team: team.to_owned(),
                points,
            }
        } else if record.is_system() {
            SubmissionKind::TieBreak {
                scores: record.teams.clone(),
            }
        } else {
            SubmissionKind::Judged {
                judge: record.judge_id.clone(),
                scores: record.teams.clone(),
            }
        };

        Self {
            round: record.round().to_owned(),
            created_at: record.created_at,
            kind,
        }
    }
}

/// Decodes a slice of stored records.
#[must_use]
pub fn decode_all(records: &[ScoreRecord]) -> Vec<Submission> {
    records.iter().map(Submission::from).collect()
}
