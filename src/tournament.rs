//! Tournament service.
//!
//! Wires the configuration, a [`TournamentStore`], the active-round state
//! and the event stream around the engine. Read operations take a fresh
//! snapshot each time and recompute from scratch; write operations go
//! through the store's conditional inserts.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, instrument, warn};

use crate::config::{TournamentConfig, suggest};
use crate::engine::{
    ActivationReport, Bracket, BracketProjection, Dice, MatchResult, PhaseTable, Qualification,
    QualificationResolver, RoundState, ScoreAggregator, TieBreak, TieBreakEngine, TieBreakState,
    phase_rounds, round_state,
};
use crate::error::{EngineError, Result, RostrumError};
use crate::model::{Round, ScoreRecord, Submission, SubmissionKind};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::store::{InsertOutcome, Snapshot, TournamentStore};

/// A running tournament.
pub struct Tournament {
    config: Arc<TournamentConfig>,
    store: Arc<dyn TournamentStore>,
    round_state: RoundState,
    events: Arc<EventEmitter>,
    tie_breaks: DashMap<String, TieBreak>,
    tie_break_engine: TieBreakEngine,
}

impl Tournament {
    /// Opens a tournament over `store`, seeding the active round from the
    /// stored `debateState`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the initial snapshot cannot be read.
    pub async fn open(
        config: Arc<TournamentConfig>,
        store: Arc<dyn TournamentStore>,
        events: Arc<EventEmitter>,
    ) -> Result<Self> {
        let snapshot = store.snapshot().await?;
        debug!(
            tournament = %config.tournament.name,
            rounds = snapshot.rounds.len(),
            scores = snapshot.scores.len(),
            "tournament opened"
        );
        Ok(Self {
            tie_break_engine: TieBreakEngine::new(config.tiebreak),
            round_state: RoundState::new(snapshot.debate_state),
            config,
            store,
            events,
            tie_breaks: DashMap::new(),
        })
    }

    /// Tournament configuration.
    #[must_use]
    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    /// Active-round holder.
    #[must_use]
    pub const fn round_state(&self) -> &RoundState {
        &self.round_state
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TournamentStore> {
        &self.store
    }

    /// Re-reads the stored `debateState` into the active-round holder.
    ///
    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be read.
    pub async fn refresh(&self) -> Result<()> {
        let snapshot = self.store.snapshot().await?;
        self.round_state.replace(snapshot.debate_state);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Aggregated result of a round.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRound`] for a round that does not exist.
    pub async fn match_result(&self, round: &str) -> Result<MatchResult> {
        let snapshot = self.store.snapshot().await?;
        find_round(&snapshot, round)?;
        Ok(result_of(&snapshot.submissions(), round))
    }

    /// Cumulative standings of a phase.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPhase`] when the phase is neither
    /// declared nor used by any round.
    pub async fn standings(&self, phase: &str) -> Result<PhaseTable> {
        let snapshot = self.store.snapshot().await?;
        let name = match self.config.phase_key(phase) {
            Some(key) => key.to_owned(),
            None if snapshot.rounds.iter().any(|r| r.phase == phase) => phase.to_owned(),
            None => {
                let known = self
                    .config
                    .phases
                    .keys()
                    .map(String::as_str)
                    .chain(snapshot.rounds.iter().map(|r| r.phase.as_str()));
                return Err(EngineError::UnknownPhase {
                    phase: phase.to_owned(),
                    suggestion: suggest(phase, known),
                }
                .into());
            }
        };

        let rounds = phase_rounds(&self.config, &snapshot.rounds, &name);
        Ok(PhaseTable::compute(&name, &rounds, &snapshot.submissions()))
    }

    /// Computed line-up of a round.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRound`] or [`EngineError::UnknownTeam`].
    pub async fn qualification(&self, round: &str) -> Result<Qualification> {
        let snapshot = self.store.snapshot().await?;
        Ok(self.resolve(&snapshot, round)?)
    }

    /// Bracket view of the whole tournament, highlighting the active round.
    ///
    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be read.
    pub async fn bracket(&self) -> Result<Bracket> {
        let mut snapshot = self.store.snapshot().await?;
        snapshot.debate_state = self.round_state.current();
        Ok(BracketProjection::new(&self.config, &snapshot).project())
    }

    fn resolve(
        &self,
        snapshot: &Snapshot,
        round: &str,
    ) -> std::result::Result<Qualification, EngineError> {
        let submissions = snapshot.submissions();
        QualificationResolver::new(
            &self.config,
            &snapshot.rounds,
            &submissions,
            &snapshot.schools,
            &snapshot.draw_state,
        )
        .resolve(round)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Stores a judge's score submission.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSubmission`] for system or empty
    /// submissions and [`EngineError::UnknownRound`] for an unknown round.
    #[instrument(skip_all, fields(round = %record.match_id, judge = %record.judge_id))]
    pub async fn record_score(&self, record: ScoreRecord) -> Result<ScoreRecord> {
        let submission = Submission::from(&record);
        if !matches!(submission.kind, SubmissionKind::Judged { .. }) {
            return Err(EngineError::InvalidSubmission(
                "bye and tie-break entries are written by the engine".to_owned(),
            )
            .into());
        }
        if record.teams.is_empty() {
            return Err(EngineError::InvalidSubmission("submission has no teams".to_owned()).into());
        }

        let snapshot = self.store.snapshot().await?;
        find_round(&snapshot, &submission.round)?;

        let stored = self.store.append_score(record).await?;
        metrics::record_score();
        self.events.emit(Event::ScoreRecorded {
            timestamp: Utc::now(),
            round: submission.round,
            judge: stored.judge_id.clone(),
            teams: stored.teams.len(),
        });
        Ok(stored)
    }

    /// Sets the active round to `teams`, whatever the computed line-up is.
    ///
    /// A disagreement with the computed qualification is logged and
    /// reported, never refused.
    ///
    /// # Errors
    ///
    /// Returns a store error if the new state cannot be written.
    #[instrument(skip(self, teams))]
    pub async fn set_active_round(&self, round: &str, teams: Vec<String>) -> Result<ActivationReport> {
        let snapshot = self.store.snapshot().await?;
        let expected = match self.resolve(&snapshot, round) {
            Ok(q) => Some(q),
            Err(e) => {
                warn!(error = %e, "cannot compute qualification to compare against");
                None
            }
        };
        self.activate(round, teams, expected.as_ref()).await
    }

    /// Activates a round with its computed line-up.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotDetermined`] while any slot is open.
    #[instrument(skip(self))]
    pub async fn activate_qualified(&self, round: &str) -> Result<ActivationReport> {
        let snapshot = self.store.snapshot().await?;
        let qualification = self.resolve(&snapshot, round)?;
        let teams = qualification.clone().into_teams()?;
        self.activate(round, teams, Some(&qualification)).await
    }

    async fn activate(
        &self,
        round: &str,
        teams: Vec<String>,
        expected: Option<&Qualification>,
    ) -> Result<ActivationReport> {
        let previous = self.round_state.current().current_round;
        let report = self.round_state.plan_activation(round, teams, expected);
        self.store.put_debate_state(report.state.clone()).await?;
        self.round_state.publish(report.state.clone());

        metrics::record_round_activation(round, previous.as_deref());
        self.events.emit(Event::RoundActivated {
            timestamp: Utc::now(),
            round: round.to_owned(),
            teams: report.state.team_names().into_iter().map(str::to_owned).collect(),
            matches_qualification: expected.map(|_| report.mismatch.is_none()),
        });
        Ok(report)
    }

    /// Records an uncontested advance of `team` in `round`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyAdvanced`] for a repeated bye,
    /// [`EngineError::UnknownRound`] or [`EngineError::UnknownTeam`].
    #[instrument(skip(self))]
    pub async fn confirm_bye(&self, round: &str, team: &str) -> Result<ScoreRecord> {
        let snapshot = self.store.snapshot().await?;
        find_round(&snapshot, round)?;
        let verified = snapshot.schools.iter().filter(|t| t.verified);
        if !verified.clone().any(|t| t.name == team) {
            return Err(EngineError::UnknownTeam {
                team: team.to_owned(),
                round: round.to_owned(),
                suggestion: suggest(team, verified.map(|t| t.name.as_str())),
            }
            .into());
        }

        match round_state::confirm_bye(self.store.as_ref(), round, team).await {
            Ok(record) => {
                metrics::record_bye_confirmed();
                self.events.emit(Event::ByeConfirmed {
                    timestamp: Utc::now(),
                    round: round.to_owned(),
                    team: team.to_owned(),
                });
                Ok(record)
            }
            Err(e) => {
                if matches!(e, RostrumError::Engine(EngineError::AlreadyAdvanced { .. })) {
                    metrics::record_duplicate_rejected("bye");
                }
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tie-breaks
    // ------------------------------------------------------------------------

    /// Inspects a round for a tie without opening a session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyResolved`] when a tie-break was
    /// already persisted, or [`EngineError::UnknownRound`].
    pub async fn detect_tie(&self, round: &str) -> Result<TieBreak> {
        let snapshot = self.store.snapshot().await?;
        find_round(&snapshot, round)?;
        let result = result_of(&snapshot.submissions(), round);
        Ok(TieBreak::detect(&result)?)
    }

    /// Opens a tie-break session for a tied round.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotATie`], [`EngineError::AlreadyResolved`],
    /// or [`EngineError::InvalidTransition`] if a session is already open.
    #[instrument(skip(self))]
    pub async fn start_tie_break(&self, round: &str) -> Result<TieBreak> {
        let mut session = self.detect_tie(round).await?;
        session.begin()?;

        match self.tie_breaks.entry(round.to_owned()) {
            Entry::Occupied(_) => {
                return Err(EngineError::InvalidTransition(format!(
                    "a tie-break for round '{round}' is already in progress"
                ))
                .into());
            }
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
            }
        }

        metrics::record_tie_detected();
        self.events.emit(Event::TieDetected {
            timestamp: Utc::now(),
            round: round.to_owned(),
            teams: session.teams().to_vec(),
            score: session.score(),
        });
        info!(teams = ?session.teams(), score = session.score(), "tie-break started");
        Ok(session)
    }

    /// Throws the dice once for an open session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when no session is open or
    /// the last throw already resolved it, and
    /// [`EngineError::RerollLimit`] once the roll budget is spent.
    pub fn roll_tie_break(&self, round: &str, dice: &mut dyn Dice) -> Result<TieBreakState> {
        let mut session = self.tie_breaks.get_mut(round).ok_or_else(|| {
            EngineError::InvalidTransition(format!("no tie-break in progress for round '{round}'"))
        })?;

        let state = self.tie_break_engine.step(&mut session, dice)?.clone();
        let winner = session.winner().map(str::to_owned);
        metrics::record_dice_roll(winner.is_some());
        self.events.emit(Event::DiceRolled {
            timestamp: Utc::now(),
            round: round.to_owned(),
            attempt: session.attempts(),
            rolls: session.last_roll().map(<[_]>::to_vec).unwrap_or_default(),
            winner,
        });
        Ok(state)
    }

    /// Persists the resolved winner of an open session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless the last throw
    /// resolved the tie, and [`EngineError::AlreadyResolved`] when another
    /// tie-break was persisted for the round in the meantime.
    #[instrument(skip(self))]
    pub async fn confirm_tie_break(&self, round: &str) -> Result<ScoreRecord> {
        let record = {
            let session = self.tie_breaks.get(round).ok_or_else(|| {
                EngineError::InvalidTransition(format!("no tie-break in progress for round '{round}'"))
            })?;
            session.confirmation_record()?
        };
        let Some((_, mut session)) = self.tie_breaks.remove(round) else {
            return Err(EngineError::InvalidTransition(format!(
                "no tie-break in progress for round '{round}'"
            ))
            .into());
        };

        let outcome = match self.store.insert_system_score(record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.tie_breaks.insert(round.to_owned(), session);
                return Err(e.into());
            }
        };
        match outcome {
            InsertOutcome::Inserted(stored) => {
                let winner = session.mark_confirmed()?.to_owned();
                metrics::record_tie_break_confirmed();
                self.events.emit(Event::TieBreakConfirmed {
                    timestamp: Utc::now(),
                    round: round.to_owned(),
                    winner,
                    attempts: session.attempts(),
                });
                Ok(stored)
            }
            InsertOutcome::AlreadyExists(existing) => {
                metrics::record_duplicate_rejected("tie_break");
                let winner = Submission::from(&existing)
                    .tie_break_winner()
                    .unwrap_or_default()
                    .to_owned();
                Err(EngineError::AlreadyResolved {
                    round: round.to_owned(),
                    winner,
                }
                .into())
            }
        }
    }

    /// Settles a tied round end to end: open, roll until decided, persist.
    ///
    /// # Errors
    ///
    /// Any error of [`start_tie_break`](Self::start_tie_break),
    /// [`roll_tie_break`](Self::roll_tie_break) or
    /// [`confirm_tie_break`](Self::confirm_tie_break). The session is
    /// discarded on failure.
    pub async fn break_tie(&self, round: &str, dice: &mut dyn Dice) -> Result<ScoreRecord> {
        self.start_tie_break(round).await?;
        loop {
            match self.roll_tie_break(round, dice) {
                Ok(TieBreakState::RollResolved { .. }) => break,
                Ok(_) => {}
                Err(e) => {
                    self.tie_breaks.remove(round);
                    return Err(e);
                }
            }
        }
        self.confirm_tie_break(round).await
    }

    /// Copy of the open session for `round`, if any.
    #[must_use]
    pub fn tie_break(&self, round: &str) -> Option<TieBreak> {
        self.tie_breaks.get(round).map(|s| s.clone())
    }

    /// Discards an open session without persisting anything.
    ///
    /// Returns `false` when no session was open for `round`.
    pub fn abandon_tie_break(&self, round: &str) -> bool {
        let removed = self.tie_breaks.remove(round).is_some();
        if removed {
            debug!(round, "tie-break abandoned");
        }
        removed
    }
}

fn find_round<'s>(snapshot: &'s Snapshot, round: &str) -> std::result::Result<&'s Round, EngineError> {
    snapshot
        .rounds
        .iter()
        .find(|r| r.name == round)
        .ok_or_else(|| EngineError::UnknownRound {
            round: round.to_owned(),
            suggestion: suggest(round, snapshot.rounds.iter().map(|r| r.name.as_str())),
        })
}

fn result_of(submissions: &[Submission], round: &str) -> MatchResult {
    let agg = ScoreAggregator::new(submissions).round(round);
    metrics::record_aggregation(agg.counted);
    MatchResult::from_aggregation(&agg)
}
