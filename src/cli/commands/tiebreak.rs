//! `rostrum tiebreak`
//!
//! Opens a tie-break on a tied round, throws until one team rolls highest,
//! persists the winner and saves the data file. Faces thrown by hand can be
//! passed with `--dice`; if they tie again nothing is saved and staff are
//! asked to throw again.

use serde::Serialize;

use super::{Workspace, print_json};
use crate::cli::args::{OutputFormat, TiebreakArgs};
use crate::engine::{Dice, DiceRoll, ScriptedDice, SeededDice, ThreadDice, TieBreakState};
use crate::error::RostrumError;
use crate::model::Points;
use crate::tournament::Tournament;

#[derive(Debug, Serialize)]
struct Outcome {
    round: String,
    teams: Vec<String>,
    score: Points,
    throws: Vec<Vec<DiceRoll>>,
    winner: String,
}

/// Settle a tied round.
///
/// # Errors
///
/// Returns an engine error when the round is not tied or already settled,
/// a usage error when hand-thrown faces do not fit the tied teams, are not
/// on the die, or tie again, or a store error if the data file cannot be written.
pub async fn run(args: &TiebreakArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    let tournament = workspace.tournament();
    let round = args.round.as_str();

    let session = tournament.start_tie_break(round).await?;
    let teams = session.teams().to_vec();

    let (mut dice, limit): (Box<dyn Dice>, Option<usize>) = if args.dice.is_empty() {
        match args.seed {
            Some(seed) => (Box::new(SeededDice::new(seed)), None),
            None => (Box::new(ThreadDice), None),
        }
    } else {
        let per_throw = teams.len().max(1);
        if args.dice.len() % per_throw != 0 {
            tournament.abandon_tie_break(round);
            return Err(RostrumError::Usage(format!(
                "--dice needs one face per tied team per throw ({} teams, {} faces given)",
                teams.len(),
                args.dice.len()
            )));
        }
        let faces = tournament.config().tiebreak.faces;
        let thrown = match ScriptedDice::thrown(args.dice.iter().copied(), faces) {
            Ok(thrown) => thrown,
            Err(bad) => {
                tournament.abandon_tie_break(round);
                return Err(RostrumError::Usage(format!(
                    "--dice face {bad} is not on a {faces}-sided die"
                )));
            }
        };
        (Box::new(thrown), Some(args.dice.len() / per_throw))
    };

    let (throws, winner) = match throw_until_resolved(tournament, round, dice.as_mut(), limit) {
        Ok(outcome) => outcome,
        Err(e) => {
            tournament.abandon_tie_break(round);
            return Err(e);
        }
    };

    tournament.confirm_tie_break(round).await?;
    workspace.save().await?;

    let outcome = Outcome {
        round: round.to_owned(),
        teams,
        score: session.score(),
        throws,
        winner,
    };
    match args.format {
        OutputFormat::Human => print!("{}", render(&outcome)),
        OutputFormat::Json => print_json(&outcome)?,
    }
    Ok(())
}

fn throw_until_resolved(
    tournament: &Tournament,
    round: &str,
    dice: &mut dyn Dice,
    limit: Option<usize>,
) -> Result<(Vec<Vec<DiceRoll>>, String), RostrumError> {
    let mut throws = Vec::new();
    loop {
        if limit.is_some_and(|l| throws.len() >= l) {
            return Err(RostrumError::Usage(
                "the dice tied again; throw again and pass the new faces".to_owned(),
            ));
        }

        let state = tournament.roll_tie_break(round, dice)?;
        if let Some(session) = tournament.tie_break(round) {
            throws.push(session.last_roll().map(<[_]>::to_vec).unwrap_or_default());
        }
        if let TieBreakState::RollResolved { winner } = state {
            return Ok((throws, winner));
        }
    }
}

fn render(outcome: &Outcome) -> String {
    let mut out = format!(
        "{}: {} tied at {}\n",
        outcome.round,
        outcome.teams.join(", "),
        outcome.score
    );
    for (i, throw) in outcome.throws.iter().enumerate() {
        let faces: Vec<String> = throw
            .iter()
            .map(|r| format!("{} {}", r.team, r.value))
            .collect();
        out.push_str(&format!("  throw {}: {}\n", i + 1, faces.join(", ")));
    }
    out.push_str(&format!("{} wins the tie-break\n", outcome.winner));
    out
}
