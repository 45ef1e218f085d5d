//! `rostrum standings`

use super::{Workspace, print_json};
use crate::cli::args::{OutputFormat, StandingsArgs};
use crate::engine::PhaseTable;
use crate::error::RostrumError;

/// Show the cumulative standings of a phase.
///
/// # Errors
///
/// Returns an engine error for an unknown phase, or a load error.
pub async fn run(args: &StandingsArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    let table = workspace.tournament().standings(&args.phase).await?;

    match args.format {
        OutputFormat::Human => print!("{}", render(&table)),
        OutputFormat::Json => print_json(&table)?,
    }
    Ok(())
}

fn render(table: &PhaseTable) -> String {
    let width = table
        .rows
        .iter()
        .map(|r| r.team.len())
        .max()
        .unwrap_or(0)
        .max("team".len());

    let mut out = format!("{}\n", table.phase);
    out.push_str(&format!(
        "  {:>3}  {:<width$}  {:>5}  {:>6}  {:>4}  {:>4}\n",
        "#", "team", "total", "played", "wins", "ties"
    ));
    for row in &table.rows {
        out.push_str(&format!(
            "  {:>3}  {:<width$}  {:>5}  {:>6}  {:>4}  {:>4}\n",
            row.rank, row.team, row.total, row.played, row.wins, row.ties
        ));
    }

    let open: Vec<&str> = table.open_rounds().map(|r| r.round.as_str()).collect();
    if !open.is_empty() {
        out.push_str(&format!("  open: {}\n", open.join(", ")));
    }
    out
}
