//! `rostrum bracket`

use super::qualify::slot_label;
use super::{Workspace, print_json};
use crate::cli::args::{BracketArgs, OutputFormat};
use crate::engine::{Bracket, HighlightKind, MatchState, MatchView, PhaseView};
use crate::error::RostrumError;

/// Show the whole bracket.
///
/// # Errors
///
/// Returns a load error.
pub async fn run(args: &BracketArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    let bracket = workspace.tournament().bracket().await?;

    match args.format {
        OutputFormat::Human => print!("{}", render(&bracket)),
        OutputFormat::Json => print_json(&bracket)?,
    }
    Ok(())
}

fn render(bracket: &Bracket) -> String {
    let mut out = format!("{}\n", bracket.tournament);
    for phase in &bracket.phases {
        out.push_str(&format!("\n{}\n", phase.name()));
        if let PhaseView::Group { standings, .. } = phase {
            for row in standings {
                out.push_str(&format!("  {:>2}. {} ({})\n", row.rank, row.team, row.total));
            }
        }
        for m in phase.matches() {
            let marker = match &bracket.highlight {
                Some(h) if h.round == m.round && h.kind == HighlightKind::Current => "*",
                Some(h) if h.round == m.round => ">",
                _ => " ",
            };
            out.push_str(&format!("{marker} {}: {}\n", m.round, describe(m)));
        }
    }
    out
}

fn describe(m: &MatchView) -> String {
    let lineup = if m.teams.is_empty() {
        m.slots.iter().map(slot_label).collect::<Vec<_>>().join(" vs ")
    } else {
        m.teams
            .iter()
            .map(|t| format!("{} {}", t.name, t.total_points))
            .collect::<Vec<_>>()
            .join(" vs ")
    };
    let state = match (m.state, m.winner.as_deref()) {
        (MatchState::Decided | MatchState::Bye, Some(w)) => format!("winner {w}"),
        (MatchState::Tied, _) => "tied".to_string(),
        _ => "pending".to_string(),
    };
    if lineup.is_empty() {
        state
    } else {
        format!("{lineup} [{state}]")
    }
}
