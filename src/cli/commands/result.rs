//! `rostrum result`

use super::{Workspace, print_json};
use crate::cli::args::{OutputFormat, RoundArgs};
use crate::engine::{MatchResult, Resolution};
use crate::error::RostrumError;

/// Show the aggregated result of a round.
///
/// # Errors
///
/// Returns an engine error for an unknown round, or a load error.
pub async fn run(args: &RoundArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    let result = workspace.tournament().match_result(&args.round).await?;

    match args.format {
        OutputFormat::Human => print!("{}", render(&result)),
        OutputFormat::Json => print_json(&result)?,
    }
    Ok(())
}

fn render(result: &MatchResult) -> String {
    let mut out = match &result.resolution {
        Resolution::Pending => format!("{}: pending\n", result.round),
        Resolution::Tie { score, teams } => {
            format!("{}: tied at {score} ({})\n", result.round, teams.join(", "))
        }
        Resolution::Decided { winner, .. } if result.has_bye => {
            format!("{}: {winner} advances (bye)\n", result.round)
        }
        Resolution::Decided { winner, .. } if result.has_tie_break => {
            format!("{}: {winner} wins on tie-break\n", result.round)
        }
        Resolution::Decided { winner, score } => {
            format!("{}: {winner} wins with {score}\n", result.round)
        }
    };

    let width = result.teams.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for team in &result.teams {
        out.push_str(&format!("  {:<width$}  {:>4}\n", team.name, team.total_points));
    }
    out.push_str(&format!("  submissions: {}\n", result.submissions));
    out
}
