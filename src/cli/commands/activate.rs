//! `rostrum activate`

use super::{Workspace, print_json};
use crate::cli::args::{ActivateArgs, OutputFormat};
use crate::engine::ActivationReport;
use crate::error::RostrumError;

/// Set the active round and save the data file.
///
/// Without `--team` the computed line-up is used and must be complete.
/// With `--team` the given teams are placed as-is and any disagreement
/// with the computed line-up is reported.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::NotDetermined`] when the computed
/// line-up still has open slots, or a store error.
pub async fn run(args: &ActivateArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    let tournament = workspace.tournament();

    let report = if args.teams.is_empty() {
        tournament.activate_qualified(&args.round).await?
    } else {
        tournament
            .set_active_round(&args.round, args.teams.clone())
            .await?
    };
    workspace.save().await?;

    match args.format {
        OutputFormat::Human => print!("{}", render(&args.round, &report)),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn render(round: &str, report: &ActivationReport) -> String {
    let mut out = format!(
        "{round} is now active: {}\n",
        report.state.team_names().join(", ")
    );
    if let Some(m) = &report.mismatch {
        if m.undetermined {
            out.push_str("  note: the computed line-up is not yet determined\n");
        }
        if !m.unexpected.is_empty() {
            out.push_str(&format!("  not qualified: {}\n", m.unexpected.join(", ")));
        }
        if !m.missing.is_empty() {
            out.push_str(&format!("  left out: {}\n", m.missing.join(", ")));
        }
        if m.reordered {
            out.push_str("  note: order differs from the computed line-up\n");
        }
    }
    out
}
