//! `rostrum qualify`

use super::{Workspace, print_json};
use crate::cli::args::{OutputFormat, RoundArgs};
use crate::engine::{FeederStatus, Qualification, Slot};
use crate::error::RostrumError;

/// Show which teams play a round.
///
/// # Errors
///
/// Returns an engine error for an unknown round or team, or a load error.
pub async fn run(args: &RoundArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    let qualification = workspace.tournament().qualification(&args.round).await?;

    match args.format {
        OutputFormat::Human => print!("{}", render(&qualification)),
        OutputFormat::Json => print_json(&qualification)?,
    }
    Ok(())
}

fn render(q: &Qualification) -> String {
    let status = if q.determined {
        "determined".to_string()
    } else {
        format!("{} open slot(s)", q.open_slots())
    };
    let mut out = format!("{} ({}): {status}\n", q.round, q.policy);
    for (i, slot) in q.slots.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, slot_label(slot)));
    }
    out
}

/// One-line description of a slot.
pub(crate) fn slot_label(slot: &Slot) -> String {
    match slot {
        Slot::Team { name } => name.clone(),
        Slot::Awaiting { feeder, status } => {
            let why = match status {
                FeederStatus::Pending => "pending",
                FeederStatus::Tied => "tied",
                FeederStatus::Unranked => "not enough ranked teams",
                FeederStatus::Undrawn => "awaiting draw",
            };
            format!("<{feeder}: {why}>")
        }
    }
}
