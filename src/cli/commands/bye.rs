//! `rostrum bye`

use super::Workspace;
use crate::cli::args::ByeArgs;
use crate::error::RostrumError;

/// Record an uncontested advance and save the data file.
///
/// # Errors
///
/// Returns an engine error when the bye already exists or the round or
/// team is unknown, or a store error if the data file cannot be written.
pub async fn run(args: &ByeArgs) -> Result<(), RostrumError> {
    let workspace = Workspace::open(&args.data).await?;
    workspace
        .tournament()
        .confirm_bye(&args.round, &args.team)
        .await?;
    workspace.save().await?;
    println!("{}: {} advances (bye)", args.round, args.team);
    Ok(())
}
