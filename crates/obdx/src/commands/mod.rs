//! Command dispatch: bridges CLI args -> scheduler calls -> output formatting.

pub mod book;
pub mod config_cmd;
pub mod dashboard;
pub mod reconcile;
pub mod reservations;
pub mod slots;
pub mod tickets;
pub mod util;

use obdx_core::{RemoteStore, Scheduler};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a store-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    scheduler: &Scheduler<RemoteStore>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Slots(args) => slots::handle(scheduler, args, global).await,
        Command::Book(args) => book::handle(scheduler, *args, global).await,
        Command::Reservations(args) => reservations::handle(scheduler, args, global).await,
        Command::Tickets(args) => tickets::handle(scheduler, args, global).await,
        Command::Reconcile(args) => reconcile::handle(scheduler, args, global).await,
        Command::Dashboard => dashboard::handle(scheduler, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions never reach the store".into(),
        )),
    }
}
