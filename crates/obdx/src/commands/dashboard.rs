//! `obdx dashboard`: the administrator counters.

use obdx_core::{DashboardStats, RemoteStore, Scheduler};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(s: &DashboardStats) -> String {
    [
        format!("Reservations:      {}", s.total_reservations),
        format!("  awaiting review: {}", s.new_reservations),
        format!("Support tickets:   {}", s.total_tickets),
        format!("  open:            {}", s.open_tickets),
    ]
    .join("\n")
}

pub async fn handle(scheduler: &Scheduler<RemoteStore>, global: &GlobalOpts) -> Result<(), CliError> {
    let stats = scheduler.dashboard().await?;
    let out = output::render_single(&global.output, &stats, detail, |s| {
        format!(
            "{} {} {} {}",
            s.total_reservations, s.new_reservations, s.total_tickets, s.open_tickets
        )
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
