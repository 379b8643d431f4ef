//! Slot command handlers.

use chrono::Duration;
use tabled::Tabled;

use obdx_core::{
    CalendarQuery, Command as CoreCommand, CommandResult, NewSlot, RemoteStore, Scheduler, Slot,
    SlotEdit, SlotId, SlotStatus, Store, TimeWindow,
};

use crate::cli::{GlobalOpts, SlotsArgs, SlotsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reservation")]
    reservation: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

impl From<&Slot> for SlotRow {
    fn from(s: &Slot) -> Self {
        Self {
            id: s.id.to_string(),
            start: output::timestamp(s.start()),
            end: output::timestamp(s.end()),
            status: s.status.to_string(),
            reservation: output::or_dash(s.reservation_id),
            notes: s.notes.as_deref().map(|n| output::clip(n, 32)).unwrap_or_default(),
        }
    }
}

fn detail(s: &Slot) -> String {
    [
        format!("ID:          {}", s.id),
        format!("Start:       {}", output::timestamp(s.start())),
        format!("End:         {}", output::timestamp(s.end())),
        format!("Status:      {}", s.status),
        format!("Reservation: {}", output::or_dash(s.reservation_id)),
        format!("Notes:       {}", s.notes.as_deref().unwrap_or("-")),
        format!("Updated:     {}", output::timestamp(s.updated_at)),
    ]
    .join("\n")
}

fn print_slot(slot: &Slot, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, slot, detail, |s| s.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    scheduler: &Scheduler<RemoteStore>,
    args: SlotsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SlotsCommand::List {
            all,
            from,
            to,
            status,
        } => {
            let from = from.map(|raw| util::parse_time("from", &raw)).transpose()?;
            let to = to.map(|raw| util::parse_time("to", &raw)).transpose()?;

            let mut query = if all || status.is_some() {
                CalendarQuery::admin()
            } else {
                CalendarQuery::customer()
            }
            .between(from, to);
            query.status = status.map(SlotStatus::from);

            let slots = scheduler.calendar(&query).await?;
            let out = output::render_list(
                &global.output,
                &slots,
                |s| SlotRow::from(s),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SlotsCommand::Create {
            start,
            end,
            minutes,
            blocked,
            notes,
        } => {
            let start = util::parse_time("start", &start)?;
            let end = match end {
                Some(raw) => util::parse_time("end", &raw)?,
                None => start + Duration::minutes(i64::from(minutes)),
            };
            let new = NewSlot {
                window: TimeWindow::new(start, end)?,
                status: if blocked {
                    SlotStatus::Blocked
                } else {
                    SlotStatus::Available
                },
                notes,
            };

            let slot = expect_slot(scheduler.execute(CoreCommand::CreateSlot(new)).await?)?;
            print_slot(&slot, global)?;
            output::notice(global, "Slot created");
            Ok(())
        }

        SlotsCommand::Update {
            id,
            start,
            end,
            notes,
            clear_notes,
        } => {
            let id: SlotId = util::parse_id(&id)?;
            let mut edit = SlotEdit::default();

            if start.is_some() || end.is_some() {
                // A half-specified window keeps the other bound from the store.
                let current = scheduler
                    .store()
                    .get_slot(id)
                    .await
                    .map_err(obdx_core::CoreError::from)?
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "slot".into(),
                        identifier: id.to_string(),
                        list_command: "slots list --all".into(),
                    })?;
                let start = match start {
                    Some(raw) => util::parse_time("start", &raw)?,
                    None => current.start(),
                };
                let end = match end {
                    Some(raw) => util::parse_time("end", &raw)?,
                    None => current.end(),
                };
                edit.window = Some(TimeWindow::new(start, end)?);
            }
            if clear_notes {
                edit.notes = Some(None);
            } else if let Some(text) = notes {
                edit.notes = Some(Some(text));
            }

            let slot =
                expect_slot(scheduler.execute(CoreCommand::UpdateSlot { id, edit }).await?)?;
            print_slot(&slot, global)?;
            output::notice(global, "Slot updated");
            Ok(())
        }

        SlotsCommand::Block { id } => {
            let id: SlotId = util::parse_id(&id)?;
            let slot = expect_slot(scheduler.execute(CoreCommand::BlockSlot { id }).await?)?;
            print_slot(&slot, global)?;
            output::notice(global, "Slot blocked");
            Ok(())
        }

        SlotsCommand::Unblock { id } => {
            let id: SlotId = util::parse_id(&id)?;
            let slot = expect_slot(scheduler.execute(CoreCommand::UnblockSlot { id }).await?)?;
            print_slot(&slot, global)?;
            output::notice(global, "Slot unblocked");
            Ok(())
        }

        SlotsCommand::Release { id } => {
            let id: SlotId = util::parse_id(&id)?;
            if !util::confirm(
                "slots release",
                &format!("Release slot {id}? Its reservation will no longer hold it."),
                global.yes,
            )? {
                return Ok(());
            }
            let slot = expect_slot(scheduler.execute(CoreCommand::ReleaseSlot { id }).await?)?;
            print_slot(&slot, global)?;
            output::notice(global, "Slot released");
            Ok(())
        }

        SlotsCommand::Delete { id } => {
            let id: SlotId = util::parse_id(&id)?;
            if !util::confirm("slots delete", &format!("Delete slot {id}?"), global.yes)? {
                return Ok(());
            }
            match scheduler.execute(CoreCommand::DeleteSlot { id }).await? {
                CommandResult::SlotDeleted(slot) => {
                    output::print_output(&slot.id.to_string(), global.quiet);
                    output::notice(global, "Slot deleted");
                    Ok(())
                }
                other => Err(unexpected(&other)),
            }
        }
    }
}

fn expect_slot(result: CommandResult) -> Result<Slot, CliError> {
    match result {
        CommandResult::Slot(slot) => Ok(slot),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(result: &CommandResult) -> CliError {
    CliError::Internal(format!("unexpected command result: {result:?}"))
}
