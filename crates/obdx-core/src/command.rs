// ── Administrator commands ──
//
// Every slot status change is a conditional write on the status the
// command expects, so an administrator can never overwrite a booking that
// landed a moment earlier.

use tracing::{info, warn};

use crate::config::{CancelledRule, SchedulerConfig};
use crate::error::CoreError;
use crate::model::{
    NewSlot, NewTicket, Reservation, ReservationId, ReservationStatus, Slot, SlotId, SlotStatus,
    SupportTicket, TicketId, TicketStatus,
};
use crate::store::{
    ConditionalOutcome, DeleteOutcome, Precondition, SlotChange, SlotEdit, Store,
};

/// A mutation requested by an administrator.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Slot operations ──────────────────────────────────────────────
    CreateSlot(NewSlot),
    /// Change the window or the notes. Status and link are untouched.
    UpdateSlot {
        id: SlotId,
        edit: SlotEdit,
    },
    BlockSlot {
        id: SlotId,
    },
    UnblockSlot {
        id: SlotId,
    },
    /// Free a reserved slot. The reservation itself is kept.
    ReleaseSlot {
        id: SlotId,
    },
    DeleteSlot {
        id: SlotId,
    },

    // ── Reservation operations ───────────────────────────────────────
    SetReservationStatus {
        id: ReservationId,
        status: ReservationStatus,
    },

    // ── Support tickets ──────────────────────────────────────────────
    CreateTicket(NewTicket),
    SetTicketStatus {
        id: TicketId,
        status: TicketStatus,
    },
}

#[derive(Debug, Clone)]
pub enum CommandResult {
    Slot(Slot),
    SlotDeleted(Slot),
    Reservation {
        reservation: Reservation,
        /// Slot freed as a consequence of a cancellation.
        released_slot: Option<SlotId>,
    },
    Ticket(SupportTicket),
}

pub(crate) async fn route<S: Store>(
    store: &S,
    config: &SchedulerConfig,
    cmd: Command,
) -> Result<CommandResult, CoreError> {
    match cmd {
        Command::CreateSlot(new) => {
            new.validate()?;
            let slot = store.insert_slot(new).await?;
            info!(slot_id = %slot.id, start = %slot.start(), status = %slot.status, "slot created");
            Ok(CommandResult::Slot(slot))
        }
        Command::UpdateSlot { id, edit } => update_slot(store, id, edit).await,
        Command::BlockSlot { id } => {
            transition(store, id, SlotStatus::Available, SlotStatus::Blocked).await
        }
        Command::UnblockSlot { id } => {
            transition(store, id, SlotStatus::Blocked, SlotStatus::Available).await
        }
        Command::ReleaseSlot { id } => {
            transition(store, id, SlotStatus::Reserved, SlotStatus::Available).await
        }
        Command::DeleteSlot { id } => match store.delete_slot(id).await? {
            DeleteOutcome::Deleted(slot) => {
                info!(slot_id = %id, "slot deleted");
                Ok(CommandResult::SlotDeleted(slot))
            }
            DeleteOutcome::Refused(slot) => Err(CoreError::SlotReserved {
                slot_id: id,
                reservation_id: slot.reservation_id,
            }),
            DeleteOutcome::NotFound => Err(CoreError::not_found("slot", id)),
        },
        Command::SetReservationStatus { id, status } => {
            set_reservation_status(store, config, id, status).await
        }
        Command::CreateTicket(new) => {
            new.validate()?;
            let ticket = store.create_ticket(new).await?;
            info!(ticket_id = %ticket.id, "support ticket opened");
            Ok(CommandResult::Ticket(ticket))
        }
        Command::SetTicketStatus { id, status } => store
            .update_ticket_status(id, status)
            .await?
            .map(CommandResult::Ticket)
            .ok_or_else(|| CoreError::not_found("ticket", id)),
    }
}

/// Conditionally move a slot from `from` to `to`.
async fn transition<S: Store>(
    store: &S,
    id: SlotId,
    from: SlotStatus,
    to: SlotStatus,
) -> Result<CommandResult, CoreError> {
    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidTransition { slot_id: id, from, to });
    }
    let outcome = store
        .conditional_update_slot(id, Precondition::status(from), SlotChange::to(to))
        .await?;

    match outcome {
        ConditionalOutcome::Applied(slot) => {
            info!(slot_id = %id, %from, %to, "slot status changed");
            Ok(CommandResult::Slot(slot))
        }
        ConditionalOutcome::PreconditionFailed(current) => {
            if current.status == SlotStatus::Reserved && !current.status.can_transition_to(to) {
                return Err(CoreError::SlotReserved {
                    slot_id: id,
                    reservation_id: current.reservation_id,
                });
            }
            Err(CoreError::InvalidTransition {
                slot_id: id,
                from: current.status,
                to,
            })
        }
        ConditionalOutcome::NotFound => Err(CoreError::not_found("slot", id)),
    }
}

async fn update_slot<S: Store>(
    store: &S,
    id: SlotId,
    edit: SlotEdit,
) -> Result<CommandResult, CoreError> {
    if edit.is_empty() {
        return Err(CoreError::ValidationFailed {
            field: "slot".into(),
            message: "nothing to update".into(),
        });
    }
    // A reservation echoes its slot's window; the store refuses to move a
    // reserved slot in the same write that would move it.
    match store.edit_slot(id, edit).await? {
        ConditionalOutcome::Applied(slot) => {
            info!(slot_id = %id, "slot updated");
            Ok(CommandResult::Slot(slot))
        }
        ConditionalOutcome::PreconditionFailed(current) => Err(CoreError::SlotReserved {
            slot_id: id,
            reservation_id: current.reservation_id,
        }),
        ConditionalOutcome::NotFound => Err(CoreError::not_found("slot", id)),
    }
}

async fn set_reservation_status<S: Store>(
    store: &S,
    config: &SchedulerConfig,
    id: ReservationId,
    status: ReservationStatus,
) -> Result<CommandResult, CoreError> {
    let reservation = store
        .update_reservation_status(id, status)
        .await?
        .ok_or_else(|| CoreError::not_found("reservation", id))?;
    info!(reservation_id = %id, %status, "reservation status changed");

    let mut released_slot = None;
    if status == ReservationStatus::Cancelled
        && config.expiry.cancelled_reservations == CancelledRule::Release
    {
        if let Some(slot_id) = reservation.slot_id {
            let release = store
                .conditional_update_slot(
                    slot_id,
                    Precondition::held_by(id),
                    SlotChange::to(SlotStatus::Available),
                )
                .await;
            match release {
                Ok(ConditionalOutcome::Applied(_)) => {
                    info!(%slot_id, reservation_id = %id, "slot released after cancellation");
                    released_slot = Some(slot_id);
                }
                Ok(_) => {}
                // The status write stands; reconciliation frees the slot later.
                Err(e) => {
                    warn!(%slot_id, reservation_id = %id, error = %e, "could not release slot of cancelled reservation");
                }
            }
        }
    }

    Ok(CommandResult::Reservation {
        reservation,
        released_slot,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::TimeWindow;
    use crate::model::reservation::tests::details;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn window(h: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 10, h + 1, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn seed(store: &MemoryStore, status: SlotStatus) -> (SlotId, Option<ReservationId>) {
        let rid = (status == SlotStatus::Reserved).then(ReservationId::new);
        let slot = Slot {
            id: SlotId::new(),
            window: window(9),
            status,
            reservation_id: rid,
            notes: None,
            updated_at: Utc::now(),
        };
        let id = slot.id;
        store.seed_slot(slot);
        (id, rid)
    }

    async fn exec(store: &MemoryStore, cmd: Command) -> Result<CommandResult, CoreError> {
        route(store, &SchedulerConfig::default(), cmd).await
    }

    #[tokio::test]
    async fn block_and_unblock_round_trip() {
        let store = MemoryStore::new();
        let (id, _) = seed(&store, SlotStatus::Available);

        exec(&store, Command::BlockSlot { id }).await.unwrap();
        assert_eq!(store.slot(id).unwrap().status, SlotStatus::Blocked);

        let again = exec(&store, Command::BlockSlot { id }).await.unwrap_err();
        assert!(matches!(again, CoreError::InvalidTransition { .. }));

        exec(&store, Command::UnblockSlot { id }).await.unwrap();
        assert!(store.slot(id).unwrap().is_available());
    }

    #[tokio::test]
    async fn reserved_slot_cannot_be_blocked() {
        let store = MemoryStore::new();
        let (id, rid) = seed(&store, SlotStatus::Reserved);

        let err = exec(&store, Command::BlockSlot { id }).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::SlotReserved { reservation_id, .. } if reservation_id == rid
        ));
        assert!(store.slot(id).unwrap().is_held_by(rid.unwrap()));
    }

    #[tokio::test]
    async fn release_clears_link() {
        let store = MemoryStore::new();
        let (id, _) = seed(&store, SlotStatus::Reserved);

        exec(&store, Command::ReleaseSlot { id }).await.unwrap();
        let slot = store.slot(id).unwrap();
        assert!(slot.is_available());
        assert!(slot.is_consistent());
    }

    #[tokio::test]
    async fn delete_refuses_reserved_slot() {
        let store = MemoryStore::new();
        let (reserved, _) = seed(&store, SlotStatus::Reserved);
        let (open, _) = seed(&store, SlotStatus::Available);

        let err = exec(&store, Command::DeleteSlot { id: reserved })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SlotReserved { .. }));
        assert!(store.slot(reserved).is_some());

        exec(&store, Command::DeleteSlot { id: open }).await.unwrap();
        assert!(store.slot(open).is_none());
    }

    #[tokio::test]
    async fn reserved_slot_window_is_frozen() {
        let store = MemoryStore::new();
        let (id, _) = seed(&store, SlotStatus::Reserved);

        let move_it = SlotEdit {
            window: Some(window(15)),
            notes: None,
        };
        let err = exec(&store, Command::UpdateSlot { id, edit: move_it })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SlotReserved { .. }));

        let annotate = SlotEdit {
            window: None,
            notes: Some(Some("call on arrival".into())),
        };
        exec(&store, Command::UpdateSlot { id, edit: annotate })
            .await
            .unwrap();
        assert_eq!(
            store.slot(id).unwrap().notes.as_deref(),
            Some("call on arrival")
        );
    }

    #[tokio::test]
    async fn illegal_edge_rejected_before_write() {
        let store = MemoryStore::new();
        let (id, rid) = seed(&store, SlotStatus::Reserved);

        let err = transition(&store, id, SlotStatus::Reserved, SlotStatus::Blocked)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: SlotStatus::Reserved,
                to: SlotStatus::Blocked,
                ..
            }
        ));
        assert!(store.slot(id).unwrap().is_held_by(rid.unwrap()));

        let same = transition(&store, id, SlotStatus::Reserved, SlotStatus::Reserved)
            .await
            .unwrap_err();
        assert!(matches!(same, CoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn create_rejects_reserved_slots() {
        let store = MemoryStore::new();
        let err = exec(
            &store,
            Command::CreateSlot(NewSlot {
                window: window(9),
                status: SlotStatus::Reserved,
                notes: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn cancelling_releases_slot() {
        let store = MemoryStore::new();
        let (slot_id, rid) = seed(&store, SlotStatus::Reserved);
        let rid = rid.unwrap();
        store.seed_reservation(Reservation {
            id: rid,
            details: details(),
            status: ReservationStatus::Confirmed,
            slot_id: Some(slot_id),
            window: window(9),
            idempotency_key: None,
            created_at: None,
        });

        let result = exec(
            &store,
            Command::SetReservationStatus {
                id: rid,
                status: ReservationStatus::Cancelled,
            },
        )
        .await
        .unwrap();

        let CommandResult::Reservation { released_slot, .. } = result else {
            panic!("unexpected result");
        };
        assert_eq!(released_slot, Some(slot_id));
        assert!(store.slot(slot_id).unwrap().is_available());
    }

    #[tokio::test]
    async fn unknown_ticket_is_not_found() {
        let store = MemoryStore::new();
        let err = exec(
            &store,
            Command::SetTicketStatus {
                id: TicketId::new(),
                status: TicketStatus::Resolved,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
