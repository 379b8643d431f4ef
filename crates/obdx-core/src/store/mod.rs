// ── Store accessor ──
//
// The only path to persisted slots, reservations and tickets. Holds no
// scheduling logic: it builds queries and reports what the store said.
// Mutual exclusion between concurrent bookings is entirely the
// conditional write below; nothing above this layer takes a lock.

mod memory;
mod remote;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    NewSlot, NewTicket, Reservation, ReservationId, ReservationStatus, Slot, SlotId, SlotStatus,
    SupportTicket, TicketId, TicketStatus, TimeWindow,
};

pub use memory::{Fault, MemoryStore, StoreOp};
pub use remote::RemoteStore;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or failed internally. When
    /// `timed_out` is set a write may have been applied anyway.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String, timed_out: bool },

    #[error("store refused credentials: {message}")]
    Unauthorized { message: String },

    #[error("store rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("corrupt {entity} row {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            timed_out: false,
        }
    }

    /// `true` when the request may have been applied even though it failed.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, Self::Unavailable { timed_out: true, .. })
    }

    /// `true` when a failed write may still be in the store: the outcome is
    /// unknown, or the store answered success with a row we cannot decode.
    pub fn write_may_have_applied(&self) -> bool {
        self.outcome_unknown() || matches!(self, Self::Corrupt { .. })
    }
}

impl From<obdx_api::Error> for StoreError {
    fn from(err: obdx_api::Error) -> Self {
        let timed_out = err.is_timeout();
        match err {
            obdx_api::Error::Authentication { message } => StoreError::Unauthorized { message },
            obdx_api::Error::Conflict { message, .. } => StoreError::Duplicate {
                entity: "row",
                id: message,
            },
            obdx_api::Error::Deserialization { message, .. } => StoreError::Corrupt {
                entity: "response",
                id: String::new(),
                reason: message,
            },
            obdx_api::Error::Rest {
                message, status, ..
            } if status < 500 && status != 429 => StoreError::Rejected {
                reason: format!("HTTP {status}: {message}"),
            },
            obdx_api::Error::InvalidUrl(e) => StoreError::Rejected {
                reason: format!("invalid URL: {e}"),
            },
            other => StoreError::Unavailable {
                reason: other.to_string(),
                timed_out,
            },
        }
    }
}

// ── Query and write shapes ──────────────────────────────────────────

/// Slot read filter. A time range matches slots that overlap it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub status: Option<SlotStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SlotFilter {
    pub fn status(status: SlotStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, slot: &Slot) -> bool {
        self.status.is_none_or(|s| slot.status == s)
            && self.from.is_none_or(|from| slot.end() > from)
            && self.to.is_none_or(|to| slot.start() < to)
    }
}

/// What the slot must look like for a conditional write to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    pub status: SlotStatus,
    /// When set, the slot must also carry exactly this reservation.
    pub reservation_id: Option<ReservationId>,
}

impl Precondition {
    pub fn status(status: SlotStatus) -> Self {
        Self {
            status,
            reservation_id: None,
        }
    }

    pub fn held_by(reservation_id: ReservationId) -> Self {
        Self {
            status: SlotStatus::Reserved,
            reservation_id: Some(reservation_id),
        }
    }

    pub fn holds(&self, slot: &Slot) -> bool {
        slot.status == self.status
            && self
                .reservation_id
                .is_none_or(|rid| slot.reservation_id == Some(rid))
    }
}

/// New state written by a conditional update. The reservation link is
/// always written together with the status so the two never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChange {
    pub status: SlotStatus,
    pub reservation_id: Option<ReservationId>,
}

impl SlotChange {
    pub fn reserve(reservation_id: ReservationId) -> Self {
        Self {
            status: SlotStatus::Reserved,
            reservation_id: Some(reservation_id),
        }
    }

    pub fn to(status: SlotStatus) -> Self {
        Self {
            status,
            reservation_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalOutcome {
    Applied(Slot),
    /// The slot exists but did not satisfy the precondition; carries its
    /// current state.
    PreconditionFailed(Slot),
    NotFound,
}

/// Edit of a slot's window or notes. Never touches status or link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotEdit {
    pub window: Option<TimeWindow>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

impl SlotEdit {
    pub fn is_empty(&self) -> bool {
        self.window.is_none() && self.notes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(Slot),
    /// The slot is reserved and was left in place.
    Refused(Slot),
    NotFound,
}

// ── Accessor trait ──────────────────────────────────────────────────

/// Persistence boundary for the scheduler.
///
/// Implementations must make [`conditional_update_slot`](Store::conditional_update_slot)
/// and [`delete_slot`](Store::delete_slot) atomic per slot: the check and
/// the write happen as one operation in the backing store.
pub trait Store: Send + Sync + 'static {
    /// Slots matching `filter`, ordered by start time (ties by id).
    fn read_slots(
        &self,
        filter: &SlotFilter,
    ) -> impl Future<Output = Result<Vec<Slot>, StoreError>> + Send;

    fn get_slot(&self, id: SlotId) -> impl Future<Output = Result<Option<Slot>, StoreError>> + Send;

    fn insert_slot(&self, slot: NewSlot) -> impl Future<Output = Result<Slot, StoreError>> + Send;

    /// Compare-and-swap on a single slot.
    fn conditional_update_slot(
        &self,
        id: SlotId,
        expected: Precondition,
        change: SlotChange,
    ) -> impl Future<Output = Result<ConditionalOutcome, StoreError>> + Send;

    /// Apply a window/notes edit. An edit that moves the window applies
    /// only while the slot is not reserved, checked atomically with the
    /// write; a reserved slot comes back as
    /// [`ConditionalOutcome::PreconditionFailed`].
    fn edit_slot(
        &self,
        id: SlotId,
        edit: SlotEdit,
    ) -> impl Future<Output = Result<ConditionalOutcome, StoreError>> + Send;

    /// Delete a slot unless it is reserved.
    fn delete_slot(&self, id: SlotId)
    -> impl Future<Output = Result<DeleteOutcome, StoreError>> + Send;

    /// Insert a reservation. An existing row with the same id yields
    /// [`StoreError::Duplicate`].
    fn create_reservation(
        &self,
        reservation: Reservation,
    ) -> impl Future<Output = Result<Reservation, StoreError>> + Send;

    fn get_reservation(
        &self,
        id: ReservationId,
    ) -> impl Future<Output = Result<Option<Reservation>, StoreError>> + Send;

    fn list_reservations(&self) -> impl Future<Output = Result<Vec<Reservation>, StoreError>> + Send;

    fn update_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> impl Future<Output = Result<Option<Reservation>, StoreError>> + Send;

    fn create_ticket(
        &self,
        ticket: NewTicket,
    ) -> impl Future<Output = Result<SupportTicket, StoreError>> + Send;

    fn list_tickets(&self) -> impl Future<Output = Result<Vec<SupportTicket>, StoreError>> + Send;

    fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> impl Future<Output = Result<Option<SupportTicket>, StoreError>> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(status: SlotStatus, rid: Option<ReservationId>, h: u32) -> Slot {
        Slot {
            id: SlotId::new(),
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 6, 10, h + 1, 0, 0).unwrap(),
            )
            .unwrap(),
            status,
            reservation_id: rid,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_uses_overlap() {
        let s = slot(SlotStatus::Available, None, 9);
        let f = SlotFilter {
            status: None,
            from: Some(Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2025, 6, 10, 9, 45, 0).unwrap()),
        };
        assert!(f.matches(&s));

        let after = SlotFilter {
            from: Some(Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap()),
            ..SlotFilter::default()
        };
        assert!(!after.matches(&s));
    }

    #[test]
    fn precondition_checks_reservation_when_given() {
        let rid = ReservationId::new();
        let s = slot(SlotStatus::Reserved, Some(rid), 9);
        assert!(Precondition::held_by(rid).holds(&s));
        assert!(!Precondition::held_by(ReservationId::new()).holds(&s));
        assert!(Precondition::status(SlotStatus::Reserved).holds(&s));
        assert!(!Precondition::status(SlotStatus::Available).holds(&s));
    }

    #[test]
    fn api_timeout_marks_outcome_unknown() {
        let err = StoreError::from(obdx_api::Error::Timeout { timeout_secs: 5 });
        assert!(err.outcome_unknown());
        let err = StoreError::from(obdx_api::Error::Rest {
            message: "bad filter".into(),
            code: Some("PGRST100".into()),
            status: 400,
        });
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(!err.write_may_have_applied());
    }

    #[test]
    fn undecodable_write_response_may_have_applied() {
        let err = StoreError::from(obdx_api::Error::Deserialization {
            message: "invalid type".into(),
            body: "[{}]".into(),
        });
        assert!(!err.outcome_unknown());
        assert!(err.write_may_have_applied());
        assert!(!StoreError::unavailable("down").write_may_have_applied());
    }
}
