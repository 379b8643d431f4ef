// ── In-memory store ──
//
// `DashMap`-backed accessor used by tests and local dry runs. Conditional
// writes run under the entry's shard lock, so concurrent bookings see the
// same first-writer-wins behavior as the hosted store. Faults can be
// scripted per operation to exercise the failure paths.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{
    ConditionalOutcome, DeleteOutcome, Precondition, SlotChange, SlotEdit, SlotFilter, Store,
    StoreError,
};
use crate::model::{
    NewSlot, NewTicket, Reservation, ReservationId, ReservationStatus, Slot, SlotId, SlotStatus,
    SupportTicket, TicketId, TicketStatus,
};

/// Accessor operations that can carry a scripted fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ReadSlots,
    GetSlot,
    InsertSlot,
    ConditionalUpdateSlot,
    EditSlot,
    DeleteSlot,
    CreateReservation,
    GetReservation,
    ListReservations,
    UpdateReservationStatus,
    CreateTicket,
    ListTickets,
    UpdateTicketStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail without touching state.
    Unavailable,
    /// Apply the operation, then report a timeout to the caller.
    AppliedThenTimeout,
}

#[derive(Default)]
pub struct MemoryStore {
    slots: DashMap<SlotId, Slot>,
    reservations: DashMap<ReservationId, Reservation>,
    tickets: DashMap<TicketId, SupportTicket>,
    faults: Mutex<HashMap<StoreOp, VecDeque<Option<Fault>>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Fault scripting ──────────────────────────────────────────────

    /// Fail the next call of `op`.
    pub fn inject(&self, op: StoreOp, fault: Fault) {
        self.inject_after(op, 0, fault);
    }

    /// Let `passes` calls of `op` through, then fail the next one.
    pub fn inject_after(&self, op: StoreOp, passes: usize, fault: Fault) {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = faults.entry(op).or_default();
        queue.extend(std::iter::repeat_n(None, passes));
        queue.push_back(Some(fault));
    }

    /// While offline every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// `Ok(true)` when the caller must apply its effect and then time out.
    fn fault(&self, op: StoreOp) -> Result<bool, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        let scripted = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .flatten();
        match scripted {
            None => Ok(false),
            Some(Fault::Unavailable) => Err(StoreError::unavailable(format!(
                "injected fault on {op:?}"
            ))),
            Some(Fault::AppliedThenTimeout) => Ok(true),
        }
    }

    fn finish<T>(timeout_after: bool, op: StoreOp, value: T) -> Result<T, StoreError> {
        if timeout_after {
            Err(StoreError::Unavailable {
                reason: format!("injected timeout on {op:?}"),
                timed_out: true,
            })
        } else {
            Ok(value)
        }
    }

    // ── Direct access (fixtures and assertions) ──────────────────────

    /// Put a slot in place as-is, bypassing every rule.
    pub fn seed_slot(&self, slot: Slot) {
        self.slots.insert(slot.id, slot);
    }

    /// Put a reservation in place as-is, bypassing every rule.
    pub fn seed_reservation(&self, reservation: Reservation) {
        self.reservations.insert(reservation.id, reservation);
    }

    pub fn slot(&self, id: SlotId) -> Option<Slot> {
        self.slots.get(&id).map(|r| r.value().clone())
    }

    pub fn all_slots(&self) -> Vec<Slot> {
        self.slots.iter().map(|r| r.value().clone()).collect()
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }
}

impl Store for MemoryStore {
    async fn read_slots(&self, filter: &SlotFilter) -> Result<Vec<Slot>, StoreError> {
        let timeout_after = self.fault(StoreOp::ReadSlots)?;
        let mut slots: Vec<Slot> = self
            .slots
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        slots.sort_by_key(|s| (s.start(), s.id));
        Self::finish(timeout_after, StoreOp::ReadSlots, slots)
    }

    async fn get_slot(&self, id: SlotId) -> Result<Option<Slot>, StoreError> {
        let timeout_after = self.fault(StoreOp::GetSlot)?;
        Self::finish(timeout_after, StoreOp::GetSlot, self.slot(id))
    }

    async fn insert_slot(&self, slot: NewSlot) -> Result<Slot, StoreError> {
        let timeout_after = self.fault(StoreOp::InsertSlot)?;
        if slot.status == SlotStatus::Reserved {
            return Err(StoreError::Rejected {
                reason: "slots cannot be inserted reserved".into(),
            });
        }
        let created = Slot {
            id: SlotId::new(),
            window: slot.window,
            status: slot.status,
            reservation_id: None,
            notes: slot.notes,
            updated_at: Utc::now(),
        };
        self.slots.insert(created.id, created.clone());
        Self::finish(timeout_after, StoreOp::InsertSlot, created)
    }

    async fn conditional_update_slot(
        &self,
        id: SlotId,
        expected: Precondition,
        change: SlotChange,
    ) -> Result<ConditionalOutcome, StoreError> {
        let timeout_after = self.fault(StoreOp::ConditionalUpdateSlot)?;
        let outcome = match self.slots.get_mut(&id) {
            None => ConditionalOutcome::NotFound,
            Some(mut entry) => {
                if expected.holds(&entry) {
                    entry.status = change.status;
                    entry.reservation_id = change.reservation_id;
                    entry.updated_at = Utc::now();
                    ConditionalOutcome::Applied(entry.clone())
                } else {
                    ConditionalOutcome::PreconditionFailed(entry.clone())
                }
            }
        };
        Self::finish(timeout_after, StoreOp::ConditionalUpdateSlot, outcome)
    }

    async fn edit_slot(
        &self,
        id: SlotId,
        edit: SlotEdit,
    ) -> Result<ConditionalOutcome, StoreError> {
        let timeout_after = self.fault(StoreOp::EditSlot)?;
        let outcome = match self.slots.get_mut(&id) {
            None => ConditionalOutcome::NotFound,
            Some(entry) if edit.window.is_some() && entry.status == SlotStatus::Reserved => {
                ConditionalOutcome::PreconditionFailed(entry.clone())
            }
            Some(mut entry) => {
                if let Some(window) = edit.window {
                    entry.window = window;
                }
                if let Some(notes) = edit.notes {
                    entry.notes = notes;
                }
                entry.updated_at = Utc::now();
                ConditionalOutcome::Applied(entry.clone())
            }
        };
        Self::finish(timeout_after, StoreOp::EditSlot, outcome)
    }

    async fn delete_slot(&self, id: SlotId) -> Result<DeleteOutcome, StoreError> {
        let timeout_after = self.fault(StoreOp::DeleteSlot)?;
        let outcome = match self
            .slots
            .remove_if(&id, |_, s| s.status != SlotStatus::Reserved)
        {
            Some((_, slot)) => DeleteOutcome::Deleted(slot),
            None => match self.slot(id) {
                Some(slot) => DeleteOutcome::Refused(slot),
                None => DeleteOutcome::NotFound,
            },
        };
        Self::finish(timeout_after, StoreOp::DeleteSlot, outcome)
    }

    async fn create_reservation(
        &self,
        reservation: Reservation,
    ) -> Result<Reservation, StoreError> {
        let timeout_after = self.fault(StoreOp::CreateReservation)?;
        match self.reservations.entry(reservation.id) {
            Entry::Occupied(_) => {
                return Err(StoreError::Duplicate {
                    entity: "reservation",
                    id: reservation.id.to_string(),
                });
            }
            Entry::Vacant(v) => {
                let mut stored = reservation;
                if stored.created_at.is_none() {
                    stored.created_at = Some(Utc::now());
                }
                v.insert(stored.clone());
                Self::finish(timeout_after, StoreOp::CreateReservation, stored)
            }
        }
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError> {
        let timeout_after = self.fault(StoreOp::GetReservation)?;
        let found = self.reservations.get(&id).map(|r| r.value().clone());
        Self::finish(timeout_after, StoreOp::GetReservation, found)
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let timeout_after = self.fault(StoreOp::ListReservations)?;
        let mut all: Vec<Reservation> = self
            .reservations
            .iter()
            .map(|r| r.value().clone())
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Self::finish(timeout_after, StoreOp::ListReservations, all)
    }

    async fn update_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<Option<Reservation>, StoreError> {
        let timeout_after = self.fault(StoreOp::UpdateReservationStatus)?;
        let updated = self.reservations.get_mut(&id).map(|mut entry| {
            entry.status = status;
            entry.clone()
        });
        Self::finish(timeout_after, StoreOp::UpdateReservationStatus, updated)
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<SupportTicket, StoreError> {
        let timeout_after = self.fault(StoreOp::CreateTicket)?;
        let created = SupportTicket {
            id: TicketId::new(),
            first_name: ticket.first_name,
            last_name: ticket.last_name,
            email: ticket.email,
            phone: ticket.phone,
            subject: ticket.subject,
            description: ticket.description,
            attachment_url: ticket.attachment_url,
            status: TicketStatus::New,
            created_at: Some(Utc::now()),
        };
        self.tickets.insert(created.id, created.clone());
        Self::finish(timeout_after, StoreOp::CreateTicket, created)
    }

    async fn list_tickets(&self) -> Result<Vec<SupportTicket>, StoreError> {
        let timeout_after = self.fault(StoreOp::ListTickets)?;
        let mut all: Vec<SupportTicket> =
            self.tickets.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Self::finish(timeout_after, StoreOp::ListTickets, all)
    }

    async fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>, StoreError> {
        let timeout_after = self.fault(StoreOp::UpdateTicketStatus)?;
        let updated = self.tickets.get_mut(&id).map(|mut entry| {
            entry.status = status;
            entry.clone()
        });
        Self::finish(timeout_after, StoreOp::UpdateTicketStatus, updated)
    }
}
