// ── Reconciliation pass ──
//
// Finds slots and reservations that disagree with each other: bookings
// interrupted between their two writes, reservations orphaned by an
// administrator release, and (optionally) past slots still open. Repairs
// are conditional writes against the state that was read, and slots
// touched within the grace period are left alone because a booking may
// still be in flight on them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CancelledRule, PastSlotRule, SchedulerConfig};
use crate::error::CoreError;
use crate::model::{Reservation, ReservationId, ReservationStatus, Slot, SlotId, SlotStatus};
use crate::store::{ConditionalOutcome, Precondition, SlotChange, SlotFilter, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Reserved slot whose reservation does not exist.
    ReservedWithoutReservation {
        slot_id: SlotId,
        reservation_id: ReservationId,
    },
    /// Live reservation whose slot is gone or points elsewhere.
    ReservationWithoutSlot {
        reservation_id: ReservationId,
        slot_id: SlotId,
    },
    /// Stored slot row where status and reservation link disagree.
    InconsistentSlot {
        slot_id: SlotId,
        status: SlotStatus,
        reservation_id: Option<ReservationId>,
    },
    CancelledStillHoldingSlot {
        slot_id: SlotId,
        reservation_id: ReservationId,
    },
    PastAvailableSlot {
        slot_id: SlotId,
        start: DateTime<Utc>,
    },
}

impl Finding {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReservedWithoutReservation { .. } => "reserved_without_reservation",
            Self::ReservationWithoutSlot { .. } => "reservation_without_slot",
            Self::InconsistentSlot { .. } => "inconsistent_slot",
            Self::CancelledStillHoldingSlot { .. } => "cancelled_still_holding_slot",
            Self::PastAvailableSlot { .. } => "past_available_slot",
        }
    }

    pub fn slot_id(&self) -> SlotId {
        match self {
            Self::ReservedWithoutReservation { slot_id, .. }
            | Self::ReservationWithoutSlot { slot_id, .. }
            | Self::InconsistentSlot { slot_id, .. }
            | Self::CancelledStillHoldingSlot { slot_id, .. }
            | Self::PastAvailableSlot { slot_id, .. } => *slot_id,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedWithoutReservation {
                slot_id,
                reservation_id,
            } => write!(
                f,
                "slot {slot_id} is reserved for {reservation_id}, which does not exist"
            ),
            Self::ReservationWithoutSlot {
                reservation_id,
                slot_id,
            } => write!(
                f,
                "reservation {reservation_id} is not held by its slot {slot_id}"
            ),
            Self::InconsistentSlot {
                slot_id,
                status,
                reservation_id: Some(rid),
            } => write!(f, "slot {slot_id} is {status} but linked to {rid}"),
            Self::InconsistentSlot {
                slot_id,
                status,
                reservation_id: None,
            } => write!(f, "slot {slot_id} is {status} without a reservation link"),
            Self::CancelledStillHoldingSlot {
                slot_id,
                reservation_id,
            } => write!(
                f,
                "slot {slot_id} is still held by cancelled reservation {reservation_id}"
            ),
            Self::PastAvailableSlot { slot_id, start } => {
                write!(f, "slot {slot_id} started at {start} and is still open")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub findings: Vec<Finding>,
    /// Findings fixed by this pass.
    pub repaired: Vec<Finding>,
    /// Repairable findings left alone because the slot changed recently.
    pub deferred: usize,
    pub errors: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Slot repair a finding calls for, if any.
enum Repair {
    Release(ReservationId),
    Block,
}

pub(crate) async fn run<S: Store>(
    store: &S,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
    repair: bool,
) -> Result<ReconcileReport, CoreError> {
    let (slots, reservations) =
        try_join(store.read_slots(&SlotFilter::default()), store.list_reservations()).await?;

    let mut report = ReconcileReport::default();
    let mut candidates: Vec<(Finding, &Slot, Repair)> = Vec::new();
    let by_id: HashMap<ReservationId, &Reservation> =
        reservations.iter().map(|r| (r.id, r)).collect();
    let slots_by_id: HashMap<SlotId, &Slot> = slots.iter().map(|s| (s.id, s)).collect();

    for slot in &slots {
        if !slot.is_consistent() {
            report.findings.push(Finding::InconsistentSlot {
                slot_id: slot.id,
                status: slot.status,
                reservation_id: slot.reservation_id,
            });
            continue;
        }

        match (slot.status, slot.reservation_id) {
            (SlotStatus::Reserved, Some(rid)) => match by_id.get(&rid) {
                None => {
                    let finding = Finding::ReservedWithoutReservation {
                        slot_id: slot.id,
                        reservation_id: rid,
                    };
                    candidates.push((finding.clone(), slot, Repair::Release(rid)));
                    report.findings.push(finding);
                }
                Some(r) if r.status == ReservationStatus::Cancelled => {
                    let finding = Finding::CancelledStillHoldingSlot {
                        slot_id: slot.id,
                        reservation_id: rid,
                    };
                    if config.expiry.cancelled_reservations == CancelledRule::Release {
                        candidates.push((finding.clone(), slot, Repair::Release(rid)));
                    }
                    report.findings.push(finding);
                }
                Some(_) => {}
            },
            (SlotStatus::Available, _)
                if config.expiry.past_slots == PastSlotRule::Block
                    && slot.window.has_started(now) =>
            {
                let finding = Finding::PastAvailableSlot {
                    slot_id: slot.id,
                    start: slot.start(),
                };
                candidates.push((finding.clone(), slot, Repair::Block));
                report.findings.push(finding);
            }
            _ => {}
        }
    }

    for reservation in &reservations {
        if !reservation.status.holds_slot() {
            continue;
        }
        // Rows from before the slot link existed cannot be checked.
        let Some(slot_id) = reservation.slot_id else {
            continue;
        };
        let held = slots_by_id
            .get(&slot_id)
            .is_some_and(|s| s.is_held_by(reservation.id));
        if !held {
            report.findings.push(Finding::ReservationWithoutSlot {
                reservation_id: reservation.id,
                slot_id,
            });
        }
    }

    if repair {
        let grace = chrono::Duration::from_std(config.reconcile_grace)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        for (finding, slot, action) in candidates {
            if slot.updated_at + grace > now {
                debug!(slot_id = %slot.id, kind = finding.kind(), "within grace period, deferring");
                report.deferred += 1;
                continue;
            }
            match apply(store, slot, &action).await {
                Ok(true) => {
                    info!(slot_id = %slot.id, kind = finding.kind(), "repaired");
                    report.repaired.push(finding);
                }
                Ok(false) => {
                    debug!(slot_id = %slot.id, "slot changed since it was read, skipping");
                }
                Err(e) => {
                    warn!(slot_id = %slot.id, error = %e, "repair failed");
                    report.errors.push(format!("{finding}: {e}"));
                }
            }
        }
    }

    if !report.is_clean() {
        warn!(
            findings = report.findings.len(),
            repaired = report.repaired.len(),
            deferred = report.deferred,
            "reconciliation found inconsistencies"
        );
    }
    Ok(report)
}

/// `Ok(false)` when the slot no longer looks the way it was read.
async fn apply<S: Store>(store: &S, slot: &Slot, action: &Repair) -> Result<bool, CoreError> {
    let (expected, change) = match *action {
        Repair::Release(rid) => {
            // Rows that failed to decode are missing from the listing;
            // never release a slot whose reservation may still exist.
            if store.get_reservation(rid).await?.is_some_and(|r| r.status.holds_slot()) {
                return Ok(false);
            }
            (Precondition::held_by(rid), SlotChange::to(SlotStatus::Available))
        }
        Repair::Block => (
            Precondition::status(SlotStatus::Available),
            SlotChange::to(SlotStatus::Blocked),
        ),
    };
    let outcome = store
        .conditional_update_slot(slot.id, expected, change)
        .await?;
    Ok(matches!(outcome, ConditionalOutcome::Applied(_)))
}
