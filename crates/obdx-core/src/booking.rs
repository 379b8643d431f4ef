// ── Booking transaction ──
//
// Slot first, reservation second. The slot's conditional write is the
// only mutual exclusion between concurrent customers: whoever flips it
// from available to reserved owns it. The reservation id is derived from
// the idempotency key, so every retry of one request targets the same
// slot link and the same reservation row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::model::{
    IdempotencyKey, Price, Reservation, ReservationDetails, ReservationId, ReservationStatus, Slot,
    SlotId, SlotStatus, TimeWindow,
};
use crate::store::{ConditionalOutcome, Precondition, SlotChange, Store, StoreError};

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub slot_id: SlotId,
    pub details: ReservationDetails,
    pub idempotency_key: IdempotencyKey,
}

/// What the customer gets back once the booking is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub reservation_id: ReservationId,
    pub slot_id: SlotId,
    pub window: TimeWindow,
    pub price: Price,
    /// Set when this request had already been booked under the same key.
    pub replayed: bool,
}

impl BookingConfirmation {
    fn from_reservation(reservation: &Reservation, slot_id: SlotId, replayed: bool) -> Self {
        Self {
            reservation_id: reservation.id,
            slot_id,
            window: reservation.window,
            price: reservation.details.price,
            replayed,
        }
    }
}

pub(crate) async fn book<S: Store>(
    store: &S,
    request: BookingRequest,
    now: DateTime<Utc>,
) -> Result<BookingConfirmation, CoreError> {
    let BookingRequest {
        slot_id,
        details,
        idempotency_key,
    } = request;
    details.validate(now)?;

    let reservation_id = ReservationId::for_idempotency_key(&idempotency_key);
    debug!(%slot_id, %reservation_id, key = idempotency_key.as_str(), "booking");

    if let Some(confirmation) = replay(store, slot_id, reservation_id).await? {
        info!(%slot_id, %reservation_id, "booking replayed");
        return Ok(confirmation);
    }

    let slot = claim_slot(store, slot_id, reservation_id).await?;

    let reservation = Reservation {
        id: reservation_id,
        details,
        status: ReservationStatus::New,
        slot_id: Some(slot_id),
        window: slot.window,
        idempotency_key: Some(idempotency_key.as_str().to_owned()),
        created_at: None,
    };

    // The claim is only undone once the store confirms the row is absent.
    // Any doubt leaves the slot held for a same-key retry or reconcile.
    let (stored, replayed) = match store.create_reservation(reservation).await {
        Ok(stored) => (stored, false),
        Err(StoreError::Duplicate { .. }) => {
            debug!(%reservation_id, "reservation row already written by an earlier attempt");
            match store.get_reservation(reservation_id).await {
                Ok(Some(stored)) => (stored, true),
                Ok(None) => {
                    return Err(left_claimed(
                        slot_id,
                        reservation_id,
                        "store reported a duplicate reservation it cannot return".into(),
                    ));
                }
                Err(reread) => {
                    return Err(left_claimed(
                        slot_id,
                        reservation_id,
                        format!("duplicate reservation could not be re-read: {reread}"),
                    ));
                }
            }
        }
        Err(e) if e.write_may_have_applied() => {
            warn!(%reservation_id, error = %e, "reservation write outcome unknown, re-reading");
            match store.get_reservation(reservation_id).await {
                Ok(Some(stored)) => (stored, false),
                Ok(None) => return Err(compensate(store, slot_id, reservation_id, &e).await),
                Err(reread) => {
                    return Err(left_claimed(
                        slot_id,
                        reservation_id,
                        format!("{e}; re-read failed: {reread}"),
                    ));
                }
            }
        }
        Err(e) => return Err(compensate(store, slot_id, reservation_id, &e).await),
    };

    info!(
        %slot_id,
        %reservation_id,
        start = %stored.window.start(),
        price = %stored.details.price,
        "booking confirmed"
    );
    Ok(BookingConfirmation::from_reservation(&stored, slot_id, replayed))
}

/// A finished earlier attempt with the same key: the reservation exists
/// and the slot still links back to it.
async fn replay<S: Store>(
    store: &S,
    slot_id: SlotId,
    reservation_id: ReservationId,
) -> Result<Option<BookingConfirmation>, CoreError> {
    let Some(existing) = store.get_reservation(reservation_id).await? else {
        return Ok(None);
    };

    if existing.slot_id.is_some_and(|s| s != slot_id) {
        return Err(CoreError::ValidationFailed {
            field: "idempotency_key".into(),
            message: "already used for a booking on another slot".into(),
        });
    }
    if existing.status == ReservationStatus::Cancelled {
        return Err(CoreError::Conflict {
            message: format!(
                "reservation {reservation_id} was cancelled; book again with a new idempotency key"
            ),
        });
    }

    match store.get_slot(slot_id).await? {
        Some(slot) if slot.is_held_by(reservation_id) => Ok(Some(
            BookingConfirmation::from_reservation(&existing, slot_id, true),
        )),
        // Released since; the claim below re-attaches it if still free.
        _ => Ok(None),
    }
}

/// Flip the slot from available to reserved for `reservation_id`.
async fn claim_slot<S: Store>(
    store: &S,
    slot_id: SlotId,
    reservation_id: ReservationId,
) -> Result<Slot, CoreError> {
    let outcome = store
        .conditional_update_slot(
            slot_id,
            Precondition::status(SlotStatus::Available),
            SlotChange::reserve(reservation_id),
        )
        .await;

    match outcome {
        Ok(ConditionalOutcome::Applied(slot)) => Ok(slot),
        Ok(ConditionalOutcome::PreconditionFailed(slot)) => claimed_or_taken(slot, reservation_id),
        Ok(ConditionalOutcome::NotFound) => Err(CoreError::SlotNoLongerAvailable {
            slot_id,
            current: None,
        }),
        Err(e @ StoreError::Unavailable { .. }) => {
            warn!(%slot_id, error = %e, "slot claim outcome unknown, re-reading");
            match store.get_slot(slot_id).await {
                Ok(Some(slot)) if slot.is_available() => {
                    Err(CoreError::StoreUnavailable {
                        reason: e.to_string(),
                    })
                }
                Ok(Some(slot)) => claimed_or_taken(slot, reservation_id),
                Ok(None) => Err(CoreError::SlotNoLongerAvailable {
                    slot_id,
                    current: None,
                }),
                Err(reread) => Err(CoreError::StoreUnavailable {
                    reason: format!("{e}; re-read failed: {reread}"),
                }),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn claimed_or_taken(slot: Slot, reservation_id: ReservationId) -> Result<Slot, CoreError> {
    if slot.is_held_by(reservation_id) {
        debug!(slot_id = %slot.id, %reservation_id, "slot already claimed by this booking");
        return Ok(slot);
    }
    warn!(slot_id = %slot.id, current = %slot.status, "slot lost to another booking or an administrator");
    Err(CoreError::SlotNoLongerAvailable {
        slot_id: slot.id,
        current: Some(slot.status),
    })
}

/// The slot stays claimed while the reservation row is in doubt.
fn left_claimed(slot_id: SlotId, reservation_id: ReservationId, reason: String) -> CoreError {
    error!(%slot_id, %reservation_id, %reason, "slot left reserved, reservation unconfirmed");
    CoreError::PartialFailure {
        slot_id,
        reservation_id,
        reason,
    }
}

/// Undo the slot claim after the reservation was confirmed not written.
async fn compensate<S: Store>(
    store: &S,
    slot_id: SlotId,
    reservation_id: ReservationId,
    cause: &StoreError,
) -> CoreError {
    warn!(%slot_id, %reservation_id, error = %cause, "reservation write failed, releasing slot");

    let release = store
        .conditional_update_slot(
            slot_id,
            Precondition::held_by(reservation_id),
            SlotChange::to(SlotStatus::Available),
        )
        .await;

    match release {
        Ok(_) => CoreError::StoreUnavailable {
            reason: cause.to_string(),
        },
        Err(release_err) => {
            error!(
                %slot_id,
                %reservation_id,
                error = %cause,
                release_error = %release_err,
                "slot left reserved without a reservation"
            );
            CoreError::PartialFailure {
                slot_id,
                reservation_id,
                reason: format!("{cause}; release failed: {release_err}"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::reservation::tests::details;
    use crate::store::{Fault, MemoryStore, StoreOp};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn open_slot(store: &MemoryStore) -> SlotId {
        let slot = Slot {
            id: SlotId::new(),
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap(),
            )
            .unwrap(),
            status: SlotStatus::Available,
            reservation_id: None,
            notes: None,
            updated_at: now(),
        };
        let id = slot.id;
        store.seed_slot(slot);
        id
    }

    fn request(slot_id: SlotId, key: &str) -> BookingRequest {
        BookingRequest {
            slot_id,
            details: details(),
            idempotency_key: IdempotencyKey::new(key).unwrap(),
        }
    }

    #[tokio::test]
    async fn books_available_slot() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);

        let confirmation = book(&store, request(slot_id, "k1"), now()).await.unwrap();

        assert!(!confirmation.replayed);
        assert_eq!(confirmation.price, Price::from_euros(99));
        let slot = store.slot(slot_id).unwrap();
        assert!(slot.is_held_by(confirmation.reservation_id));
        let stored = store
            .get_reservation(confirmation.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slot_id, Some(slot_id));
        assert_eq!(stored.window, slot.window);
        assert_eq!(stored.status, ReservationStatus::New);
    }

    #[tokio::test]
    async fn invalid_details_write_nothing() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        let mut req = request(slot_id, "k1");
        req.details.contact.email = "nope".into();

        let err = book(&store, req, now()).await.unwrap_err();

        assert!(matches!(err, CoreError::ValidationFailed { .. }));
        assert!(store.slot(slot_id).unwrap().is_available());
        assert_eq!(store.reservation_count(), 0);
    }

    #[tokio::test]
    async fn same_key_replays() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);

        let first = book(&store, request(slot_id, "k1"), now()).await.unwrap();
        let second = book(&store, request(slot_id, "k1"), now()).await.unwrap();

        assert!(second.replayed);
        assert_eq!(first.reservation_id, second.reservation_id);
        assert_eq!(store.reservation_count(), 1);
    }

    #[tokio::test]
    async fn key_reused_on_other_slot_rejected() {
        let store = MemoryStore::new();
        let a = open_slot(&store);
        let b = open_slot(&store);
        book(&store, request(a, "k1"), now()).await.unwrap();

        let err = book(&store, request(b, "k1"), now()).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { ref field, .. } if field == "idempotency_key"));
        assert!(store.slot(b).unwrap().is_available());
    }

    #[tokio::test]
    async fn taken_slot_reports_current_status() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        book(&store, request(slot_id, "k1"), now()).await.unwrap();

        let err = book(&store, request(slot_id, "k2"), now()).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::SlotNoLongerAvailable {
                current: Some(SlotStatus::Reserved),
                ..
            }
        ));
        assert_eq!(store.reservation_count(), 1);
    }

    #[tokio::test]
    async fn missing_slot_is_no_longer_available() {
        let store = MemoryStore::new();
        let err = book(&store, request(SlotId::new(), "k1"), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SlotNoLongerAvailable { current: None, .. }
        ));
    }

    #[tokio::test]
    async fn claim_timeout_that_applied_still_books() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        store.inject(StoreOp::ConditionalUpdateSlot, Fault::AppliedThenTimeout);

        let confirmation = book(&store, request(slot_id, "k1"), now()).await.unwrap();

        assert!(store.slot(slot_id).unwrap().is_held_by(confirmation.reservation_id));
        assert_eq!(store.reservation_count(), 1);
    }

    #[tokio::test]
    async fn claim_failure_before_write_is_retryable() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        store.inject(StoreOp::ConditionalUpdateSlot, Fault::Unavailable);

        let err = book(&store, request(slot_id, "k1"), now()).await.unwrap_err();
        assert!(matches!(err, CoreError::StoreUnavailable { .. }));
        assert!(store.slot(slot_id).unwrap().is_available());

        let retry = book(&store, request(slot_id, "k1"), now()).await.unwrap();
        assert!(!retry.replayed);
    }

    #[tokio::test]
    async fn reservation_failure_releases_slot() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        store.inject(StoreOp::CreateReservation, Fault::Unavailable);

        let err = book(&store, request(slot_id, "k1"), now()).await.unwrap_err();

        assert!(matches!(err, CoreError::StoreUnavailable { .. }));
        let slot = store.slot(slot_id).unwrap();
        assert!(slot.is_available());
        assert!(slot.reservation_id.is_none());
        assert_eq!(store.reservation_count(), 0);
    }

    #[tokio::test]
    async fn reservation_timeout_that_applied_is_success() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        store.inject(StoreOp::CreateReservation, Fault::AppliedThenTimeout);

        let confirmation = book(&store, request(slot_id, "k1"), now()).await.unwrap();
        assert!(store.slot(slot_id).unwrap().is_held_by(confirmation.reservation_id));
        assert_eq!(store.reservation_count(), 1);
    }

    #[tokio::test]
    async fn unconfirmed_reservation_keeps_slot_claimed() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        store.inject(StoreOp::CreateReservation, Fault::AppliedThenTimeout);
        // first read is the replay check, second is the re-read after the timeout
        store.inject_after(StoreOp::GetReservation, 1, Fault::Unavailable);

        let err = book(&store, request(slot_id, "k1"), now()).await.unwrap_err();

        let CoreError::PartialFailure { reservation_id, .. } = err else {
            panic!("expected partial failure, got {err:?}");
        };
        assert!(store.slot(slot_id).unwrap().is_held_by(reservation_id));
        assert_eq!(store.reservation_count(), 1);

        // the same key settles it
        let retry = book(&store, request(slot_id, "k1"), now()).await.unwrap();
        assert!(retry.replayed);
        assert_eq!(retry.reservation_id, reservation_id);
        assert_eq!(store.reservation_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_that_cannot_be_reread_keeps_slot_claimed() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        let key = IdempotencyKey::new("k1").unwrap();
        let rid = ReservationId::for_idempotency_key(&key);
        // an earlier attempt wrote the row, then lost the slot link
        store.seed_reservation(Reservation {
            id: rid,
            details: details(),
            status: ReservationStatus::New,
            slot_id: Some(slot_id),
            window: store.slot(slot_id).unwrap().window,
            idempotency_key: Some("k1".into()),
            created_at: Some(now()),
        });
        // replay check passes, the re-read after the duplicate fails
        store.inject_after(StoreOp::GetReservation, 1, Fault::Unavailable);

        let err = book(&store, request(slot_id, "k1"), now()).await.unwrap_err();

        assert!(matches!(err, CoreError::PartialFailure { .. }));
        assert!(store.slot(slot_id).unwrap().is_held_by(rid));
    }

    #[tokio::test]
    async fn failed_release_is_partial_failure() {
        let store = MemoryStore::new();
        let slot_id = open_slot(&store);
        store.inject(StoreOp::CreateReservation, Fault::Unavailable);
        // first call claims, second is the release
        store.inject_after(StoreOp::ConditionalUpdateSlot, 1, Fault::Unavailable);

        let err = book(&store, request(slot_id, "k1"), now()).await.unwrap_err();

        let CoreError::PartialFailure { reservation_id, .. } = err else {
            panic!("expected partial failure, got {err:?}");
        };
        assert!(store.slot(slot_id).unwrap().is_held_by(reservation_id));
        assert_eq!(store.reservation_count(), 0);
    }
}
