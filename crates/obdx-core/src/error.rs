// ── Core error types ──
//
// User-facing errors from obdx-core. Consumers never see HTTP status
// codes or row decoding failures directly; `From<StoreError>` folds
// accessor failures into the variants below.

use thiserror::Error;

use crate::model::{ReservationId, SlotId, SlotStatus};
use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Booking outcomes ─────────────────────────────────────────────
    #[error("Invalid {field}: {message}")]
    ValidationFailed { field: String, message: String },

    /// The slot was taken, blocked or deleted before this booking reached it.
    #[error("Slot {slot_id} is no longer available{}", describe_current(.current))]
    SlotNoLongerAvailable {
        slot_id: SlotId,
        current: Option<SlotStatus>,
    },

    /// Nothing durable was written; retrying with the same key is safe.
    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// The slot is reserved but its reservation could neither be confirmed
    /// nor rolled back. Retrying with the same key or the reconciliation
    /// pass settles it.
    #[error("Booking partially applied: slot {slot_id} is held for {reservation_id} ({reason})")]
    PartialFailure {
        slot_id: SlotId,
        reservation_id: ReservationId,
        reason: String,
    },

    // ── Calendar ─────────────────────────────────────────────────────
    #[error("Calendar unavailable: {reason}")]
    CalendarUnavailable { reason: String },

    // ── Administrative operations ────────────────────────────────────
    #[error("Slot {slot_id} cannot go from {from} to {to}")]
    InvalidTransition {
        slot_id: SlotId,
        from: SlotStatus,
        to: SlotStatus,
    },

    #[error("Slot {slot_id} is reserved; release it first")]
    SlotReserved {
        slot_id: SlotId,
        reservation_id: Option<ReservationId>,
    },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Request rejected by store: {message}")]
    Rejected { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_current(current: &Option<SlotStatus>) -> String {
    match current {
        Some(status) => format!(" (now {status})"),
        None => " (deleted)".into(),
    }
}

impl CoreError {
    /// Returns `true` when the same request may succeed if resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::CalendarUnavailable { .. }
        )
    }

    pub(crate) fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }
}

// ── Conversion from store-layer errors ───────────────────────────────

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { reason, .. } => CoreError::StoreUnavailable { reason },
            StoreError::Unauthorized { message } => CoreError::AuthenticationFailed { message },
            StoreError::Rejected { reason } => CoreError::Rejected { message: reason },
            StoreError::Duplicate { entity, id } => CoreError::Conflict {
                message: format!("{entity} {id} already exists"),
            },
            StoreError::NotFound { entity, id } => CoreError::NotFound {
                entity_type: entity.into(),
                identifier: id,
            },
            StoreError::Corrupt { entity, id, reason } => {
                CoreError::Internal(format!("corrupt {entity} row {id}: {reason}"))
            }
        }
    }
}
