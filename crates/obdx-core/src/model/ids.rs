// ── Identity types ──
//
// Every stored record is keyed by a UUID. Each record kind gets its own
// newtype so a slot id can never be passed where a reservation id is due.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| CoreError::ValidationFailed {
                        field: $label.into(),
                        message: format!("'{s}' is not a valid id: {e}"),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of an appointment slot.
    SlotId,
    "slot_id"
);
uuid_id!(
    /// Identifier of a reservation.
    ReservationId,
    "reservation_id"
);
uuid_id!(
    /// Identifier of a support ticket.
    TicketId,
    "ticket_id"
);

impl ReservationId {
    /// The reservation id a booking submitted with `key` always lands on.
    ///
    /// Replays of the same key therefore hit the same row, and the store's
    /// primary-key constraint rejects a second insert.
    pub fn for_idempotency_key(key: &IdempotencyKey) -> Self {
        let name = format!("urn:obdx:booking:{}", key.as_str());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()))
    }
}

// ── IdempotencyKey ──────────────────────────────────────────────────

const MAX_KEY_LEN: usize = 128;

/// Client-chosen token identifying one logical booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::ValidationFailed {
                field: "idempotency_key".into(),
                message: "must not be empty".into(),
            });
        }
        if trimmed.len() > MAX_KEY_LEN {
            return Err(CoreError::ValidationFailed {
                field: "idempotency_key".into(),
                message: format!("must be at most {MAX_KEY_LEN} characters"),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// A random key, for callers that book exactly once per invocation.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<IdempotencyKey> for String {
    fn from(k: IdempotencyKey) -> Self {
        k.0
    }
}
