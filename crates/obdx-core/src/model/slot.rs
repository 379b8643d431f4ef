// ── Slot domain types ──
//
// A slot is a bookable appointment window. Its lifecycle is the
// three-state machine below; `reservation_id` is set exactly when the
// slot is reserved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ids::{ReservationId, SlotId};
use crate::error::CoreError;

// ── TimeWindow ──────────────────────────────────────────────────────

/// A half-open UTC interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = CoreError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if start >= end {
            return Err(CoreError::ValidationFailed {
                field: "end".into(),
                message: format!("slot end ({end}) must be after its start ({start})"),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start <= now
    }
}

// ── SlotStatus ──────────────────────────────────────────────────────

/// Slot lifecycle state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SlotStatus {
    Available,
    Reserved,
    Blocked,
}

impl SlotStatus {
    /// Whether the state machine permits `self -> to`.
    ///
    /// `available -> reserved` belongs to the booking transaction; every
    /// other edge is administrative. `reserved -> blocked` must go through
    /// `available` first, and same-state writes are not transitions.
    pub fn can_transition_to(self, to: SlotStatus) -> bool {
        matches!(
            (self, to),
            (Self::Available, Self::Reserved | Self::Blocked)
                | (Self::Blocked | Self::Reserved, Self::Available)
        )
    }

    /// Column value in the hosted store.
    pub fn wire(self) -> &'static str {
        match self {
            Self::Available => "disponible",
            Self::Reserved => "reserve",
            Self::Blocked => "bloque",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "disponible" | "available" => Some(Self::Available),
            "reserve" | "réservé" | "reserved" => Some(Self::Reserved),
            "bloque" | "bloqué" | "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

// ── Slot ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub status: SlotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn start(&self) -> DateTime<Utc> {
        self.window.start()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.window.end()
    }

    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }

    /// `reserved` iff a reservation is attached.
    pub fn is_consistent(&self) -> bool {
        (self.status == SlotStatus::Reserved) == self.reservation_id.is_some()
    }

    /// `true` when this slot is reserved for exactly `reservation`.
    pub fn is_held_by(&self, reservation: ReservationId) -> bool {
        self.status == SlotStatus::Reserved && self.reservation_id == Some(reservation)
    }

    /// Copy with administrator-only fields removed.
    pub fn redacted(&self) -> Slot {
        Slot {
            reservation_id: None,
            notes: None,
            ..self.clone()
        }
    }
}

/// Payload for creating a slot. Only `available` and `blocked` are valid
/// initial states; reservations are attached by booking, never at creation.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub window: TimeWindow,
    pub status: SlotStatus,
    pub notes: Option<String>,
}

impl NewSlot {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.status == SlotStatus::Reserved {
            return Err(CoreError::ValidationFailed {
                field: "status".into(),
                message: "a slot can only be created available or blocked".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use strum::IntoEnumIterator;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap()
    }

    #[test]
    fn window_requires_start_before_end() {
        assert!(TimeWindow::new(at(9), at(10)).is_ok());
        assert!(TimeWindow::new(at(10), at(10)).is_err());
        assert!(TimeWindow::new(at(11), at(10)).is_err());
    }

    #[test]
    fn window_deserialization_enforces_order() {
        let bad = r#"{"start":"2025-06-10T10:00:00Z","end":"2025-06-10T09:00:00Z"}"#;
        assert!(serde_json::from_str::<TimeWindow>(bad).is_err());
    }

    #[test]
    fn transition_table() {
        use SlotStatus::{Available, Blocked, Reserved};

        let legal = [
            (Available, Reserved),
            (Available, Blocked),
            (Blocked, Available),
            (Reserved, Available),
        ];
        for from in SlotStatus::iter() {
            for to in SlotStatus::iter() {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn wire_vocabulary() {
        assert_eq!(SlotStatus::from_wire("disponible"), Some(SlotStatus::Available));
        assert_eq!(SlotStatus::from_wire("reserve"), Some(SlotStatus::Reserved));
        assert_eq!(SlotStatus::from_wire("Bloqué"), Some(SlotStatus::Blocked));
        assert_eq!(SlotStatus::from_wire("gone"), None);
        assert_eq!("BLOCKED".parse::<SlotStatus>().unwrap(), SlotStatus::Blocked);
    }

    #[test]
    fn redaction_strips_admin_fields() {
        let slot = Slot {
            id: SlotId::new(),
            window: TimeWindow::new(at(9), at(10)).unwrap(),
            status: SlotStatus::Reserved,
            reservation_id: Some(ReservationId::new()),
            notes: Some("garage code 1234".into()),
            updated_at: at(8),
        };
        let public = slot.redacted();
        assert!(public.reservation_id.is_none());
        assert!(public.notes.is_none());
        assert_eq!(public.window, slot.window);
    }

    #[test]
    fn creating_reserved_slot_rejected() {
        let new = NewSlot {
            window: TimeWindow::new(at(9), at(10)).unwrap(),
            status: SlotStatus::Reserved,
            notes: None,
        };
        assert!(new.validate().is_err());
    }
}
