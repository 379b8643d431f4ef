// ── Reservation domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ids::{ReservationId, SlotId};
use super::slot::TimeWindow;
use crate::error::CoreError;

// ── Price ───────────────────────────────────────────────────────────

/// Amount in euro cents. Rendered as `"99.00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(u32);

impl Price {
    pub const fn from_cents(cents: u32) -> Self {
        Self(cents)
    }

    pub const fn from_euros(euros: u32) -> Self {
        Self(euros * 100)
    }

    pub fn cents(self) -> u32 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    /// Accepts `99`, `99.5`, `99.50` and the French `99,50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::ValidationFailed {
            field: "price".into(),
            message: format!("'{s}' is not a valid amount"),
        };

        let normalized = s.trim().replace(',', ".");
        let (whole, frac) = normalized
            .split_once('.')
            .unwrap_or((normalized.as_str(), ""));
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || frac.len() > 2 || !digits(whole) || !digits(frac) {
            return Err(invalid());
        }
        let euros: u32 = whole.parse().map_err(|_| invalid())?;
        let cents: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        euros
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Price {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Price> for String {
    fn from(p: Price) -> Self {
        p.to_string()
    }
}

// ── ReservationStatus ───────────────────────────────────────────────

/// Reservation lifecycle.
///
/// Older rows used several spellings for the first state; all of them
/// read as [`ReservationStatus::New`].
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
pub enum ReservationStatus {
    New,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn wire(self) -> &'static str {
        match self {
            Self::New => "nouvelle",
            Self::Confirmed => "confirme",
            Self::Completed => "termine",
            Self::Cancelled => "annule",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nouvelle" | "nouveau" | "en_attente" | "pending" | "new" => Some(Self::New),
            "confirme" | "confirmé" | "confirmee" | "confirmed" => Some(Self::Confirmed),
            "termine" | "terminé" | "completed" => Some(Self::Completed),
            "annule" | "annulé" | "annulee" | "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// A reservation that still needs its slot.
    pub fn holds_slot(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

// ── Reservation payload ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Where the intervention takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub vin: Option<String>,
}

pub const DEFAULT_SERVICE: &str = "essentiel";
const OLDEST_VEHICLE_YEAR: i32 = 1950;
const VIN_LEN: usize = 17;

/// Everything the customer submits with a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub contact: Contact,
    pub address: Address,
    pub vehicle: Vehicle,
    pub service: String,
    pub price: Price,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReservationDetails {
    /// Field-level validation. Reports the first offending field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), CoreError> {
        let required = [
            ("first_name", &self.contact.first_name),
            ("last_name", &self.contact.last_name),
            ("email", &self.contact.email),
            ("phone", &self.contact.phone),
            ("street", &self.address.street),
            ("city", &self.address.city),
            ("postal_code", &self.address.postal_code),
            ("vehicle_make", &self.vehicle.make),
            ("vehicle_model", &self.vehicle.model),
            ("service", &self.service),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(field, "is required"));
            }
        }

        if !looks_like_email(&self.contact.email) {
            return Err(invalid("email", "is not a valid email address"));
        }

        let digits = self
            .contact
            .phone
            .chars()
            .filter(char::is_ascii_digit)
            .count();
        if digits < 6 {
            return Err(invalid("phone", "must contain at least 6 digits"));
        }

        if let Some(year) = self.vehicle.year {
            let latest = now.year() + 1;
            if !(OLDEST_VEHICLE_YEAR..=latest).contains(&year) {
                return Err(invalid(
                    "vehicle_year",
                    &format!("must be between {OLDEST_VEHICLE_YEAR} and {latest}"),
                ));
            }
        }

        if let Some(vin) = self.vehicle.vin.as_deref().map(str::trim) {
            if !vin.is_empty() && !is_valid_vin(vin) {
                return Err(invalid(
                    "vin",
                    "must be 17 characters, letters and digits only, without I, O or Q",
                ));
            }
        }

        if self.price.is_zero() {
            return Err(invalid("price", "must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> CoreError {
    CoreError::ValidationFailed {
        field: field.into(),
        message: message.into(),
    }
}

fn looks_like_email(raw: &str) -> bool {
    let raw = raw.trim();
    match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !raw.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_valid_vin(vin: &str) -> bool {
    vin.len() == VIN_LEN
        && vin
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c.to_ascii_uppercase(), 'I' | 'O' | 'Q'))
}

// ── Reservation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    #[serde(flatten)]
    pub details: ReservationDetails,
    pub status: ReservationStatus,
    /// The slot this reservation was booked on. `None` only for rows
    /// written before slots were linked back.
    pub slot_id: Option<SlotId>,
    pub window: TimeWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn customer_name(&self) -> String {
        format!(
            "{} {}",
            self.details.contact.first_name, self.details.contact.last_name
        )
    }
}
