// ── Runtime configuration ──
//
// These types describe how to reach the store and how the scheduler
// treats expiry and pricing. They never touch disk; the config crate
// builds them from TOML profiles and hands them in.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use obdx_api::{RestClient, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::model::Price;
use crate::store::RemoteStore;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). The hosted store has a public certificate.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification.
    DangerAcceptInvalid,
}

/// Where the store lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project URL (e.g. `https://abcd.supabase.co`) or its `/rest/v1` root.
    pub url: Url,
    pub api_key: SecretString,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl StoreConfig {
    fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }

    /// Build the remote accessor. Does not perform any request.
    pub fn connect(&self) -> Result<RemoteStore, CoreError> {
        let client = RestClient::from_api_key(self.url.as_str(), &self.api_key, &self.transport())
            .map_err(|e| CoreError::Config {
                message: format!("cannot build store client: {e}"),
            })?;
        Ok(RemoteStore::new(client))
    }
}

// ── Expiry rules ────────────────────────────────────────────────────

/// What happens to available slots whose start time has passed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PastSlotRule {
    /// Customers keep seeing them.
    Keep,
    /// Customers stop seeing them; nothing is written.
    #[default]
    Hide,
    /// Hidden, and the repair pass blocks them.
    Block,
}

/// What happens to the slot of a cancelled reservation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CancelledRule {
    /// The slot stays reserved until an administrator releases it.
    Keep,
    /// Cancelling releases the slot back to `available`.
    #[default]
    Release,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryRules {
    #[serde(default)]
    pub past_slots: PastSlotRule,
    #[serde(default)]
    pub cancelled_reservations: CancelledRule,
}

// ── Pricing ─────────────────────────────────────────────────────────

pub const DEFAULT_PRICE: Price = Price::from_euros(99);

/// Intervention price per city, with a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    default: Price,
    by_city: HashMap<String, Price>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE)
    }
}

impl PriceTable {
    pub fn new(default: Price) -> Self {
        Self {
            default,
            by_city: HashMap::new(),
        }
    }

    pub fn with_city(mut self, city: &str, price: Price) -> Self {
        self.by_city.insert(normalize_city(city), price);
        self
    }

    pub fn default_price(&self) -> Price {
        self.default
    }

    /// Price for an intervention in `city`, falling back to the default.
    pub fn price_for(&self, city: &str) -> Price {
        self.by_city
            .get(&normalize_city(city))
            .copied()
            .unwrap_or(self.default)
    }
}

fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

// ── Scheduler ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub expiry: ExpiryRules,
    /// Slots modified more recently than this are never repaired; a booking
    /// may still be between its two writes.
    pub reconcile_grace: Duration,
    /// Period of the background reconciliation task. Zero disables it.
    pub reconcile_interval: Duration,
    /// Whether the background task repairs or only reports.
    pub reconcile_repair: bool,
    pub pricing: PriceTable,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expiry: ExpiryRules::default(),
            reconcile_grace: Duration::from_secs(5 * 60),
            reconcile_interval: Duration::ZERO,
            reconcile_repair: false,
            pricing: PriceTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_prices_are_case_insensitive() {
        let table = PriceTable::default().with_city("Lyon", Price::from_euros(109));
        assert_eq!(table.price_for("  LYON "), Price::from_euros(109));
        assert_eq!(table.price_for("Paris"), DEFAULT_PRICE);
    }

    #[test]
    fn rules_parse_from_config_strings() {
        assert_eq!("block".parse::<PastSlotRule>().ok(), Some(PastSlotRule::Block));
        assert_eq!("Keep".parse::<CancelledRule>().ok(), Some(CancelledRule::Keep));
    }
}
