//! Shared configuration for the obdx tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `obdx_core::StoreConfig` / `obdx_core::SchedulerConfig`.
//! The CLI layers its global flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use obdx_core::{
    CancelledRule, ExpiryRules, PastSlotRule, Price, PriceTable, SchedulerConfig, StoreConfig,
    TlsVerification,
};

/// Keyring service name; entries are keyed `<profile>/api-key`.
pub const KEYRING_SERVICE: &str = "obdx";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named store profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub pricing: PricingSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            scheduler: SchedulerSection::default(),
            pricing: PricingSection::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named store profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Project URL (e.g., "https://abcd.supabase.co").
    pub url: String,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

/// `[scheduler]`: expiry rules and reconciliation cadence.
#[derive(Debug, Deserialize, Serialize)]
pub struct SchedulerSection {
    #[serde(default)]
    pub past_slots: PastSlotRule,

    #[serde(default)]
    pub cancelled_reservations: CancelledRule,

    /// Seconds a slot must stay untouched before reconciliation repairs it.
    #[serde(default = "default_reconcile_grace")]
    pub reconcile_grace_secs: u64,

    /// Background reconciliation period in seconds; 0 disables it.
    #[serde(default)]
    pub reconcile_interval_secs: u64,

    /// Whether background reconciliation repairs or only reports.
    #[serde(default)]
    pub reconcile_repair: bool,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            past_slots: PastSlotRule::default(),
            cancelled_reservations: CancelledRule::default(),
            reconcile_grace_secs: default_reconcile_grace(),
            reconcile_interval_secs: 0,
            reconcile_repair: false,
        }
    }
}

fn default_reconcile_grace() -> u64 {
    300
}

/// `[pricing]`: amounts as strings, e.g. `"99.00"`.
#[derive(Debug, Deserialize, Serialize)]
pub struct PricingSection {
    #[serde(default = "default_price")]
    pub default: String,

    /// City name → price. Matched case-insensitively.
    #[serde(default)]
    pub cities: HashMap<String, String>,
}

impl Default for PricingSection {
    fn default() -> Self {
        Self {
            default: default_price(),
            cities: HashMap::new(),
        }
    }
}

fn default_price() -> String {
    obdx_core::config::DEFAULT_PRICE.to_string()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("fr", "obdexpress", "obdx").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("obdx");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still honouring `OBDX_*` overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OBDX_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `StoreConfig` from a profile, without CLI flag overrides.
pub fn profile_to_store_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<StoreConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let api_key = resolve_api_key(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));

    Ok(StoreConfig {
        url,
        api_key,
        tls,
        timeout,
    })
}

// ── Scheduler settings ──────────────────────────────────────────────

fn parse_price(field: &str, raw: &str) -> Result<Price, ConfigError> {
    let price: Price = raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not an amount"),
    })?;
    if price.is_zero() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(price)
}

impl Config {
    /// Translate the `[scheduler]` and `[pricing]` sections.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let mut pricing = PriceTable::new(parse_price("pricing.default", &self.pricing.default)?);
        for (city, raw) in &self.pricing.cities {
            let price = parse_price(&format!("pricing.cities.{city}"), raw)?;
            pricing = pricing.with_city(city, price);
        }

        Ok(SchedulerConfig {
            expiry: ExpiryRules {
                past_slots: self.scheduler.past_slots,
                cancelled_reservations: self.scheduler.cancelled_reservations,
            },
            reconcile_grace: Duration::from_secs(self.scheduler.reconcile_grace_secs),
            reconcile_interval: Duration::from_secs(self.scheduler.reconcile_interval_secs),
            reconcile_repair: self.scheduler.reconcile_repair,
            pricing,
        })
    }
}
