//! CLI configuration: `obdx_config` types plus global-flag overrides
//! (--url, --api-key, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use obdx_core::{StoreConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use obdx_config::{Config, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for error hints.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

/// Translate a `Profile` + global flags into a `StoreConfig`.
///
/// Flags take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<StoreConfig, CliError> {
    let url_str = global.url.as_deref().unwrap_or(&profile.url);
    let url = parse_url(url_str)?;

    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => obdx_config::resolve_api_key(profile, profile_name)?,
    };

    let tls = if global.insecure || profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // --timeout always has a value; the profile only wins over the default.
    let timeout = match profile.timeout {
        Some(secs) if global.timeout == DEFAULT_TIMEOUT_SECS => secs,
        _ => global.timeout,
    };

    Ok(StoreConfig {
        url,
        api_key,
        tls,
        timeout: Duration::from_secs(timeout),
    })
}

/// Store settings from flags and env vars alone, for runs without a profile.
pub fn from_flags(global: &GlobalOpts, profile_name: String) -> Result<StoreConfig, CliError> {
    let url_str = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url = parse_url(url_str)?;

    let api_key = global
        .api_key
        .clone()
        .map(SecretString::from)
        .ok_or(CliError::NoCredentials {
            profile: profile_name,
        })?;

    let tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(StoreConfig {
        url,
        api_key,
        tls,
        timeout: Duration::from_secs(global.timeout),
    })
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse()
        .map_err(|_| CliError::validation("url", format!("invalid URL: {raw}")))
}
