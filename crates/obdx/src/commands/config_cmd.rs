//! Config subcommand handlers. None of these touch the store.

use dialoguer::{Input, Select};

use obdx_config::KEYRING_SERVICE;
use obdx_core::{CancelledRule, PastSlotRule, Price};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::validation("interactive", format!("prompt failed: {e}"))
}

fn store_in_keyring(profile_name: &str, secret: &str) -> Result<(), CliError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .map_err(|e| CliError::validation("keyring", format!("failed to access keyring: {e}")))?;
    entry.set_password(secret).map_err(|e| {
        CliError::validation("keyring", format!("failed to store API key in keyring: {e}"))
    })
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value
        .parse()
        .map_err(|_| CliError::validation(key, format!("must be {expected}")))
}

fn check_price(key: &str, value: &str) -> Result<(), CliError> {
    let price: Price = parse_value(key, value, "an amount such as 99 or 119.50")?;
    if price.is_zero() {
        return Err(CliError::validation(key, "must be greater than zero"));
    }
    Ok(())
}

/// Plaintext keys never leave the file through `config show`.
fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some("********".into());
        }
    }
    cfg
}

const VALID_KEYS: &str = "url, api_key, api_key_env, ca_cert, insecure, timeout, \
    scheduler.past_slots, scheduler.cancelled_reservations, scheduler.reconcile_grace_secs, \
    scheduler.reconcile_interval_secs, scheduler.reconcile_repair, pricing.default, \
    pricing.cities.<city>";

/// Apply `config set <key> <value>` to the loaded file.
fn set_key(cfg: &mut Config, profile_name: &str, key: &str, value: String) -> Result<(), CliError> {
    if let Some(city) = key.strip_prefix("pricing.cities.") {
        if city.trim().is_empty() {
            return Err(CliError::validation(key, "city name is empty"));
        }
        check_price(key, &value)?;
        cfg.pricing.cities.insert(city.to_owned(), value);
        return Ok(());
    }

    match key {
        "scheduler.past_slots" => {
            cfg.scheduler.past_slots =
                parse_value::<PastSlotRule>(key, &value, "keep, hide or block")?;
        }
        "scheduler.cancelled_reservations" => {
            cfg.scheduler.cancelled_reservations =
                parse_value::<CancelledRule>(key, &value, "keep or release")?;
        }
        "scheduler.reconcile_grace_secs" => {
            cfg.scheduler.reconcile_grace_secs = parse_value(key, &value, "a number (seconds)")?;
        }
        "scheduler.reconcile_interval_secs" => {
            cfg.scheduler.reconcile_interval_secs =
                parse_value(key, &value, "a number (seconds, 0 disables)")?;
        }
        "scheduler.reconcile_repair" => {
            cfg.scheduler.reconcile_repair = parse_value(key, &value, "'true' or 'false'")?;
        }
        "pricing.default" => {
            check_price(key, &value)?;
            cfg.pricing.default = value;
        }
        _ => {
            let profile = cfg.profiles.entry(profile_name.to_owned()).or_default();
            match key {
                "url" => {
                    url::Url::parse(&value)
                        .map_err(|e| CliError::validation("url", format!("invalid URL: {e}")))?;
                    profile.url = value;
                }
                "api_key" | "api-key" => profile.api_key = Some(value),
                "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => {
                    profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?);
                }
                "timeout" => {
                    profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?);
                }
                other => {
                    return Err(CliError::validation(
                        other,
                        format!("unknown config key '{other}'. Valid keys: {VALID_KEYS}"),
                    ));
                }
            }
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = redacted(config::load_config()?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| format!("{c:#?}"),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            set_key(&mut cfg, &profile_name, &key, value)?;
            config::save_config(&cfg)?;
            output::notice(global, &format!("Set {key} (profile '{profile_name}')"));
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: obdx config init");
                return Ok(());
            }
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::notice(global, &format!("Default profile set to '{name}'"));
            Ok(())
        }

        ConfigCommand::SetKey { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let secret = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::validation("api_key", "value cannot be empty"));
            }
            store_in_keyring(&profile_name, &secret)?;
            output::notice(
                global,
                &format!("API key stored in system keyring for profile '{profile_name}'"),
            );
            Ok(())
        }
    }
}

/// Interactive wizard: one profile, written as the default.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("obdx configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let url: String = Input::new()
        .with_prompt("Store URL")
        .validate_with(|input: &String| -> Result<(), String> {
            url::Url::parse(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
    if key.is_empty() {
        return Err(CliError::validation("api_key", "API key cannot be empty"));
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let api_key = if store_selection == 0 {
        store_in_keyring(&profile_name, &key)?;
        eprintln!("   ✓ API key stored in system keyring");
        None
    } else {
        Some(key)
    };

    // Keep [scheduler], [pricing] and other profiles from an existing file.
    let mut cfg = config::load_config().unwrap_or_default();
    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            url,
            api_key,
            ..Profile::default()
        },
    );
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: obdx slots list --all");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn profile_keys_create_the_profile() {
        let mut cfg = Config::default();
        set_key(&mut cfg, "prod", "url", "https://abcd.supabase.co".into()).unwrap();
        set_key(&mut cfg, "prod", "timeout", "12".into()).unwrap();
        let profile = &cfg.profiles["prod"];
        assert_eq!(profile.url, "https://abcd.supabase.co");
        assert_eq!(profile.timeout, Some(12));
    }

    #[test]
    fn scheduler_and_pricing_keys() {
        let mut cfg = Config::default();
        set_key(&mut cfg, "default", "scheduler.past_slots", "Block".into()).unwrap();
        set_key(&mut cfg, "default", "pricing.cities.Lyon", "109".into()).unwrap();
        assert_eq!(cfg.scheduler.past_slots, PastSlotRule::Block);
        assert_eq!(cfg.pricing.cities["Lyon"], "109");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut cfg = Config::default();
        assert!(set_key(&mut cfg, "default", "scheduler.past_slots", "later".into()).is_err());
        assert!(set_key(&mut cfg, "default", "pricing.default", "0".into()).is_err());
        assert!(set_key(&mut cfg, "default", "url", "nowhere".into()).is_err());
        assert!(set_key(&mut cfg, "default", "colour", "red".into()).is_err());
    }

    #[test]
    fn show_hides_plaintext_keys() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                api_key: Some("secret".into()),
                ..Profile::default()
            },
        );
        let shown = redacted(cfg);
        assert_eq!(shown.profiles["default"].api_key.as_deref(), Some("********"));
    }
}
