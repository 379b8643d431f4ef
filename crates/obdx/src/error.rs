//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use obdx_config::ConfigError;
use obdx_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const UNAVAILABLE: i32 = 7;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Store reachability ───────────────────────────────────────────
    #[error("Store unavailable: {reason}")]
    #[diagnostic(
        code(obdx::unavailable),
        help(
            "Nothing was written. Retry the same command; bookings can be\n\
             retried safely with the same --idempotency-key.\n\
             Slow network? Raise --timeout."
        )
    )]
    Unavailable { reason: String },

    #[error("Calendar unavailable: {reason}")]
    #[diagnostic(
        code(obdx::calendar_unavailable),
        help("The calendar could not be read. Try again in a moment.")
    )]
    CalendarUnavailable { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(obdx::auth_failed),
        help(
            "Verify the API key for this profile.\n\
             Run: obdx config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(obdx::no_credentials),
        help(
            "Configure credentials with: obdx config init\n\
             Or set the OBDX_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Booking ──────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(
        code(obdx::slot_taken),
        help("Pick another slot. Run: obdx slots list")
    )]
    SlotTaken(String),

    #[error("{message}")]
    #[diagnostic(
        code(obdx::partial_failure),
        help(
            "Slot {slot_id} is held for reservation {reservation_id} but the\n\
             reservation row is missing. Retry with the same --idempotency-key,\n\
             or run `obdx reconcile --repair` once the grace period has passed."
        )
    )]
    PartialFailure {
        message: String,
        slot_id: String,
        reservation_id: String,
    },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(obdx::not_found),
        help("Run: obdx {list_command} to see existing {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(obdx::conflict))]
    Conflict {
        message: String,
        #[help]
        hint: Option<String>,
    },

    #[error("Store rejected the request: {message}")]
    #[diagnostic(code(obdx::rejected))]
    Rejected { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(obdx::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(obdx::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: obdx config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No store configured")]
    #[diagnostic(
        code(obdx::no_config),
        help(
            "Create a profile with: obdx config init\n\
             Or pass --url and --api-key.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(obdx::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(obdx::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal / IO / Serialization ────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(obdx::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(obdx::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(obdx::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } | Self::CalendarUnavailable { .. } => exit_code::UNAVAILABLE,
            Self::AuthFailed { .. }
            | Self::NoCredentials { .. }
            | Self::Config(ConfigError::NoCredentials { .. }) => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::SlotTaken(_) | Self::Conflict { .. } => exit_code::CONFLICT,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::StoreUnavailable { reason } => CliError::Unavailable { reason },

            CoreError::CalendarUnavailable { reason } => CliError::CalendarUnavailable { reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::SlotNoLongerAvailable { .. } => CliError::SlotTaken(message),

            CoreError::PartialFailure {
                slot_id,
                reservation_id,
                ..
            } => CliError::PartialFailure {
                message,
                slot_id: slot_id.to_string(),
                reservation_id: reservation_id.to_string(),
            },

            CoreError::SlotReserved { slot_id, .. } => CliError::Conflict {
                message,
                hint: Some(format!("Run: obdx slots release {slot_id}")),
            },

            CoreError::InvalidTransition { .. } => CliError::Conflict {
                message,
                hint: Some("Run: obdx slots list --all to see the slot's current state".into()),
            },

            CoreError::Conflict { message } => CliError::Conflict {
                message,
                hint: None,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&entity_type).into(),
                resource_type: entity_type,
                identifier,
            },

            CoreError::ValidationFailed { field, message } => CliError::Validation {
                field,
                reason: message,
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Config { message } => CliError::Config(ConfigError::Validation {
                field: "store".into(),
                reason: message,
            }),

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

fn list_command_for(entity_type: &str) -> &'static str {
    match entity_type {
        "reservation" => "reservations list",
        "ticket" => "tickets list",
        _ => "slots list --all",
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            other => CliError::Config(other),
        }
    }
}
