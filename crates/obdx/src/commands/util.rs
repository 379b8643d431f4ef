//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use obdx_core::{ReservationStatus, SlotStatus, TicketStatus};

use crate::cli::{ReservationStatusArg, SlotStatusArg, TicketStatusArg};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Parse a typed id argument (`SlotId`, `ReservationId`, `TicketId`).
pub fn parse_id<T>(raw: &str) -> Result<T, CliError>
where
    T: FromStr<Err = obdx_core::CoreError>,
{
    raw.parse().map_err(CliError::from)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM` or a bare
/// date (midnight). Times without an offset are UTC.
pub fn parse_time(field: &str, raw: &str) -> Result<DateTime<Utc>, CliError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(CliError::validation(
        field,
        format!("'{raw}' is not a date/time (try \"2031-03-10 09:00\")"),
    ))
}

// ── Status arguments ────────────────────────────────────────────────

impl From<SlotStatusArg> for SlotStatus {
    fn from(arg: SlotStatusArg) -> Self {
        match arg {
            SlotStatusArg::Available => Self::Available,
            SlotStatusArg::Reserved => Self::Reserved,
            SlotStatusArg::Blocked => Self::Blocked,
        }
    }
}

impl From<ReservationStatusArg> for ReservationStatus {
    fn from(arg: ReservationStatusArg) -> Self {
        match arg {
            ReservationStatusArg::New => Self::New,
            ReservationStatusArg::Confirmed => Self::Confirmed,
            ReservationStatusArg::Completed => Self::Completed,
            ReservationStatusArg::Cancelled => Self::Cancelled,
        }
    }
}

impl From<TicketStatusArg> for TicketStatus {
    fn from(arg: TicketStatusArg) -> Self {
        match arg {
            TicketStatusArg::New => Self::New,
            TicketStatusArg::InProgress => Self::InProgress,
            TicketStatusArg::Resolved => Self::Resolved,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use obdx_core::SlotId;

    #[test]
    fn accepts_common_time_forms() {
        let expected = Utc.with_ymd_and_hms(2031, 3, 10, 9, 0, 0).unwrap();
        for raw in [
            "2031-03-10T09:00:00Z",
            "2031-03-10T11:00:00+02:00",
            "2031-03-10 09:00",
            "2031-03-10 09:00:00",
            "2031-03-10T09:00",
        ] {
            assert_eq!(parse_time("start", raw).unwrap(), expected, "{raw}");
        }
        assert_eq!(
            parse_time("from", "2031-03-10").unwrap(),
            Utc.with_ymd_and_hms(2031, 3, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_time() {
        let err = parse_time("start", "next tuesday").unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "start"));
    }

    #[test]
    fn bad_id_is_validation_error() {
        let err = parse_id::<SlotId>("not-a-uuid").unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn yes_flag_skips_prompt() {
        assert!(confirm("delete", "Delete?", true).unwrap());
    }
}
