// ── Availability calendar ──
//
// One store read per call. Customers get bookable slots with the
// administrator fields stripped; administrators get every slot as stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::config::{ExpiryRules, PastSlotRule};
use crate::error::CoreError;
use crate::model::{Slot, SlotStatus};
use crate::store::{SlotFilter, Store};

/// Who is looking at the calendar.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Actor {
    #[default]
    Customer,
    Admin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarQuery {
    pub actor: Actor,
    /// Slots ending after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Slots starting before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Administrator-only status filter; ignored for customers.
    pub status: Option<SlotStatus>,
}

impl CalendarQuery {
    pub fn customer() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self {
            actor: Actor::Admin,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    fn filter(&self) -> SlotFilter {
        SlotFilter {
            status: match self.actor {
                Actor::Customer => Some(SlotStatus::Available),
                Actor::Admin => self.status,
            },
            from: self.from,
            to: self.to,
        }
    }
}

pub(crate) async fn read<S: Store>(
    store: &S,
    expiry: &ExpiryRules,
    query: &CalendarQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Slot>, CoreError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from >= to {
            return Err(CoreError::ValidationFailed {
                field: "range".into(),
                message: format!("start {from} is not before end {to}"),
            });
        }
    }

    let mut slots = store.read_slots(&query.filter()).await.map_err(|e| {
        warn!(error = %e, actor = %query.actor, "calendar read failed");
        CoreError::CalendarUnavailable {
            reason: e.to_string(),
        }
    })?;

    if query.actor == Actor::Customer {
        let hide_past = expiry.past_slots != PastSlotRule::Keep;
        slots = slots
            .iter()
            .filter(|s| s.is_available())
            .filter(|s| !(hide_past && s.window.has_started(now)))
            .map(Slot::redacted)
            .collect();
    }
    slots.sort_by(|a, b| a.start().cmp(&b.start()).then(a.id.cmp(&b.id)));

    debug!(actor = %query.actor, count = slots.len(), "calendar read");
    Ok(slots)
}
