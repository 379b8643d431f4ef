// ── Support ticket domain types ──
//
// After-sales requests. Independent from slots; their status vocabulary
// is deliberately separate from reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::TicketId;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TicketStatus {
    New,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn wire(self) -> &'static str {
        match self {
            Self::New => "nouveau",
            Self::InProgress => "en_cours",
            Self::Resolved => "resolu",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nouveau" | "new" => Some(Self::New),
            "en_cours" | "in_progress" => Some(Self::InProgress),
            "resolu" | "résolu" | "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: TicketId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    pub status: TicketStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub description: String,
    pub attachment_url: Option<String>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("subject", &self.subject),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationFailed {
                    field: field.into(),
                    message: "is required".into(),
                });
            }
        }
        if let Some(url) = self.attachment_url.as_deref() {
            url::Url::parse(url).map_err(|e| CoreError::ValidationFailed {
                field: "attachment_url".into(),
                message: format!("invalid URL: {e}"),
            })?;
        }
        Ok(())
    }
}
