// Row shapes of the hosted store.
//
// Column names are the store's own (French) schema. Status columns stay
// plain strings here; `obdx-core` owns the typed vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ── Error body ──────────────────────────────────────────────────────

/// PostgREST error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

// ── disponibilites ──────────────────────────────────────────────────

/// A row of `disponibilites`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRow {
    pub id: Uuid,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    /// `disponible`, `reserve` or `bloque`.
    pub statut: String,
    #[serde(default)]
    pub reservation_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSlotRow {
    pub id: Uuid,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub statut: String,
    pub notes: Option<String>,
}

/// Partial update of a slot row. `None` fields are left untouched;
/// `Some(None)` writes SQL `NULL`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SlotPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_debut: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_fin: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ── reservations ────────────────────────────────────────────────────

/// A row of `reservations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRow {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
    pub adresse: String,
    pub ville: String,
    pub code_postal: String,
    pub marque_vehicule: String,
    pub modele_vehicule: String,
    #[serde(default)]
    pub annee_vehicule: Option<i32>,
    #[serde(default)]
    pub numero_vin: Option<String>,
    #[serde(default = "default_service")]
    pub type_prestation: String,
    /// Decimal text, e.g. `"99"` or `"129.50"`. The column is `numeric` in
    /// older deployments and text in newer ones; both read into a string.
    #[serde(deserialize_with = "amount_text")]
    pub prix: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub statut: String,
    pub date_heure: DateTime<Utc>,
    #[serde(default)]
    pub date_fin: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disponibilite_id: Option<Uuid>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_service() -> String {
    "essentiel".into()
}

fn amount_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(serde_json::Number),
        Text(String),
    }

    Ok(match Amount::deserialize(de)? {
        Amount::Number(n) => n.to_string(),
        Amount::Text(s) => s,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReservationRow {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
    pub adresse: String,
    pub ville: String,
    pub code_postal: String,
    pub marque_vehicule: String,
    pub modele_vehicule: String,
    pub annee_vehicule: Option<i32>,
    pub numero_vin: Option<String>,
    pub type_prestation: String,
    pub prix: String,
    pub notes: Option<String>,
    pub statut: String,
    pub date_heure: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub disponibilite_id: Uuid,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusPatch<'a> {
    pub statut: &'a str,
    pub updated_at: DateTime<Utc>,
}

// ── demandes_sav ────────────────────────────────────────────────────

/// A row of `demandes_sav` (after-sales support requests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    #[serde(default)]
    pub telephone: Option<String>,
    pub sujet: String,
    pub description: String,
    #[serde(default)]
    pub fichier_url: Option<String>,
    pub statut: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTicketRow {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: Option<String>,
    pub sujet: String,
    pub description: String,
    pub fichier_url: Option<String>,
    pub statut: String,
}
