// Slot endpoints (`disponibilites`)

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::client::{RestClient, eq};
use super::models::{NewSlotRow, SlotPatch, SlotRow};
use crate::Error;

const TABLE: &str = "disponibilites";

/// Read filter for slot listings. A window matches every slot that
/// overlaps it (`date_fin > from` and `date_debut < to`).
#[derive(Debug, Clone, Default)]
pub struct SlotQuery {
    pub statut: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn by_id(id: Uuid) -> Vec<(&'static str, String)> {
    vec![("id", eq(id))]
}

impl RestClient {
    /// List slots ordered by start time.
    pub async fn list_slots(&self, query: &SlotQuery) -> Result<Vec<SlotRow>, Error> {
        let mut params = vec![
            ("select", "*".to_owned()),
            ("order", "date_debut.asc,id.asc".to_owned()),
        ];
        if let Some(ref statut) = query.statut {
            params.push(("statut", eq(statut)));
        }
        if let Some(from) = query.from {
            params.push(("date_fin", format!("gt.{}", timestamp(from))));
        }
        if let Some(to) = query.to {
            params.push(("date_debut", format!("lt.{}", timestamp(to))));
        }
        self.select(TABLE, &params).await
    }

    pub async fn get_slot(&self, id: Uuid) -> Result<Option<SlotRow>, Error> {
        let mut params = by_id(id);
        params.push(("select", "*".to_owned()));
        self.select_one(TABLE, &params).await
    }

    pub async fn insert_slot(&self, row: &NewSlotRow) -> Result<SlotRow, Error> {
        self.insert(TABLE, row).await
    }

    /// Compare-and-swap update: applies `patch` only while the row still has
    /// `expected_statut` (and, when given, `expected_reservation`).
    ///
    /// Returns the updated row, or `None` when no row matched. An empty
    /// result does not say whether the row is missing or the condition
    /// failed; callers re-read to tell the two apart.
    pub async fn update_slot_if(
        &self,
        id: Uuid,
        expected_statut: &str,
        expected_reservation: Option<Uuid>,
        patch: &SlotPatch,
    ) -> Result<Option<SlotRow>, Error> {
        let mut params = by_id(id);
        params.push(("statut", eq(expected_statut)));
        if let Some(rid) = expected_reservation {
            params.push(("reservation_id", eq(rid)));
        }
        let rows: Vec<SlotRow> = self.update(TABLE, &params, patch).await?;
        Ok(rows.into_iter().next())
    }

    /// Unconditioned update of a single slot.
    pub async fn update_slot(&self, id: Uuid, patch: &SlotPatch) -> Result<Option<SlotRow>, Error> {
        let rows: Vec<SlotRow> = self.update(TABLE, &by_id(id), patch).await?;
        Ok(rows.into_iter().next())
    }

    /// Update a slot unless it currently has `protected_statut`.
    ///
    /// Returns the updated row, or `None` when nothing matched.
    pub async fn update_slot_unless(
        &self,
        id: Uuid,
        protected_statut: &str,
        patch: &SlotPatch,
    ) -> Result<Option<SlotRow>, Error> {
        let mut params = by_id(id);
        params.push(("statut", format!("neq.{protected_statut}")));
        let rows: Vec<SlotRow> = self.update(TABLE, &params, patch).await?;
        Ok(rows.into_iter().next())
    }

    /// Delete a slot unless it currently has `protected_statut`.
    ///
    /// Returns the deleted row, or `None` when nothing matched.
    pub async fn delete_slot_unless(
        &self,
        id: Uuid,
        protected_statut: &str,
    ) -> Result<Option<SlotRow>, Error> {
        let mut params = by_id(id);
        params.push(("statut", format!("neq.{protected_statut}")));
        let rows: Vec<SlotRow> = self.delete(TABLE, &params).await?;
        Ok(rows.into_iter().next())
    }
}
