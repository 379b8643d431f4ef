// Support ticket endpoints (`demandes_sav`)

use chrono::Utc;
use uuid::Uuid;

use super::client::{RestClient, eq};
use super::models::{NewTicketRow, StatusPatch, TicketRow};
use crate::Error;

const TABLE: &str = "demandes_sav";

impl RestClient {
    pub async fn list_tickets(&self) -> Result<Vec<TicketRow>, Error> {
        let params = [
            ("select", "*".to_owned()),
            ("order", "created_at.desc".to_owned()),
        ];
        self.select(TABLE, &params).await
    }

    pub async fn insert_ticket(&self, row: &NewTicketRow) -> Result<TicketRow, Error> {
        self.insert(TABLE, row).await
    }

    pub async fn update_ticket_status(
        &self,
        id: Uuid,
        statut: &str,
    ) -> Result<Option<TicketRow>, Error> {
        let patch = StatusPatch {
            statut,
            updated_at: Utc::now(),
        };
        let rows: Vec<TicketRow> = self.update(TABLE, &[("id", eq(id))], &patch).await?;
        Ok(rows.into_iter().next())
    }
}
