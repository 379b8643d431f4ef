// Reservation endpoints (`reservations`)

use chrono::Utc;
use uuid::Uuid;

use super::client::{RestClient, eq};
use super::models::{NewReservationRow, ReservationRow, StatusPatch};
use crate::Error;

const TABLE: &str = "reservations";

impl RestClient {
    /// List reservations, newest first.
    pub async fn list_reservations(&self) -> Result<Vec<ReservationRow>, Error> {
        let params = [
            ("select", "*".to_owned()),
            ("order", "created_at.desc".to_owned()),
        ];
        self.select(TABLE, &params).await
    }

    pub async fn get_reservation(&self, id: Uuid) -> Result<Option<ReservationRow>, Error> {
        let params = [("select", "*".to_owned()), ("id", eq(id))];
        self.select_one(TABLE, &params).await
    }

    /// Insert a reservation. A primary-key collision surfaces as
    /// [`Error::Conflict`].
    pub async fn insert_reservation(
        &self,
        row: &NewReservationRow,
    ) -> Result<ReservationRow, Error> {
        self.insert(TABLE, row).await
    }

    pub async fn update_reservation_status(
        &self,
        id: Uuid,
        statut: &str,
    ) -> Result<Option<ReservationRow>, Error> {
        let patch = StatusPatch {
            statut,
            updated_at: Utc::now(),
        };
        let rows: Vec<ReservationRow> = self.update(TABLE, &[("id", eq(id))], &patch).await?;
        Ok(rows.into_iter().next())
    }
}
