// ── Remote store ──
//
// Accessor over the hosted store's REST surface. Conditional writes are
// filtered PATCH/DELETE requests; when one matches no row, a follow-up
// read tells "precondition failed" apart from "not found".

use chrono::Utc;
use obdx_api::RestClient;
use obdx_api::models::SlotPatch;
use obdx_api::rest::SlotQuery;
use tracing::warn;

use super::{
    ConditionalOutcome, DeleteOutcome, Precondition, SlotChange, SlotEdit, SlotFilter, Store,
    StoreError,
};
use crate::convert;
use crate::model::{
    NewSlot, NewTicket, Reservation, ReservationId, ReservationStatus, Slot, SlotId, SlotStatus,
    SupportTicket, TicketId, TicketStatus,
};

pub struct RemoteStore {
    client: RestClient,
}

impl RemoteStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

/// Convert every row, dropping the ones that cannot be represented.
fn convert_rows<R, T>(
    rows: Vec<R>,
    convert: impl Fn(R) -> Result<T, StoreError>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match convert(row) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "skipping unreadable row");
                None
            }
        })
        .collect()
}

impl Store for RemoteStore {
    async fn read_slots(&self, filter: &SlotFilter) -> Result<Vec<Slot>, StoreError> {
        let query = SlotQuery {
            statut: filter.status.map(|s| s.wire().to_owned()),
            from: filter.from,
            to: filter.to,
        };
        let rows = self.client.list_slots(&query).await?;
        Ok(convert_rows(rows, convert::slot_from_row))
    }

    async fn get_slot(&self, id: SlotId) -> Result<Option<Slot>, StoreError> {
        self.client
            .get_slot(id.into())
            .await?
            .map(convert::slot_from_row)
            .transpose()
    }

    async fn insert_slot(&self, slot: NewSlot) -> Result<Slot, StoreError> {
        if slot.status == SlotStatus::Reserved {
            return Err(StoreError::Rejected {
                reason: "slots cannot be inserted reserved".into(),
            });
        }
        let row = self.client.insert_slot(&convert::new_slot_row(&slot)).await?;
        convert::slot_from_row(row)
    }

    async fn conditional_update_slot(
        &self,
        id: SlotId,
        expected: Precondition,
        change: SlotChange,
    ) -> Result<ConditionalOutcome, StoreError> {
        let patch = SlotPatch {
            statut: Some(change.status.wire().to_owned()),
            reservation_id: Some(change.reservation_id.map(Into::into)),
            updated_at: Some(Utc::now()),
            ..SlotPatch::default()
        };
        let updated = self
            .client
            .update_slot_if(
                id.into(),
                expected.status.wire(),
                expected.reservation_id.map(Into::into),
                &patch,
            )
            .await?;

        if let Some(row) = updated {
            return Ok(ConditionalOutcome::Applied(convert::slot_from_row(row)?));
        }
        Ok(match self.get_slot(id).await? {
            Some(current) => ConditionalOutcome::PreconditionFailed(current),
            None => ConditionalOutcome::NotFound,
        })
    }

    async fn edit_slot(
        &self,
        id: SlotId,
        edit: SlotEdit,
    ) -> Result<ConditionalOutcome, StoreError> {
        let moves_window = edit.window.is_some();
        let patch = SlotPatch {
            date_debut: edit.window.map(|w| w.start()),
            date_fin: edit.window.map(|w| w.end()),
            notes: edit.notes,
            updated_at: Some(Utc::now()),
            ..SlotPatch::default()
        };
        let updated = if moves_window {
            self.client
                .update_slot_unless(id.into(), SlotStatus::Reserved.wire(), &patch)
                .await?
        } else {
            self.client.update_slot(id.into(), &patch).await?
        };

        if let Some(row) = updated {
            return Ok(ConditionalOutcome::Applied(convert::slot_from_row(row)?));
        }
        Ok(match self.get_slot(id).await? {
            Some(current) => ConditionalOutcome::PreconditionFailed(current),
            None => ConditionalOutcome::NotFound,
        })
    }

    async fn delete_slot(&self, id: SlotId) -> Result<DeleteOutcome, StoreError> {
        let deleted = self
            .client
            .delete_slot_unless(id.into(), SlotStatus::Reserved.wire())
            .await?;

        if let Some(row) = deleted {
            return Ok(DeleteOutcome::Deleted(convert::slot_from_row(row)?));
        }
        Ok(match self.get_slot(id).await? {
            Some(current) => DeleteOutcome::Refused(current),
            None => DeleteOutcome::NotFound,
        })
    }

    async fn create_reservation(
        &self,
        reservation: Reservation,
    ) -> Result<Reservation, StoreError> {
        let row = convert::reservation_to_row(&reservation)?;
        match self.client.insert_reservation(&row).await {
            Ok(created) => convert::reservation_from_row(created),
            Err(e) if e.is_conflict() => Err(StoreError::Duplicate {
                entity: "reservation",
                id: reservation.id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError> {
        self.client
            .get_reservation(id.into())
            .await?
            .map(convert::reservation_from_row)
            .transpose()
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let rows = self.client.list_reservations().await?;
        Ok(convert_rows(rows, convert::reservation_from_row))
    }

    async fn update_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<Option<Reservation>, StoreError> {
        self.client
            .update_reservation_status(id.into(), status.wire())
            .await?
            .map(convert::reservation_from_row)
            .transpose()
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<SupportTicket, StoreError> {
        let row = self
            .client
            .insert_ticket(&convert::new_ticket_row(ticket))
            .await?;
        convert::ticket_from_row(row)
    }

    async fn list_tickets(&self) -> Result<Vec<SupportTicket>, StoreError> {
        let rows = self.client.list_tickets().await?;
        Ok(convert_rows(rows, convert::ticket_from_row))
    }

    async fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>, StoreError> {
        self.client
            .update_ticket_status(id.into(), status.wire())
            .await?
            .map(convert::ticket_from_row)
            .transpose()
    }
}
