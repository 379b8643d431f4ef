// ── Row conversions ──
//
// Translate between the hosted store's rows (`obdx_api::models`) and the
// domain model. Unknown status spellings and impossible windows surface
// as `StoreError::Corrupt` instead of being guessed at.

use chrono::{Duration, Utc};
use obdx_api::models::{
    NewReservationRow, NewSlotRow, NewTicketRow, ReservationRow, SlotRow, TicketRow,
};

use crate::model::{
    Address, Contact, NewSlot, NewTicket, Price, Reservation, ReservationDetails, ReservationStatus,
    Slot, SlotStatus, SupportTicket, TicketId, TicketStatus, TimeWindow, Vehicle,
};
use crate::store::StoreError;

/// Rows written before reservations carried an end time get this length.
fn legacy_appointment_length() -> Duration {
    Duration::hours(1)
}

fn corrupt(entity: &'static str, id: impl ToString, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        entity,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

// ── Slots ───────────────────────────────────────────────────────────

pub(crate) fn slot_from_row(row: SlotRow) -> Result<Slot, StoreError> {
    let status = SlotStatus::from_wire(&row.statut)
        .ok_or_else(|| corrupt("slot", row.id, format!("unknown status '{}'", row.statut)))?;
    let window = TimeWindow::new(row.date_debut, row.date_fin)
        .map_err(|e| corrupt("slot", row.id, e))?;

    Ok(Slot {
        id: row.id.into(),
        window,
        status,
        reservation_id: row.reservation_id.map(Into::into),
        notes: row.notes.filter(|n| !n.is_empty()),
        updated_at: row.updated_at.or(row.created_at).unwrap_or_else(Utc::now),
    })
}

pub(crate) fn new_slot_row(slot: &NewSlot) -> NewSlotRow {
    NewSlotRow {
        id: uuid::Uuid::new_v4(),
        date_debut: slot.window.start(),
        date_fin: slot.window.end(),
        statut: slot.status.wire().to_owned(),
        notes: slot.notes.clone(),
    }
}

// ── Reservations ────────────────────────────────────────────────────

pub(crate) fn reservation_from_row(row: ReservationRow) -> Result<Reservation, StoreError> {
    let status = ReservationStatus::from_wire(&row.statut).ok_or_else(|| {
        corrupt(
            "reservation",
            row.id,
            format!("unknown status '{}'", row.statut),
        )
    })?;
    let price = row
        .prix
        .parse::<Price>()
        .map_err(|e| corrupt("reservation", row.id, e))?;
    let end = row
        .date_fin
        .unwrap_or(row.date_heure + legacy_appointment_length());
    let window =
        TimeWindow::new(row.date_heure, end).map_err(|e| corrupt("reservation", row.id, e))?;

    Ok(Reservation {
        id: row.id.into(),
        details: ReservationDetails {
            contact: Contact {
                first_name: row.prenom,
                last_name: row.nom,
                email: row.email,
                phone: row.telephone,
            },
            address: Address {
                street: row.adresse,
                city: row.ville,
                postal_code: row.code_postal,
            },
            vehicle: Vehicle {
                make: row.marque_vehicule,
                model: row.modele_vehicule,
                year: row.annee_vehicule,
                vin: row.numero_vin.filter(|v| !v.is_empty()),
            },
            service: row.type_prestation,
            price,
            notes: row.notes.filter(|n| !n.is_empty()),
        },
        status,
        slot_id: row.disponibilite_id.map(Into::into),
        window,
        idempotency_key: row.idempotency_key,
        created_at: row.created_at,
    })
}

pub(crate) fn reservation_to_row(r: &Reservation) -> Result<NewReservationRow, StoreError> {
    let slot_id = r.slot_id.ok_or_else(|| StoreError::Rejected {
        reason: format!("reservation {} is not linked to a slot", r.id),
    })?;
    let d = &r.details;

    Ok(NewReservationRow {
        id: r.id.into(),
        nom: d.contact.last_name.clone(),
        prenom: d.contact.first_name.clone(),
        email: d.contact.email.clone(),
        telephone: d.contact.phone.clone(),
        adresse: d.address.street.clone(),
        ville: d.address.city.clone(),
        code_postal: d.address.postal_code.clone(),
        marque_vehicule: d.vehicle.make.clone(),
        modele_vehicule: d.vehicle.model.clone(),
        annee_vehicule: d.vehicle.year,
        numero_vin: d.vehicle.vin.clone(),
        type_prestation: d.service.clone(),
        prix: d.price.to_string(),
        notes: d.notes.clone(),
        statut: r.status.wire().to_owned(),
        date_heure: r.window.start(),
        date_fin: r.window.end(),
        disponibilite_id: slot_id.into(),
        idempotency_key: r
            .idempotency_key
            .clone()
            .unwrap_or_else(|| r.id.to_string()),
    })
}

// ── Tickets ─────────────────────────────────────────────────────────

pub(crate) fn ticket_from_row(row: TicketRow) -> Result<SupportTicket, StoreError> {
    let status = TicketStatus::from_wire(&row.statut)
        .ok_or_else(|| corrupt("ticket", row.id, format!("unknown status '{}'", row.statut)))?;

    Ok(SupportTicket {
        id: row.id.into(),
        first_name: row.prenom,
        last_name: row.nom,
        email: row.email,
        phone: row.telephone.filter(|p| !p.is_empty()),
        subject: row.sujet,
        description: row.description,
        attachment_url: row.fichier_url.filter(|u| !u.is_empty()),
        status,
        created_at: row.created_at,
    })
}

pub(crate) fn new_ticket_row(ticket: NewTicket) -> NewTicketRow {
    NewTicketRow {
        id: TicketId::new().into(),
        nom: ticket.last_name,
        prenom: ticket.first_name,
        email: ticket.email,
        telephone: ticket.phone,
        sujet: ticket.subject,
        description: ticket.description,
        fichier_url: ticket.attachment_url,
        statut: TicketStatus::New.wire().to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn slot_row(statut: &str) -> SlotRow {
        SlotRow {
            id: Uuid::new_v4(),
            date_debut: Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
            date_fin: Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap(),
            statut: statut.into(),
            reservation_id: None,
            notes: Some(String::new()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn slot_row_maps_status_and_blank_notes() {
        let slot = slot_from_row(slot_row("bloque")).unwrap();
        assert_eq!(slot.status, SlotStatus::Blocked);
        assert!(slot.notes.is_none());
    }

    #[test]
    fn unknown_slot_status_is_corrupt() {
        assert!(matches!(
            slot_from_row(slot_row("maybe")),
            Err(StoreError::Corrupt { entity: "slot", .. })
        ));
    }

    #[test]
    fn inverted_slot_window_is_corrupt() {
        let mut row = slot_row("disponible");
        std::mem::swap(&mut row.date_debut, &mut row.date_fin);
        assert!(slot_from_row(row).is_err());
    }

    #[test]
    fn legacy_reservation_without_end_gets_default_length() {
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let row = ReservationRow {
            id: Uuid::new_v4(),
            nom: "Martin".into(),
            prenom: "Claire".into(),
            email: "c@example.fr".into(),
            telephone: "0600000000".into(),
            adresse: "1 rue".into(),
            ville: "Lyon".into(),
            code_postal: "69001".into(),
            marque_vehicule: "Renault".into(),
            modele_vehicule: "Clio".into(),
            annee_vehicule: None,
            numero_vin: Some(String::new()),
            type_prestation: "essentiel".into(),
            prix: "99".into(),
            notes: None,
            statut: "en_attente".into(),
            date_heure: start,
            date_fin: None,
            disponibilite_id: None,
            idempotency_key: None,
            created_at: None,
            updated_at: None,
        };

        let r = reservation_from_row(row).unwrap();
        assert_eq!(r.status, ReservationStatus::New);
        assert_eq!(r.window.end(), start + Duration::hours(1));
        assert_eq!(r.details.price.to_string(), "99.00");
        assert!(r.details.vehicle.vin.is_none());
        assert!(reservation_to_row(&r).is_err());
    }
}
