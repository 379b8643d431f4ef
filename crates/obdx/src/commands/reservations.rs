//! Reservation command handlers.

use tabled::Tabled;

use obdx_core::{
    Command as CoreCommand, CommandResult, RemoteStore, Reservation, ReservationId,
    ReservationStatus, Scheduler,
};

use crate::cli::{GlobalOpts, ReservationsArgs, ReservationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReservationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Appointment")]
    appointment: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Vehicle")]
    vehicle: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Reservation> for ReservationRow {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.to_string(),
            customer: r.customer_name(),
            appointment: output::timestamp(r.window.start()),
            city: r.details.address.city.clone(),
            vehicle: format!("{} {}", r.details.vehicle.make, r.details.vehicle.model),
            price: r.details.price.to_string(),
            status: r.status.to_string(),
        }
    }
}

fn detail(r: &Reservation) -> String {
    let d = &r.details;
    let mut lines = vec![
        format!("ID:          {}", r.id),
        format!("Status:      {}", r.status),
        format!("Customer:    {}", r.customer_name()),
        format!("Email:       {}", d.contact.email),
        format!("Phone:       {}", d.contact.phone),
        format!(
            "Address:     {}, {} {}",
            d.address.street, d.address.postal_code, d.address.city
        ),
        format!(
            "Vehicle:     {} {}{}",
            d.vehicle.make,
            d.vehicle.model,
            d.vehicle.year.map(|y| format!(" ({y})")).unwrap_or_default()
        ),
        format!("VIN:         {}", d.vehicle.vin.as_deref().unwrap_or("-")),
        format!("Service:     {}", d.service),
        format!("Price:       {} EUR", d.price),
        format!(
            "Appointment: {} - {}",
            output::timestamp(r.window.start()),
            output::timestamp(r.window.end())
        ),
        format!("Slot:        {}", output::or_dash(r.slot_id)),
    ];
    if let Some(ref notes) = d.notes {
        lines.push(format!("Notes:       {notes}"));
    }
    if let Some(created) = r.created_at {
        lines.push(format!("Created:     {}", output::timestamp(created)));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    scheduler: &Scheduler<RemoteStore>,
    args: ReservationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ReservationsCommand::List { status } => {
            let wanted = status.map(ReservationStatus::from);
            let mut reservations: Vec<Reservation> = scheduler
                .list_reservations()
                .await?
                .into_iter()
                .filter(|r| wanted.is_none_or(|s| r.status == s))
                .collect();
            reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let out = output::render_list(
                &global.output,
                &reservations,
                |r| ReservationRow::from(r),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReservationsCommand::Get { id } => {
            let reservation = scheduler.get_reservation(util::parse_id(&id)?).await?;
            let out = output::render_single(&global.output, &reservation, detail, |r| {
                r.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReservationsCommand::Status { id, status } => {
            let id: ReservationId = util::parse_id(&id)?;
            let status = ReservationStatus::from(status);
            if status == ReservationStatus::Cancelled
                && !util::confirm(
                    "reservations status cancelled",
                    &format!("Cancel reservation {id}?"),
                    global.yes,
                )?
            {
                return Ok(());
            }

            let CommandResult::Reservation {
                reservation,
                released_slot,
            } = scheduler
                .execute(CoreCommand::SetReservationStatus { id, status })
                .await?
            else {
                return Err(CliError::Internal("expected a reservation result".into()));
            };

            let out = output::render_single(&global.output, &reservation, detail, |r| {
                r.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            output::notice(global, &format!("Reservation marked {status}"));
            if let Some(slot_id) = released_slot {
                output::notice(global, &format!("Slot {slot_id} is available again"));
            }
            Ok(())
        }
    }
}
