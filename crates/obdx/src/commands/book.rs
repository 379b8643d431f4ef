//! `obdx book`: the customer booking flow, driven by an operator.

use obdx_core::{
    Address, BookingConfirmation, BookingRequest, Contact, IdempotencyKey, Price, RemoteStore,
    ReservationDetails, Scheduler, Vehicle,
};

use crate::cli::{BookArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(c: &BookingConfirmation) -> String {
    [
        format!("Reservation: {}", c.reservation_id),
        format!("Slot:        {}", c.slot_id),
        format!("Start:       {}", output::timestamp(c.window.start())),
        format!("End:         {}", output::timestamp(c.window.end())),
        format!("Price:       {} EUR", c.price),
    ]
    .join("\n")
}

pub async fn handle(
    scheduler: &Scheduler<RemoteStore>,
    args: BookArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let key = match args.idempotency_key {
        Some(ref raw) => IdempotencyKey::new(raw.as_str())?,
        None => IdempotencyKey::generate(),
    };

    let price = match args.price {
        Some(ref raw) => parse_price(raw)?,
        None => scheduler.config().pricing.price_for(&args.city),
    };

    let request = BookingRequest {
        slot_id: util::parse_id(&args.slot)?,
        details: details(args, price),
        idempotency_key: key.clone(),
    };

    let confirmation = match scheduler.book(request).await {
        Ok(c) => c,
        Err(err) => {
            // The key is what makes a retry safe; surface it whenever the
            // outcome is not final.
            if err.is_retryable() || matches!(err, obdx_core::CoreError::PartialFailure { .. }) {
                output::caution(
                    global,
                    &format!("retry with --idempotency-key {}", key.as_str()),
                );
            }
            return Err(err.into());
        }
    };

    let out = output::render_single(&global.output, &confirmation, detail, |c| {
        c.reservation_id.to_string()
    })?;
    output::print_output(&out, global.quiet);

    if confirmation.replayed {
        output::notice(global, "Booking already recorded for this key");
    } else {
        output::notice(global, "Slot booked");
    }
    Ok(())
}

fn details(args: BookArgs, price: Price) -> ReservationDetails {
    ReservationDetails {
        contact: Contact {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            phone: args.phone,
        },
        address: Address {
            street: args.street,
            city: args.city,
            postal_code: args.postal_code,
        },
        vehicle: Vehicle {
            make: args.make,
            model: args.model,
            year: args.year,
            vin: args.vin,
        },
        service: args.service,
        price,
        notes: args.notes,
    }
}

fn parse_price(raw: &str) -> Result<Price, CliError> {
    let price: Price = raw
        .parse()
        .map_err(|_| CliError::validation("price", format!("'{raw}' is not an amount")))?;
    if price.is_zero() {
        return Err(CliError::validation("price", "must be greater than zero"));
    }
    Ok(price)
}
