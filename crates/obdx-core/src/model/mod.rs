// ── Domain model ──

pub mod ids;
pub mod reservation;
pub mod slot;
pub mod ticket;

pub use ids::{IdempotencyKey, ReservationId, SlotId, TicketId};
pub use reservation::{
    Address, Contact, DEFAULT_SERVICE, Price, Reservation, ReservationDetails, ReservationStatus,
    Vehicle,
};
pub use slot::{NewSlot, Slot, SlotStatus, TimeWindow};
pub use ticket::{NewTicket, SupportTicket, TicketStatus};
