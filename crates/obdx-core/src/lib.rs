//! Appointment slot scheduling for the OBDExpress mobile diagnostic service.
//!
//! This crate owns the domain model and every rule about who may hold a
//! slot:
//!
//! - **[`Scheduler`]**: facade over an injected [`Store`]. Serves the
//!   availability [calendar](Scheduler::calendar), runs the
//!   [booking transaction](Scheduler::book), routes administrator
//!   [`Command`]s and runs the [reconciliation pass](Scheduler::reconcile),
//!   optionally on a background timer.
//!
//! - **[`Store`]**: the persistence boundary. Its conditional slot write is
//!   the only mutual exclusion between concurrent bookings. [`RemoteStore`]
//!   talks to the hosted store through `obdx-api`; [`MemoryStore`] keeps
//!   everything in a sharded map and can script failures for tests.
//!
//! - **Domain model** ([`model`]): slots with their `available` /
//!   `reserved` / `blocked` state machine, reservations with a single status
//!   vocabulary, and support tickets.

pub mod booking;
pub mod calendar;
pub mod command;
pub mod config;
mod convert;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod scheduler;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use booking::{BookingConfirmation, BookingRequest};
pub use calendar::{Actor, CalendarQuery};
pub use command::{Command, CommandResult};
pub use config::{
    CancelledRule, ExpiryRules, PastSlotRule, PriceTable, SchedulerConfig, StoreConfig,
    TlsVerification,
};
pub use error::CoreError;
pub use reconcile::{Finding, ReconcileReport};
pub use scheduler::{DashboardStats, Scheduler};
pub use store::{
    ConditionalOutcome, DeleteOutcome, MemoryStore, Precondition, RemoteStore, SlotChange,
    SlotEdit, SlotFilter, Store, StoreError,
};

pub use model::{
    Address, Contact, IdempotencyKey, NewSlot, NewTicket, Price, Reservation, ReservationDetails,
    ReservationId, ReservationStatus, Slot, SlotId, SlotStatus, SupportTicket, TicketId,
    TicketStatus, TimeWindow, Vehicle,
};
