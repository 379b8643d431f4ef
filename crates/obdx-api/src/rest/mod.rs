// PostgREST surface of the hosted store.
//
// `client` owns transport mechanics; the table modules add inherent
// methods on `RestClient` per table.

mod client;
pub mod models;
mod reservations;
mod slots;
mod tickets;

pub use client::RestClient;
pub use slots::SlotQuery;
