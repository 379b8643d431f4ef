// obdx-api: Async Rust client for the OBDExpress hosted data store (PostgREST)

pub mod error;
pub mod rest;
pub mod transport;

pub use error::Error;
pub use rest::RestClient;
pub use rest::models;
pub use transport::{TlsMode, TransportConfig};
