//! SQLite-backed storage.
pub mod connection;
pub mod repositories;

pub use connection::DbConnection;
pub use repositories::*;
