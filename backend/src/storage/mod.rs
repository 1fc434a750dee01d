//! # Storage Module
//!
//! Persistence for the parking backend: the repository traits the domain
//! layer depends on, and the SQLite implementation behind them.
pub mod sqlite;
pub mod traits;

pub use sqlite::*;
pub use traits::*;
