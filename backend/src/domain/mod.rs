//! # Domain Module
//!
//! Business logic for the parking facility backend.
//!
//! This module encapsulates the rules that govern the ticket lifecycle:
//! who may enter, what a stay costs, and how receipts and shift totals
//! stay consistent. It operates against the storage traits only and knows
//! nothing about any UI or wire format.
//!
//! ## Module Organization
//!
//! - **ticket_service**: Entry/exit state machine and billing orchestration
//! - **rate_calculator**: Pure fee computation plus active-rate lookup
//! - **subscription_service**: Date-bounded subscription validity
//! - **shift_service**: Shift lifecycle and running totals
//! - **operator_service**: Credential checks and the per-session operator
//! - **plate**: License plate normalization, validation, classification
//! - **stay_time**: Display formatting for stay durations
//! - **errors**: The typed failure taxonomy shared by the services
//!
//! ## Business Rules
//!
//! - At most one open ticket per plate; the store enforces it at insert
//! - Grace period is a cutoff: past it, every started hour of the whole
//!   stay is billed, bounded by the daily cap
//! - Subscription holders follow the same lifecycle but are never billed
//! - Folios increase strictly and are never reused, gaps included
//! - Closing a ticket and recording its payment is one atomic write

pub mod errors;
pub mod operator_service;
pub mod plate;
pub mod rate_calculator;
pub mod shift_service;
pub mod stay_time;
pub mod subscription_service;
pub mod ticket_service;

pub use errors::EngineError;
pub use operator_service::{OperatorService, OperatorSession};
pub use rate_calculator::RateCalculatorService;
pub use shift_service::ShiftService;
pub use subscription_service::SubscriptionService;
pub use ticket_service::TicketService;
