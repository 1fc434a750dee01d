//! # carpark-backend
//!
//! Ticket lifecycle and billing engine for a vehicle parking facility.
//!
//! Operators register vehicle entries and exits; guests are billed by
//! elapsed time against the active rate for their vehicle class, while
//! subscription holders park free. The engine owns the ticket state
//! machine, fee calculation, folio allocation, and shift totals, and is
//! designed to stay correct when several operator terminals hit the same
//! store at once.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! ```text
//! Caller (UI, CLI, or service layer; not part of this crate)
//!     ↓
//! Domain Layer (services, billing rules, state machine)
//!     ↓
//! Storage Layer (repository traits, SQLite implementation)
//! ```
//!
//! Construction is explicit: the caller builds a [`DbConnection`] and hands
//! it to [`initialize_backend`]; there is no process-wide singleton.

pub mod domain;
pub mod storage;

use log::info;
use std::sync::Arc;

pub use domain::*;
pub use storage::*;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub ticket_service: TicketService,
    pub shift_service: ShiftService,
    pub subscription_service: SubscriptionService,
    pub operator_service: OperatorService,
}

/// Wire the SQLite repositories into the domain services.
pub fn initialize_backend(db: DbConnection) -> AppState {
    info!("Setting up repositories");
    let ticket_repository = Arc::new(TicketRepository::new(db.clone()));
    let payment_repository = Arc::new(PaymentRepository::new(db.clone()));
    let rate_repository = Arc::new(RateRepository::new(db.clone()));
    let subscription_repository = Arc::new(SubscriptionRepository::new(db.clone()));
    let shift_repository = Arc::new(ShiftRepository::new(db.clone()));
    let operator_repository = Arc::new(OperatorRepository::new(db));

    info!("Setting up domain services");
    let rate_calculator = RateCalculatorService::new(rate_repository);
    let subscription_service = SubscriptionService::new(subscription_repository);
    let shift_service = ShiftService::new(shift_repository);
    let operator_service = OperatorService::new(operator_repository);
    let ticket_service = TicketService::new(
        ticket_repository,
        payment_repository,
        rate_calculator,
        subscription_service.clone(),
        shift_service.clone(),
    );

    AppState {
        ticket_service,
        shift_service,
        subscription_service,
        operator_service,
    }
}
