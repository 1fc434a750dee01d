//! Typed failures returned by the engine services.
use shared::VehicleType;

/// Everything an entry, exit, billing, or shift operation can fail with.
///
/// Failures are returned to the immediate caller; the engine never retries
/// on its own. Repository failures stay opaque and wrap whatever the
/// storage layer reported.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("vehicle {0} already has an open ticket")]
    DuplicateOpenTicket(String),

    #[error("no open ticket found for plate {0}")]
    NoOpenTicket(String),

    #[error("no active rate configured for vehicle type {}", .0.as_str())]
    RateUnavailable(VehicleType),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}
