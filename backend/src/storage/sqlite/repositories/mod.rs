//! SQLite repository implementations, one per aggregate.
use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use shared::{CustomerType, ShiftStatus, TicketStatus, VehicleType};

pub mod operator_repository;
pub mod payment_repository;
pub mod rate_repository;
pub mod shift_repository;
pub mod subscription_repository;
pub mod ticket_repository;

pub use operator_repository::OperatorRepository;
pub use payment_repository::PaymentRepository;
pub use rate_repository::RateRepository;
pub use shift_repository::ShiftRepository;
pub use subscription_repository::SubscriptionRepository;
pub use ticket_repository::TicketRepository;

// Currency columns are stored as TEXT; parse failures mean a corrupt row
// and surface as repository errors.
pub(crate) fn parse_decimal(raw: &str, column: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("invalid decimal in column {column}: {raw:?}"))
}

pub(crate) fn parse_optional_decimal(raw: Option<String>, column: &str) -> Result<Option<Decimal>> {
    raw.as_deref().map(|s| parse_decimal(s, column)).transpose()
}

pub(crate) fn parse_vehicle_type(raw: &str) -> Result<VehicleType> {
    VehicleType::parse(raw).ok_or_else(|| anyhow!("unknown vehicle type: {raw:?}"))
}

pub(crate) fn parse_customer_type(raw: &str) -> Result<CustomerType> {
    CustomerType::parse(raw).ok_or_else(|| anyhow!("unknown customer type: {raw:?}"))
}

pub(crate) fn parse_ticket_status(raw: &str) -> Result<TicketStatus> {
    TicketStatus::parse(raw).ok_or_else(|| anyhow!("unknown ticket status: {raw:?}"))
}

pub(crate) fn parse_shift_status(raw: &str) -> Result<ShiftStatus> {
    ShiftStatus::parse(raw).ok_or_else(|| anyhow!("unknown shift status: {raw:?}"))
}
