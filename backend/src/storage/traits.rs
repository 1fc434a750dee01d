//! Storage abstraction traits for the parking backend.
//!
//! The domain layer talks to persistence only through these traits, so a
//! different backing store can be swapped in without touching the billing
//! rules. Implementations own their timeouts and transient-failure
//! handling; the domain treats every error here as opaque.
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    NewPayment, NewTicket, Operator, Payment, Rate, Shift, Subscription, Ticket, TicketExit,
    VehicleType,
};

/// Insert was rejected by the one-open-ticket-per-plate uniqueness rule.
///
/// Raised by `TicketStorage::insert_ticket` so callers can tell an entry
/// race apart from ordinary store trouble.
#[derive(Debug, thiserror::Error)]
#[error("an open ticket already exists for plate {plate}")]
pub struct OpenTicketExists {
    pub plate: String,
}

/// Insert was rejected by the one-open-shift-per-operator uniqueness rule.
#[derive(Debug, thiserror::Error)]
#[error("operator {operator_id} already has an open shift")]
pub struct OpenShiftExists {
    pub operator_id: i64,
}

/// Ticket persistence, including folio allocation.
#[async_trait]
pub trait TicketStorage: Send + Sync {
    /// Persist a new open ticket and return it with its assigned id.
    /// Fails with [`OpenTicketExists`] when the plate already has an open
    /// ticket; this check-and-insert is atomic in the store.
    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<Ticket>;

    /// The open ticket for a plate, if any. At most one can exist.
    async fn find_open_by_plate(&self, license_plate: &str) -> Result<Option<Ticket>>;

    async fn find_by_id(&self, ticket_id: i64) -> Result<Option<Ticket>>;

    /// All open tickets, most recent entry first.
    async fn list_open(&self) -> Result<Vec<Ticket>>;

    /// Close an open ticket and, when given, record its payment in the same
    /// transaction. Both writes succeed or neither does.
    async fn record_exit(
        &self,
        ticket_id: i64,
        exit: &TicketExit,
        payment: Option<&NewPayment>,
    ) -> Result<Ticket>;

    /// Allocate the next folio number. Allocations are strictly increasing,
    /// distinct under concurrent callers, and never reissued; numbers lost
    /// to failed entries stay gaps.
    async fn next_folio_number(&self) -> Result<i64>;
}

/// Payment lookups. Payments are written by `TicketStorage::record_exit`.
#[async_trait]
pub trait PaymentStorage: Send + Sync {
    async fn find_by_ticket(&self, ticket_id: i64) -> Result<Option<Payment>>;
}

/// Read access to the pricing policy.
#[async_trait]
pub trait RateStorage: Send + Sync {
    /// The single active rate for a vehicle class, if configured.
    async fn find_active_by_vehicle_type(&self, vehicle_type: VehicleType)
        -> Result<Option<Rate>>;
}

/// Read access to subscriptions.
#[async_trait]
pub trait SubscriptionStorage: Send + Sync {
    /// An active subscription for the plate whose date range contains
    /// `as_of` (bounds inclusive), if any.
    async fn find_active_by_plate(
        &self,
        license_plate: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Subscription>>;
}

/// Shift persistence and the accumulating totals.
#[async_trait]
pub trait ShiftStorage: Send + Sync {
    /// Open a shift for an operator. Fails with [`OpenShiftExists`] when the
    /// operator already has one open.
    async fn insert_shift(
        &self,
        operator_id: i64,
        opening_cash: Decimal,
        opening_date: DateTime<Utc>,
    ) -> Result<Shift>;

    async fn find_open_by_operator(&self, operator_id: i64) -> Result<Option<Shift>>;

    async fn find_by_id(&self, shift_id: i64) -> Result<Option<Shift>>;

    /// Atomically add one ticket and `amount` to the operator's open shift.
    /// Does nothing when the operator has no open shift.
    async fn add_ticket_revenue(&self, operator_id: i64, amount: Decimal) -> Result<()>;

    /// Close an open shift, freezing its totals. Returns `None` when the
    /// shift does not exist or is not open.
    async fn close_shift(
        &self,
        shift_id: i64,
        closing_cash: Decimal,
        closing_date: DateTime<Utc>,
    ) -> Result<Option<Shift>>;
}

/// Operator account lookups.
#[async_trait]
pub trait OperatorStorage: Send + Sync {
    /// The operator matching both username and password, if any. Active
    /// status is the caller's concern.
    async fn find_by_credentials(&self, username: &str, password: &str)
        -> Result<Option<Operator>>;
}
