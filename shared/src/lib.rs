use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single parking stay, from vehicle entry to vehicle exit.
///
/// A ticket is created with status `Open` when a vehicle enters and is
/// closed exactly once when it exits. For a given license plate at most one
/// ticket may be open at any time; the storage layer enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    /// Human-readable sequential receipt identifier (e.g. "TKT-000042")
    pub folio: String,
    /// Normalized (trimmed, uppercase) license plate
    pub license_plate: String,
    pub customer_type: CustomerType,
    pub vehicle_type: VehicleType,
    pub entry_date: DateTime<Utc>,
    /// Absent while the ticket is open
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_operator_id: i64,
    /// Absent while the ticket is open
    pub exit_operator_id: Option<i64>,
    pub status: TicketStatus,
    /// Zero until the ticket is closed; stays zero for subscription holders
    pub amount_charged: Decimal,
}

impl Ticket {
    /// Whole minutes between entry and `as_of`, truncated toward zero.
    pub fn minutes_since_entry(&self, as_of: DateTime<Utc>) -> i64 {
        (as_of - self.entry_date).num_minutes()
    }
}

/// Fields written by the entry operation when a ticket is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub folio: String,
    pub license_plate: String,
    pub customer_type: CustomerType,
    pub vehicle_type: VehicleType,
    pub entry_date: DateTime<Utc>,
    pub entry_operator_id: i64,
}

/// Fields written at closure; the only mutation a ticket ever sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketExit {
    pub exit_date: DateTime<Utc>,
    pub exit_operator_id: i64,
    pub amount_charged: Decimal,
}

/// Ticket lifecycle states. `Open` is initial, `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<TicketStatus> {
        match s {
            "OPEN" => Some(TicketStatus::Open),
            "CLOSED" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

/// How a stay is billed: guests pay by elapsed time, subscription holders
/// are covered by their subscription and pay nothing per stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerType {
    Guest,
    Subscription,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Guest => "GUEST",
            CustomerType::Subscription => "SUBSCRIPTION",
        }
    }

    pub fn parse(s: &str) -> Option<CustomerType> {
        match s {
            "GUEST" => Some(CustomerType::Guest),
            "SUBSCRIPTION" => Some(CustomerType::Subscription),
            _ => None,
        }
    }
}

/// Vehicle class, derived from the plate format at entry. Pricing is
/// configured per vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    Motorcycle,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "CAR",
            VehicleType::Motorcycle => "MOTORCYCLE",
        }
    }

    pub fn parse(s: &str) -> Option<VehicleType> {
        match s {
            "CAR" => Some(VehicleType::Car),
            "MOTORCYCLE" => Some(VehicleType::Motorcycle),
            _ => None,
        }
    }
}

/// Pricing policy for a vehicle class. At most one rate is active per
/// vehicle class at a time; billing always uses the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: i64,
    pub vehicle_type: VehicleType,
    /// Price per billable hour, 2 decimal places
    pub hourly_rate: Decimal,
    /// Initial minutes of a stay exempt from billing
    pub grace_period_minutes: i64,
    /// Maximum chargeable amount for a single stay, if configured
    pub daily_cap: Option<Decimal>,
    pub active: bool,
}

/// A date-bounded entitlement tied to a license plate. Holders follow the
/// normal ticket lifecycle but are exempt from per-stay billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub license_plate: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
}

impl Subscription {
    /// Whether this subscription entitles entry on `date` (bounds inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.active && self.start_date <= date && date <= self.end_date
    }
}

/// One payment per billed exit. Never created for zero-charge exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub ticket_id: i64,
    pub amount: Decimal,
    pub method: String,
    pub payment_date: DateTime<Utc>,
    pub operator_id: i64,
}

/// Payment fields known before the row exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub ticket_id: i64,
    pub amount: Decimal,
    pub method: String,
    pub payment_date: DateTime<Utc>,
    pub operator_id: i64,
}

/// An operator's bounded work session. Billed exits accumulate into the
/// operator's open shift; closing freezes the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: i64,
    pub operator_id: i64,
    pub opening_date: DateTime<Utc>,
    pub closing_date: Option<DateTime<Utc>>,
    pub opening_cash: Decimal,
    pub closing_cash: Option<Decimal>,
    pub total_revenue: Decimal,
    pub total_tickets: i64,
    pub status: ShiftStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftStatus {
    Open,
    Closed,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "OPEN",
            ShiftStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<ShiftStatus> {
        match s {
            "OPEN" => Some(ShiftStatus::Open),
            "CLOSED" => Some(ShiftStatus::Closed),
            _ => None,
        }
    }
}

/// A facility operator account. Credentials are checked by the backend;
/// the password never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterEntryRequest {
    pub license_plate: String,
    /// Caller-supplied vehicle class. The class derived from the plate
    /// format wins whenever the format is recognized.
    pub vehicle_type: Option<VehicleType>,
    pub operator_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessExitRequest {
    pub license_plate: String,
    pub operator_id: i64,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenShiftRequest {
    pub operator_id: i64,
    pub opening_cash: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseShiftRequest {
    pub shift_id: i64,
    pub closing_cash: Decimal,
}

/// Display strings for the closed enumerations.
///
/// Kept apart from the enums themselves so the backend's billing logic
/// never touches presentation text.
pub mod labels {
    use super::{CustomerType, ShiftStatus, TicketStatus, VehicleType};

    pub fn vehicle_type(v: VehicleType) -> &'static str {
        match v {
            VehicleType::Car => "Car",
            VehicleType::Motorcycle => "Motorcycle",
        }
    }

    pub fn customer_type(c: CustomerType) -> &'static str {
        match c {
            CustomerType::Guest => "Guest",
            CustomerType::Subscription => "Subscription",
        }
    }

    pub fn ticket_status(s: TicketStatus) -> &'static str {
        match s {
            TicketStatus::Open => "Open",
            TicketStatus::Closed => "Closed",
        }
    }

    pub fn shift_status(s: ShiftStatus) -> &'static str {
        match s {
            ShiftStatus::Open => "Open",
            ShiftStatus::Closed => "Closed",
        }
    }
}
