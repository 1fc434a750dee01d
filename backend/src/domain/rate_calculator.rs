//! Fee calculation for guest stays.
//!
//! The billing rule: a stay within the grace period costs nothing; once a
//! stay exceeds it, every started hour of the *entire* stay is billed: an
//! 80-minute stay with a 30-minute grace bills 2 hours, not 1. The grace
//! period is a cutoff, never a deduction. A configured daily cap bounds the
//! final amount.
use crate::domain::errors::EngineError;
use crate::storage::RateStorage;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::{Rate, VehicleType};
use std::sync::Arc;

/// Charge for a stay of `elapsed_minutes` under `rate`.
///
/// Pure: no clock, no store. Zero or negative elapsed time is free.
pub fn compute_amount(elapsed_minutes: i64, rate: &Rate) -> Decimal {
    if is_within_grace(elapsed_minutes, rate) {
        return Decimal::ZERO;
    }

    // Started hours over the total stay, not the post-grace remainder.
    let billable_hours = (elapsed_minutes + 59) / 60;
    let mut amount = Decimal::from(billable_hours) * rate.hourly_rate;

    if let Some(cap) = rate.daily_cap {
        if amount > cap {
            amount = cap;
        }
    }

    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether a stay of `elapsed_minutes` is still free under `rate`.
pub fn is_within_grace(elapsed_minutes: i64, rate: &Rate) -> bool {
    elapsed_minutes <= rate.grace_period_minutes
}

/// Looks up the active rate for a vehicle class and applies the fee rule.
#[derive(Clone)]
pub struct RateCalculatorService {
    rate_repository: Arc<dyn RateStorage>,
}

impl RateCalculatorService {
    pub fn new(rate_repository: Arc<dyn RateStorage>) -> Self {
        Self { rate_repository }
    }

    /// Active rate for `vehicle_type`, or `RateUnavailable` when pricing is
    /// not configured. Billing never invents a price.
    pub async fn active_rate(&self, vehicle_type: VehicleType) -> Result<Rate, EngineError> {
        self.rate_repository
            .find_active_by_vehicle_type(vehicle_type)
            .await?
            .ok_or(EngineError::RateUnavailable(vehicle_type))
    }

    /// Charge for a guest stay of `elapsed_minutes`.
    pub async fn amount_for_stay(
        &self,
        elapsed_minutes: i64,
        vehicle_type: VehicleType,
    ) -> Result<Decimal, EngineError> {
        let rate = self.active_rate(vehicle_type).await?;
        Ok(compute_amount(elapsed_minutes, &rate))
    }

    /// Grace check against the active rate, for callers that only need the
    /// boolean.
    pub async fn is_within_grace(
        &self,
        elapsed_minutes: i64,
        vehicle_type: VehicleType,
    ) -> Result<bool, EngineError> {
        let rate = self.active_rate(vehicle_type).await?;
        Ok(is_within_grace(elapsed_minutes, &rate))
    }
}
