//! Subscription validity checks used by the entry flow.
use crate::domain::errors::EngineError;
use crate::storage::SubscriptionStorage;
use chrono::NaiveDate;
use shared::Subscription;
use std::sync::Arc;

/// Answers whether a plate currently holds a valid, date-bounded
/// subscription. Subscription lifecycle is managed elsewhere; this service
/// only reads.
#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repository: Arc<dyn SubscriptionStorage>,
}

impl SubscriptionService {
    pub fn new(subscription_repository: Arc<dyn SubscriptionStorage>) -> Self {
        Self { subscription_repository }
    }

    /// The subscription entitling `plate` to enter on `as_of`, if any.
    pub async fn active_subscription(
        &self,
        plate: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Subscription>, EngineError> {
        let candidate = self
            .subscription_repository
            .find_active_by_plate(plate, as_of)
            .await?;
        // covers() is authoritative even if a backend returns broader candidates
        Ok(candidate.filter(|s| s.covers(as_of)))
    }

    /// True iff `plate` holds a subscription valid on `as_of`, bounds
    /// inclusive.
    pub async fn is_valid_for_entry(
        &self,
        plate: &str,
        as_of: NaiveDate,
    ) -> Result<bool, EngineError> {
        Ok(self.active_subscription(plate, as_of).await?.is_some())
    }
}
