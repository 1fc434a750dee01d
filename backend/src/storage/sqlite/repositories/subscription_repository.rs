use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use crate::storage::sqlite::connection::DbConnection;
use crate::storage::SubscriptionStorage;
use shared::Subscription;

/// Read-only repository for subscriptions.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: DbConnection,
}

impl SubscriptionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStorage for SubscriptionRepository {
    async fn find_active_by_plate(
        &self,
        license_plate: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Subscription>> {
        let row = sqlx::query(
            r#"
            SELECT id, license_plate, start_date, end_date, active
            FROM subscriptions
            WHERE license_plate = ? AND active = TRUE
              AND start_date <= ? AND end_date >= ?
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(license_plate)
        .bind(as_of)
        .bind(as_of)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(Subscription {
                id: r.get("id"),
                license_plate: r.get("license_plate"),
                start_date: r.get("start_date"),
                end_date: r.get("end_date"),
                active: r.get("active"),
            })),
            None => Ok(None),
        }
    }
}
