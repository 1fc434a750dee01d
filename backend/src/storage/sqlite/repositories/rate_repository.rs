use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use super::{parse_decimal, parse_optional_decimal, parse_vehicle_type};
use crate::storage::sqlite::connection::DbConnection;
use crate::storage::RateStorage;
use shared::{Rate, VehicleType};

/// Read-only repository for the pricing policy.
#[derive(Clone)]
pub struct RateRepository {
    db: DbConnection,
}

impl RateRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateStorage for RateRepository {
    async fn find_active_by_vehicle_type(
        &self,
        vehicle_type: VehicleType,
    ) -> Result<Option<Rate>> {
        let row = sqlx::query(
            r#"
            SELECT id, vehicle_type, hourly_rate, grace_period_minutes, daily_cap, active
            FROM rates
            WHERE vehicle_type = ? AND active = TRUE
            "#,
        )
        .bind(vehicle_type.as_str())
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(Rate {
                id: r.get("id"),
                vehicle_type: parse_vehicle_type(&r.get::<String, _>("vehicle_type"))?,
                hourly_rate: parse_decimal(&r.get::<String, _>("hourly_rate"), "hourly_rate")?,
                grace_period_minutes: r.get("grace_period_minutes"),
                daily_cap: parse_optional_decimal(r.get("daily_cap"), "daily_cap")?,
                active: r.get("active"),
            })),
            None => Ok(None),
        }
    }
}
