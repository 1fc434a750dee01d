use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_decimal, parse_optional_decimal, parse_shift_status};
use crate::storage::sqlite::connection::DbConnection;
use crate::storage::{OpenShiftExists, ShiftStorage};
use shared::{Shift, ShiftStatus};

/// Repository for shift rows and their accumulating totals.
#[derive(Clone)]
pub struct ShiftRepository {
    db: DbConnection,
}

impl ShiftRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn map_row(row: &SqliteRow) -> Result<Shift> {
        Ok(Shift {
            id: row.get("id"),
            operator_id: row.get("operator_id"),
            opening_date: row.get("opening_date"),
            closing_date: row.get("closing_date"),
            opening_cash: parse_decimal(&row.get::<String, _>("opening_cash"), "opening_cash")?,
            closing_cash: parse_optional_decimal(row.get("closing_cash"), "closing_cash")?,
            total_revenue: parse_decimal(
                &row.get::<String, _>("total_revenue"),
                "total_revenue",
            )?,
            total_tickets: row.get("total_tickets"),
            status: parse_shift_status(&row.get::<String, _>("status"))?,
        })
    }
}

fn is_open_shift_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
                && db.message().contains("operator_id")
        }
        _ => false,
    }
}

#[async_trait]
impl ShiftStorage for ShiftRepository {
    async fn insert_shift(
        &self,
        operator_id: i64,
        opening_cash: Decimal,
        opening_date: DateTime<Utc>,
    ) -> Result<Shift> {
        let result = sqlx::query(
            r#"
            INSERT INTO shifts (operator_id, opening_date, opening_cash, status)
            VALUES (?, ?, ?, 'OPEN')
            RETURNING id
            "#,
        )
        .bind(operator_id)
        .bind(opening_date)
        .bind(opening_cash.to_string())
        .fetch_one(self.db.pool())
        .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_open_shift_conflict(&e) => {
                return Err(anyhow::Error::new(OpenShiftExists { operator_id }))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Shift {
            id: row.get("id"),
            operator_id,
            opening_date,
            closing_date: None,
            opening_cash,
            closing_cash: None,
            total_revenue: Decimal::ZERO,
            total_tickets: 0,
            status: ShiftStatus::Open,
        })
    }

    async fn find_open_by_operator(&self, operator_id: i64) -> Result<Option<Shift>> {
        let row = sqlx::query(
            r#"
            SELECT id, operator_id, opening_date, closing_date, opening_cash, closing_cash,
                   total_revenue, total_tickets, status
            FROM shifts
            WHERE operator_id = ? AND status = 'OPEN'
            "#,
        )
        .bind(operator_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn find_by_id(&self, shift_id: i64) -> Result<Option<Shift>> {
        let row = sqlx::query(
            r#"
            SELECT id, operator_id, opening_date, closing_date, opening_cash, closing_cash,
                   total_revenue, total_tickets, status
            FROM shifts
            WHERE id = ?
            "#,
        )
        .bind(shift_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn add_ticket_revenue(&self, operator_id: i64, amount: Decimal) -> Result<()> {
        // Totals are TEXT for decimal exactness, so the increment is a
        // read-modify-write inside one transaction rather than SQL addition.
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, total_revenue, total_tickets
            FROM shifts
            WHERE operator_id = ? AND status = 'OPEN'
            "#,
        )
        .bind(operator_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            // No open shift for this operator; nothing to accumulate into
            return Ok(());
        };

        let shift_id: i64 = row.get("id");
        let total_revenue =
            parse_decimal(&row.get::<String, _>("total_revenue"), "total_revenue")?;
        let total_tickets: i64 = row.get("total_tickets");

        sqlx::query(
            r#"
            UPDATE shifts SET total_revenue = ?, total_tickets = ?
            WHERE id = ?
            "#,
        )
        .bind((total_revenue + amount).to_string())
        .bind(total_tickets + 1)
        .bind(shift_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn close_shift(
        &self,
        shift_id: i64,
        closing_cash: Decimal,
        closing_date: DateTime<Utc>,
    ) -> Result<Option<Shift>> {
        let updated = sqlx::query(
            r#"
            UPDATE shifts
            SET closing_date = ?, closing_cash = ?, status = 'CLOSED'
            WHERE id = ? AND status = 'OPEN'
            "#,
        )
        .bind(closing_date)
        .bind(closing_cash.to_string())
        .bind(shift_id)
        .execute(self.db.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(shift_id).await
    }
}
