use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use super::parse_decimal;
use crate::storage::sqlite::connection::DbConnection;
use crate::storage::PaymentStorage;
use shared::Payment;

/// Repository for payment lookups. Payment rows are written inside the
/// exit transaction owned by the ticket repository.
#[derive(Clone)]
pub struct PaymentRepository {
    db: DbConnection,
}

impl PaymentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentStorage for PaymentRepository {
    async fn find_by_ticket(&self, ticket_id: i64) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, ticket_id, amount, method, payment_date, operator_id
            FROM payments
            WHERE ticket_id = ?
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(Payment {
                id: r.get("id"),
                ticket_id: r.get("ticket_id"),
                amount: parse_decimal(&r.get::<String, _>("amount"), "amount")?,
                method: r.get("method"),
                payment_date: r.get("payment_date"),
                operator_id: r.get("operator_id"),
            })),
            None => Ok(None),
        }
    }
}
