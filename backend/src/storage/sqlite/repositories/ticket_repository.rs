use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_customer_type, parse_decimal, parse_ticket_status, parse_vehicle_type};
use crate::storage::sqlite::connection::DbConnection;
use crate::storage::{OpenTicketExists, TicketStorage};
use shared::{NewPayment, NewTicket, Ticket, TicketExit, TicketStatus};

/// Repository for ticket operations, including folio allocation.
#[derive(Clone)]
pub struct TicketRepository {
    db: DbConnection,
}

impl TicketRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn map_row(row: &SqliteRow) -> Result<Ticket> {
        Ok(Ticket {
            id: row.get("id"),
            folio: row.get("folio"),
            license_plate: row.get("license_plate"),
            customer_type: parse_customer_type(&row.get::<String, _>("customer_type"))?,
            vehicle_type: parse_vehicle_type(&row.get::<String, _>("vehicle_type"))?,
            entry_date: row.get("entry_date"),
            exit_date: row.get("exit_date"),
            entry_operator_id: row.get("entry_operator_id"),
            exit_operator_id: row.get("exit_operator_id"),
            status: parse_ticket_status(&row.get::<String, _>("status"))?,
            amount_charged: parse_decimal(
                &row.get::<String, _>("amount_charged"),
                "amount_charged",
            )?,
        })
    }
}

/// Whether the insert tripped the one-open-ticket-per-plate unique index
/// (and not some other constraint, like the folio uniqueness).
fn is_open_plate_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
                && db.message().contains("license_plate")
        }
        _ => false,
    }
}

#[async_trait]
impl TicketStorage for TicketRepository {
    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<Ticket> {
        let result = sqlx::query(
            r#"
            INSERT INTO tickets (folio, license_plate, customer_type, vehicle_type,
                                 entry_date, entry_operator_id, status, amount_charged)
            VALUES (?, ?, ?, ?, ?, ?, 'OPEN', '0')
            RETURNING id
            "#,
        )
        .bind(&ticket.folio)
        .bind(&ticket.license_plate)
        .bind(ticket.customer_type.as_str())
        .bind(ticket.vehicle_type.as_str())
        .bind(ticket.entry_date)
        .bind(ticket.entry_operator_id)
        .fetch_one(self.db.pool())
        .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_open_plate_conflict(&e) => {
                return Err(anyhow::Error::new(OpenTicketExists {
                    plate: ticket.license_plate.clone(),
                }))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Ticket {
            id: row.get("id"),
            folio: ticket.folio.clone(),
            license_plate: ticket.license_plate.clone(),
            customer_type: ticket.customer_type,
            vehicle_type: ticket.vehicle_type,
            entry_date: ticket.entry_date,
            exit_date: None,
            entry_operator_id: ticket.entry_operator_id,
            exit_operator_id: None,
            status: TicketStatus::Open,
            amount_charged: rust_decimal::Decimal::ZERO,
        })
    }

    async fn find_open_by_plate(&self, license_plate: &str) -> Result<Option<Ticket>> {
        let row = sqlx::query(
            r#"
            SELECT id, folio, license_plate, customer_type, vehicle_type, entry_date,
                   exit_date, entry_operator_id, exit_operator_id, status, amount_charged
            FROM tickets
            WHERE license_plate = ? AND status = 'OPEN'
            "#,
        )
        .bind(license_plate)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn find_by_id(&self, ticket_id: i64) -> Result<Option<Ticket>> {
        let row = sqlx::query(
            r#"
            SELECT id, folio, license_plate, customer_type, vehicle_type, entry_date,
                   exit_date, entry_operator_id, exit_operator_id, status, amount_charged
            FROM tickets
            WHERE id = ?
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list_open(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r#"
            SELECT id, folio, license_plate, customer_type, vehicle_type, entry_date,
                   exit_date, entry_operator_id, exit_operator_id, status, amount_charged
            FROM tickets
            WHERE status = 'OPEN'
            ORDER BY entry_date DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn record_exit(
        &self,
        ticket_id: i64,
        exit: &TicketExit,
        payment: Option<&NewPayment>,
    ) -> Result<Ticket> {
        // Closing update and payment insert commit together or not at all
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE tickets
            SET exit_date = ?, exit_operator_id = ?, status = 'CLOSED', amount_charged = ?
            WHERE id = ? AND status = 'OPEN'
            "#,
        )
        .bind(exit.exit_date)
        .bind(exit.exit_operator_id)
        .bind(exit.amount_charged.to_string())
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            bail!("ticket {ticket_id} is not open");
        }

        if let Some(payment) = payment {
            sqlx::query(
                r#"
                INSERT INTO payments (ticket_id, amount, method, payment_date, operator_id)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(payment.ticket_id)
            .bind(payment.amount.to_string())
            .bind(&payment.method)
            .bind(payment.payment_date)
            .bind(payment.operator_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query(
            r#"
            SELECT id, folio, license_plate, customer_type, vehicle_type, entry_date,
                   exit_date, entry_operator_id, exit_operator_id, status, amount_charged
            FROM tickets
            WHERE id = ?
            "#,
        )
        .bind(ticket_id)
        .fetch_one(&mut *tx)
        .await?;
        let ticket = Self::map_row(&row)?;

        tx.commit().await?;
        Ok(ticket)
    }

    async fn next_folio_number(&self) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE folio_sequence SET value = value + 1 WHERE id = 1
            RETURNING value
            "#,
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("value"))
    }
}
