//! Ticket lifecycle engine: vehicle entry, vehicle exit, billing.
//!
//! A ticket is born `Open` by `register_entry` and reaches its terminal
//! `Closed` state exactly once through `process_exit`. There are no other
//! transitions and no re-opening.
use crate::domain::errors::EngineError;
use crate::domain::rate_calculator::RateCalculatorService;
use crate::domain::shift_service::ShiftService;
use crate::domain::subscription_service::SubscriptionService;
use crate::domain::{plate, stay_time};
use crate::storage::{OpenTicketExists, PaymentStorage, TicketStorage};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use shared::{
    CustomerType, NewPayment, NewTicket, Payment, ProcessExitRequest, RegisterEntryRequest,
    Ticket, TicketExit, VehicleType,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct TicketService {
    ticket_repository: Arc<dyn TicketStorage>,
    payment_repository: Arc<dyn PaymentStorage>,
    rate_calculator: RateCalculatorService,
    subscription_service: SubscriptionService,
    shift_service: ShiftService,
}

impl TicketService {
    pub fn new(
        ticket_repository: Arc<dyn TicketStorage>,
        payment_repository: Arc<dyn PaymentStorage>,
        rate_calculator: RateCalculatorService,
        subscription_service: SubscriptionService,
        shift_service: ShiftService,
    ) -> Self {
        Self {
            ticket_repository,
            payment_repository,
            rate_calculator,
            subscription_service,
            shift_service,
        }
    }

    /// Register a vehicle entry and create its open ticket.
    ///
    /// The vehicle class derived from the plate format wins over a
    /// caller-supplied one; an unrecognized format falls back to the caller
    /// value and then to `Car`. The folio is allocated before the insert and
    /// is never reused, even if the insert fails.
    pub async fn register_entry(
        &self,
        request: RegisterEntryRequest,
    ) -> Result<Ticket, EngineError> {
        let license_plate = plate::normalize(&request.license_plate);

        // Fast feedback for the common case. The unique index behind
        // insert_ticket stays the authority under concurrent entries.
        if self
            .ticket_repository
            .find_open_by_plate(&license_plate)
            .await?
            .is_some()
        {
            return Err(EngineError::DuplicateOpenTicket(license_plate));
        }

        let vehicle_type = plate::classify(&license_plate)
            .or(request.vehicle_type)
            .unwrap_or(VehicleType::Car);

        let customer_type = if self
            .subscription_service
            .is_valid_for_entry(&license_plate, Utc::now().date_naive())
            .await?
        {
            CustomerType::Subscription
        } else {
            CustomerType::Guest
        };

        let folio_number = self.ticket_repository.next_folio_number().await?;
        let new_ticket = NewTicket {
            folio: format!("TKT-{:06}", folio_number),
            license_plate: license_plate.clone(),
            customer_type,
            vehicle_type,
            entry_date: Utc::now(),
            entry_operator_id: request.operator_id,
        };

        match self.ticket_repository.insert_ticket(&new_ticket).await {
            Ok(ticket) => {
                info!(
                    "entry registered: {} plate {} ({})",
                    ticket.folio,
                    ticket.license_plate,
                    ticket.customer_type.as_str()
                );
                Ok(ticket)
            }
            Err(e) => match e.downcast::<OpenTicketExists>() {
                Ok(dup) => Err(EngineError::DuplicateOpenTicket(dup.plate)),
                Err(other) => Err(other.into()),
            },
        }
    }

    /// Process a vehicle exit: compute the charge, close the ticket, record
    /// the payment, and feed the operator's shift totals.
    ///
    /// The closing update and the payment insert share one transaction, so a
    /// closed ticket with a missing billing record cannot occur. Shift
    /// bookkeeping runs after the commit and never blocks billing.
    pub async fn process_exit(&self, request: ProcessExitRequest) -> Result<Ticket, EngineError> {
        let license_plate = plate::normalize(&request.license_plate);

        let ticket = self
            .ticket_repository
            .find_open_by_plate(&license_plate)
            .await?
            .ok_or_else(|| EngineError::NoOpenTicket(license_plate.clone()))?;

        let exit_date = Utc::now();
        let elapsed_minutes = ticket.minutes_since_entry(exit_date);

        let amount_charged = match ticket.customer_type {
            CustomerType::Subscription => Decimal::ZERO,
            CustomerType::Guest => {
                self.rate_calculator
                    .amount_for_stay(elapsed_minutes, ticket.vehicle_type)
                    .await?
            }
        };

        let payment = (amount_charged > Decimal::ZERO).then(|| NewPayment {
            ticket_id: ticket.id,
            amount: amount_charged,
            method: request.payment_method.clone(),
            payment_date: exit_date,
            operator_id: request.operator_id,
        });

        let exit = TicketExit {
            exit_date,
            exit_operator_id: request.operator_id,
            amount_charged,
        };
        let closed = self
            .ticket_repository
            .record_exit(ticket.id, &exit, payment.as_ref())
            .await?;

        info!(
            "exit processed: {} plate {} after {} min, charged {}",
            closed.folio, closed.license_plate, elapsed_minutes, closed.amount_charged
        );

        // The ticket is closed and billed at this point; a shift bookkeeping
        // failure is logged, not propagated.
        if let Err(e) = self
            .shift_service
            .add_ticket_revenue(request.operator_id, amount_charged)
            .await
        {
            warn!(
                "shift totals not updated for operator {}: {}",
                request.operator_id, e
            );
        }

        Ok(closed)
    }

    /// All currently open tickets, most recent entry first.
    pub async fn open_tickets(&self) -> Result<Vec<Ticket>, EngineError> {
        Ok(self.ticket_repository.list_open().await?)
    }

    pub async fn find_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, EngineError> {
        Ok(self.ticket_repository.find_by_id(ticket_id).await?)
    }

    /// The payment recorded for a billed ticket, if any.
    pub async fn payment_for_ticket(
        &self,
        ticket_id: i64,
    ) -> Result<Option<Payment>, EngineError> {
        Ok(self.payment_repository.find_by_ticket(ticket_id).await?)
    }

    /// Display string for a ticket's stay length; open tickets are measured
    /// up to `as_of`.
    pub fn formatted_stay_time(&self, ticket: &Ticket, as_of: DateTime<Utc>) -> String {
        let end = ticket.exit_date.unwrap_or(as_of);
        stay_time::format_stay_time(ticket.minutes_since_entry(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DbConnection;
    use crate::{initialize_backend, AppState};
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use shared::{OpenShiftRequest, TicketStatus};

    async fn test_state() -> (AppState, DbConnection) {
        let db = DbConnection::init_test().await.unwrap();
        (initialize_backend(db.clone()), db)
    }

    async fn seed_rate(
        db: &DbConnection,
        vehicle_type: VehicleType,
        hourly_rate: Decimal,
        grace: i64,
        daily_cap: Option<Decimal>,
    ) {
        sqlx::query(
            r#"
            INSERT INTO rates (vehicle_type, hourly_rate, grace_period_minutes, daily_cap, active)
            VALUES (?, ?, ?, ?, TRUE)
            "#,
        )
        .bind(vehicle_type.as_str())
        .bind(hourly_rate.to_string())
        .bind(grace)
        .bind(daily_cap.map(|c| c.to_string()))
        .execute(db.pool())
        .await
        .unwrap();
    }

    async fn seed_subscription(db: &DbConnection, plate: &str, start: NaiveDate, end: NaiveDate) {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (license_plate, start_date, end_date, active)
            VALUES (?, ?, ?, TRUE)
            "#,
        )
        .bind(plate)
        .bind(start)
        .bind(end)
        .execute(db.pool())
        .await
        .unwrap();
    }

    /// Shift the ticket's entry back in time so the stay has elapsed minutes.
    async fn backdate_entry(db: &DbConnection, ticket_id: i64, minutes: i64) {
        sqlx::query("UPDATE tickets SET entry_date = ? WHERE id = ?")
            .bind(Utc::now() - Duration::minutes(minutes))
            .bind(ticket_id)
            .execute(db.pool())
            .await
            .unwrap();
    }

    fn entry(plate: &str, operator_id: i64) -> RegisterEntryRequest {
        RegisterEntryRequest {
            license_plate: plate.to_string(),
            vehicle_type: None,
            operator_id,
        }
    }

    fn exit(plate: &str, operator_id: i64) -> ProcessExitRequest {
        ProcessExitRequest {
            license_plate: plate.to_string(),
            operator_id,
            payment_method: "CASH".to_string(),
        }
    }

    #[tokio::test]
    async fn end_to_end_entry_and_billed_exit() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;

        let ticket = state.ticket_service.register_entry(entry("ABC123", 1)).await.unwrap();
        assert_eq!(ticket.folio, "TKT-000001");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.customer_type, CustomerType::Guest);
        assert_eq!(ticket.vehicle_type, VehicleType::Car);
        assert_eq!(ticket.amount_charged, Decimal::ZERO);
        assert!(ticket.exit_date.is_none());

        backdate_entry(&db, ticket.id, 45).await;

        let closed = state.ticket_service.process_exit(exit("ABC123", 1)).await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert_eq!(closed.amount_charged, dec!(2000.00));
        assert_eq!(closed.exit_operator_id, Some(1));
        assert!(closed.exit_date.is_some());

        let payment = state
            .ticket_service
            .payment_for_ticket(closed.id)
            .await
            .unwrap()
            .expect("billed exit records a payment");
        assert_eq!(payment.amount, dec!(2000.00));
        assert_eq!(payment.method, "CASH");
        assert_eq!(payment.operator_id, 1);
    }

    #[tokio::test]
    async fn duplicate_entry_rejected_while_ticket_open() {
        let (state, _db) = test_state().await;

        state.ticket_service.register_entry(entry("ABC123", 1)).await.unwrap();
        let err = state.ticket_service.register_entry(entry("ABC123", 2)).await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateOpenTicket(p) if p == "ABC123"));
    }

    #[tokio::test]
    async fn concurrent_entries_for_same_plate_admit_exactly_one() {
        let (state, _db) = test_state().await;

        let mut handles = Vec::new();
        for operator_id in 0..4 {
            let service = state.ticket_service.clone();
            handles.push(tokio::spawn(async move {
                service.register_entry(entry("KLM456", operator_id)).await
            }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(EngineError::DuplicateOpenTicket(_)) => rejected += 1,
                Err(other) => panic!("unexpected failure: {other}"),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(rejected, 3);

        let open = state.ticket_service.open_tickets().await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn folios_are_distinct_and_sequential_across_concurrent_entries() {
        let (state, _db) = test_state().await;
        let plates = ["AAA111", "BBB222", "CCC333", "DDD444", "EEE555", "FFF666"];

        let mut handles = Vec::new();
        for plate in plates {
            let service = state.ticket_service.clone();
            handles.push(tokio::spawn(async move {
                service.register_entry(entry(plate, 1)).await.unwrap().folio
            }));
        }

        let mut folios = Vec::new();
        for handle in handles {
            folios.push(handle.await.unwrap());
        }
        folios.sort();
        let expected: Vec<String> = (1..=6).map(|n| format!("TKT-{:06}", n)).collect();
        assert_eq!(folios, expected);
    }

    #[tokio::test]
    async fn plate_format_overrides_requested_vehicle_class() {
        let (state, _db) = test_state().await;

        let ticket = state
            .ticket_service
            .register_entry(RegisterEntryRequest {
                license_plate: "XYZ12A".to_string(),
                vehicle_type: Some(VehicleType::Car),
                operator_id: 1,
            })
            .await
            .unwrap();
        assert_eq!(ticket.vehicle_type, VehicleType::Motorcycle);
    }

    #[tokio::test]
    async fn unrecognized_plate_format_uses_caller_class_then_car() {
        let (state, _db) = test_state().await;

        let ticket = state
            .ticket_service
            .register_entry(RegisterEntryRequest {
                license_plate: "ZZZZZZ".to_string(),
                vehicle_type: Some(VehicleType::Motorcycle),
                operator_id: 1,
            })
            .await
            .unwrap();
        assert_eq!(ticket.vehicle_type, VehicleType::Motorcycle);

        let ticket = state.ticket_service.register_entry(entry("YYYYYY", 1)).await.unwrap();
        assert_eq!(ticket.vehicle_type, VehicleType::Car);
    }

    #[tokio::test]
    async fn subscription_holder_enters_and_exits_free() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;
        let today = Utc::now().date_naive();
        seed_subscription(&db, "SUB123", today - Duration::days(10), today + Duration::days(10))
            .await;

        let ticket = state.ticket_service.register_entry(entry("SUB123", 1)).await.unwrap();
        assert_eq!(ticket.customer_type, CustomerType::Subscription);

        backdate_entry(&db, ticket.id, 300).await;

        let closed = state.ticket_service.process_exit(exit("SUB123", 1)).await.unwrap();
        assert_eq!(closed.amount_charged, Decimal::ZERO);
        assert!(state
            .ticket_service
            .payment_for_ticket(closed.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn expired_subscription_bills_as_guest() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;
        let today = Utc::now().date_naive();
        seed_subscription(&db, "OLD123", today - Duration::days(60), today - Duration::days(1))
            .await;

        let ticket = state.ticket_service.register_entry(entry("OLD123", 1)).await.unwrap();
        assert_eq!(ticket.customer_type, CustomerType::Guest);
    }

    #[tokio::test]
    async fn exit_without_open_ticket_fails() {
        let (state, _db) = test_state().await;

        let err = state.ticket_service.process_exit(exit("GHO5T1", 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::NoOpenTicket(p) if p == "GHO5T1"));
    }

    #[tokio::test]
    async fn guest_exit_without_configured_rate_fails() {
        let (state, _db) = test_state().await;

        state.ticket_service.register_entry(entry("ABC123", 1)).await.unwrap();
        let err = state.ticket_service.process_exit(exit("ABC123", 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::RateUnavailable(VehicleType::Car)));

        // The failed exit must leave the ticket open.
        let open = state.ticket_service.open_tickets().await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn exit_within_grace_charges_nothing_and_records_no_payment() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;

        let ticket = state.ticket_service.register_entry(entry("ABC123", 1)).await.unwrap();
        backdate_entry(&db, ticket.id, 20).await;

        let closed = state.ticket_service.process_exit(exit("ABC123", 1)).await.unwrap();
        assert_eq!(closed.amount_charged, Decimal::ZERO);
        assert!(state
            .ticket_service
            .payment_for_ticket(closed.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn billed_exit_accumulates_into_the_operators_open_shift() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;
        let shift = state
            .shift_service
            .open_shift(OpenShiftRequest { operator_id: 1, opening_cash: dec!(100) })
            .await
            .unwrap();

        let ticket = state.ticket_service.register_entry(entry("ABC123", 1)).await.unwrap();
        backdate_entry(&db, ticket.id, 45).await;
        state.ticket_service.process_exit(exit("ABC123", 1)).await.unwrap();

        // A free exit still counts a ticket.
        let ticket = state.ticket_service.register_entry(entry("DEF456", 1)).await.unwrap();
        backdate_entry(&db, ticket.id, 10).await;
        state.ticket_service.process_exit(exit("DEF456", 1)).await.unwrap();

        let open = state.shift_service.open_shift_for(1).await.unwrap().unwrap();
        assert_eq!(open.id, shift.id);
        assert_eq!(open.total_tickets, 2);
        assert_eq!(open.total_revenue, dec!(2000.00));
    }

    #[tokio::test]
    async fn exit_without_open_shift_still_bills() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;

        let ticket = state.ticket_service.register_entry(entry("ABC123", 9)).await.unwrap();
        backdate_entry(&db, ticket.id, 45).await;

        let closed = state.ticket_service.process_exit(exit("ABC123", 9)).await.unwrap();
        assert_eq!(closed.amount_charged, dec!(2000.00));
    }

    #[tokio::test]
    async fn plate_is_normalized_before_matching() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 60, None).await;

        state.ticket_service.register_entry(entry("  abc123 ", 1)).await.unwrap();
        let closed = state.ticket_service.process_exit(exit("ABC123", 1)).await.unwrap();
        assert_eq!(closed.license_plate, "ABC123");
    }

    #[tokio::test]
    async fn stay_time_is_formatted_from_the_closed_exit_date() {
        let (state, db) = test_state().await;
        seed_rate(&db, VehicleType::Car, dec!(2000), 30, None).await;

        let ticket = state.ticket_service.register_entry(entry("ABC123", 1)).await.unwrap();
        backdate_entry(&db, ticket.id, 150).await;
        let closed = state.ticket_service.process_exit(exit("ABC123", 1)).await.unwrap();

        let formatted = state
            .ticket_service
            .formatted_stay_time(&closed, Utc::now() + Duration::hours(12));
        assert_eq!(formatted, "2 hours and 30 minutes");
    }
}
