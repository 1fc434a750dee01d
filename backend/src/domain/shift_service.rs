//! Shift bookkeeping: opening, per-exit accumulation, and closing.
use crate::domain::errors::EngineError;
use crate::storage::{OpenShiftExists, ShiftStorage};
use chrono::Utc;
use log::info;
use rust_decimal::Decimal;
use shared::{CloseShiftRequest, OpenShiftRequest, Shift};
use std::sync::Arc;

/// Owns the shift lifecycle and the running ticket/revenue totals.
///
/// Accumulation is deliberately forgiving: a billed exit with no open shift
/// for the operator is recorded nowhere, and that is not an error.
#[derive(Clone)]
pub struct ShiftService {
    shift_repository: Arc<dyn ShiftStorage>,
}

impl ShiftService {
    pub fn new(shift_repository: Arc<dyn ShiftStorage>) -> Self {
        Self { shift_repository }
    }

    /// Open a work session for an operator. An operator can hold only one
    /// open shift at a time; the storage-level uniqueness rule is the
    /// authority, not the lookup a caller may have done beforehand.
    pub async fn open_shift(&self, request: OpenShiftRequest) -> Result<Shift, EngineError> {
        match self
            .shift_repository
            .insert_shift(request.operator_id, request.opening_cash, Utc::now())
            .await
        {
            Ok(shift) => {
                info!("shift {} opened for operator {}", shift.id, shift.operator_id);
                Ok(shift)
            }
            Err(e) => match e.downcast::<OpenShiftExists>() {
                Ok(existing) => Err(EngineError::InvalidState(format!(
                    "operator {} already has an open shift",
                    existing.operator_id
                ))),
                Err(other) => Err(other.into()),
            },
        }
    }

    /// The operator's open shift, if one exists.
    pub async fn open_shift_for(&self, operator_id: i64) -> Result<Option<Shift>, EngineError> {
        Ok(self.shift_repository.find_open_by_operator(operator_id).await?)
    }

    /// Add one ticket and its charged amount to the operator's open shift.
    /// No-op when the operator has no open shift.
    pub async fn add_ticket_revenue(
        &self,
        operator_id: i64,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        Ok(self
            .shift_repository
            .add_ticket_revenue(operator_id, amount)
            .await?)
    }

    /// Freeze the shift's totals and close it. Fails with `InvalidState`
    /// when the shift does not exist or was already closed.
    pub async fn close_shift(&self, request: CloseShiftRequest) -> Result<Shift, EngineError> {
        let closed = self
            .shift_repository
            .close_shift(request.shift_id, request.closing_cash, Utc::now())
            .await?;

        match closed {
            Some(shift) => {
                info!(
                    "shift {} closed: {} tickets, {} revenue",
                    shift.id, shift.total_tickets, shift.total_revenue
                );
                Ok(shift)
            }
            None => match self.shift_repository.find_by_id(request.shift_id).await? {
                Some(_) => Err(EngineError::InvalidState(format!(
                    "shift {} is already closed",
                    request.shift_id
                ))),
                None => Err(EngineError::InvalidState(format!(
                    "shift {} does not exist",
                    request.shift_id
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialize_backend;
    use crate::storage::DbConnection;
    use rust_decimal_macros::dec;
    use shared::ShiftStatus;

    async fn service() -> ShiftService {
        let db = DbConnection::init_test().await.unwrap();
        initialize_backend(db).shift_service
    }

    #[tokio::test]
    async fn shift_opens_accumulates_and_closes_with_frozen_totals() {
        let service = service().await;

        let shift = service
            .open_shift(OpenShiftRequest { operator_id: 1, opening_cash: dec!(150) })
            .await
            .unwrap();
        assert_eq!(shift.status, ShiftStatus::Open);
        assert_eq!(shift.total_tickets, 0);

        service.add_ticket_revenue(1, dec!(2000)).await.unwrap();
        service.add_ticket_revenue(1, dec!(3500.50)).await.unwrap();

        let closed = service
            .close_shift(CloseShiftRequest { shift_id: shift.id, closing_cash: dec!(5650.50) })
            .await
            .unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        assert_eq!(closed.total_tickets, 2);
        assert_eq!(closed.total_revenue, dec!(5500.50));
        assert_eq!(closed.closing_cash, Some(dec!(5650.50)));
        assert!(closed.closing_date.is_some());

        assert!(service.open_shift_for(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_open_shift_for_same_operator_is_rejected() {
        let service = service().await;

        service
            .open_shift(OpenShiftRequest { operator_id: 1, opening_cash: dec!(0) })
            .await
            .unwrap();
        let err = service
            .open_shift(OpenShiftRequest { operator_id: 1, opening_cash: dec!(0) })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        // A different operator is unaffected
        service
            .open_shift(OpenShiftRequest { operator_id: 2, opening_cash: dec!(0) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn closing_twice_or_closing_unknown_shift_fails() {
        let service = service().await;

        let shift = service
            .open_shift(OpenShiftRequest { operator_id: 1, opening_cash: dec!(0) })
            .await
            .unwrap();
        service
            .close_shift(CloseShiftRequest { shift_id: shift.id, closing_cash: dec!(0) })
            .await
            .unwrap();

        let err = service
            .close_shift(CloseShiftRequest { shift_id: shift.id, closing_cash: dec!(0) })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(m) if m.contains("already closed")));

        let err = service
            .close_shift(CloseShiftRequest { shift_id: 9999, closing_cash: dec!(0) })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(m) if m.contains("does not exist")));
    }

    #[tokio::test]
    async fn accumulation_without_open_shift_is_a_no_op() {
        let service = service().await;
        service.add_ticket_revenue(42, dec!(2000)).await.unwrap();
        assert!(service.open_shift_for(42).await.unwrap().is_none());
    }
}
