//! Operator authentication and the per-session operator context.
use crate::domain::errors::EngineError;
use crate::storage::OperatorStorage;
use log::info;
use shared::Operator;
use std::sync::Arc;

/// Validates operator credentials against the store.
#[derive(Clone)]
pub struct OperatorService {
    operator_repository: Arc<dyn OperatorStorage>,
}

impl OperatorService {
    pub fn new(operator_repository: Arc<dyn OperatorStorage>) -> Self {
        Self { operator_repository }
    }

    /// Check credentials and return the operator when they match an active
    /// account. Blank credentials never reach the store.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Operator>, EngineError> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Ok(None);
        }

        let operator = self
            .operator_repository
            .find_by_credentials(username.trim(), password)
            .await?;

        Ok(operator.filter(|o| o.active))
    }
}

/// The currently authenticated operator for one terminal session.
///
/// Owned per operator session and never shared across sessions.
#[derive(Debug, Default)]
pub struct OperatorSession {
    current: Option<Operator>,
}

impl OperatorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, operator: Operator) {
        info!("login: {}", operator.username);
        self.current = Some(operator);
    }

    pub fn logout(&mut self) {
        if let Some(operator) = self.current.take() {
            info!("logout: {}", operator.username);
        }
    }

    pub fn current(&self) -> Option<&Operator> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }
}
