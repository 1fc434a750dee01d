use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use crate::storage::sqlite::connection::DbConnection;
use crate::storage::OperatorStorage;
use shared::Operator;

/// Repository for operator account lookups.
#[derive(Clone)]
pub struct OperatorRepository {
    db: DbConnection,
}

impl OperatorRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OperatorStorage for OperatorRepository {
    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Operator>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, username, active
            FROM operators
            WHERE username = ? AND password = ?
            "#,
        )
        .bind(username)
        .bind(password)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(Operator {
                id: r.get("id"),
                name: r.get("name"),
                username: r.get("username"),
                active: r.get("active"),
            })),
            None => Ok(None),
        }
    }
}
