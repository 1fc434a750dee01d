use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

// The database URL for the production database
const DATABASE_URL: &str = "sqlite:carpark.db";

/// DbConnection manages database operations
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        // Connect to the database
        let pool = SqlitePool::connect(url).await?;

        // Setup database schema
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize the standard database
    pub async fn init() -> Result<Self> {
        Self::new(DATABASE_URL).await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name for tests
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        // Create tickets table. Currency columns are TEXT so decimal
        // amounts survive storage exactly.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                folio TEXT NOT NULL UNIQUE,
                license_plate TEXT NOT NULL,
                customer_type TEXT NOT NULL,
                vehicle_type TEXT NOT NULL,
                entry_date TEXT NOT NULL,
                exit_date TEXT,
                entry_operator_id INTEGER NOT NULL,
                exit_operator_id INTEGER,
                status TEXT NOT NULL DEFAULT 'OPEN',
                amount_charged TEXT NOT NULL DEFAULT '0',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(pool)
        .await?;

        // One open ticket per plate; the insert itself is the duplicate check
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tickets_open_plate
            ON tickets(license_plate) WHERE status = 'OPEN';
            "#,
        )
        .execute(pool)
        .await?;

        // Index for open-ticket listings
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tickets_status
            ON tickets(status, entry_date DESC);
            "#,
        )
        .execute(pool)
        .await?;

        // Folio counter, seeded from the highest folio ever issued so the
        // sequence continues across schema re-runs and never reissues
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS folio_sequence (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                value INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO folio_sequence (id, value)
            VALUES (1, (
                SELECT COALESCE(MAX(CAST(SUBSTR(folio, 5) AS INTEGER)), 0)
                FROM tickets WHERE folio LIKE 'TKT-%'
            ));
            "#,
        )
        .execute(pool)
        .await?;

        // Create payments table; one payment per billed ticket
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticket_id INTEGER NOT NULL UNIQUE,
                amount TEXT NOT NULL,
                method TEXT NOT NULL,
                payment_date TEXT NOT NULL,
                operator_id INTEGER NOT NULL,
                FOREIGN KEY (ticket_id) REFERENCES tickets (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Create rates table; one active rate per vehicle class
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vehicle_type TEXT NOT NULL,
                hourly_rate TEXT NOT NULL,
                grace_period_minutes INTEGER NOT NULL DEFAULT 30,
                daily_cap TEXT,
                active BOOLEAN NOT NULL DEFAULT TRUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_rates_active_vehicle
            ON rates(vehicle_type) WHERE active = TRUE;
            "#,
        )
        .execute(pool)
        .await?;

        // Create subscriptions table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                license_plate TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT TRUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_subscriptions_plate
            ON subscriptions(license_plate);
            "#,
        )
        .execute(pool)
        .await?;

        // Create shifts table; one open shift per operator
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shifts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                operator_id INTEGER NOT NULL,
                opening_date TEXT NOT NULL,
                closing_date TEXT,
                opening_cash TEXT NOT NULL DEFAULT '0',
                closing_cash TEXT,
                total_revenue TEXT NOT NULL DEFAULT '0',
                total_tickets INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'OPEN'
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_shifts_open_operator
            ON shifts(operator_id) WHERE status = 'OPEN';
            "#,
        )
        .execute(pool)
        .await?;

        // Create operators table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS operators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT TRUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_creates_database_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carpark-test.db");
        let url = format!("sqlite:{}", path.display());

        let db = DbConnection::new(&url).await.unwrap();
        assert!(path.exists());

        // Schema setup is idempotent
        let db2 = DbConnection::new(&url).await.unwrap();
        drop(db2);

        sqlx::query("SELECT id, folio FROM tickets")
            .fetch_all(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn folio_sequence_is_seeded_once() {
        let db = DbConnection::init_test().await.unwrap();

        let (value,): (i64,) = sqlx::query_as("SELECT value FROM folio_sequence WHERE id = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(value, 0);
    }
}
