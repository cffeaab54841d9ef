//! Schema version ledger and forward-only migrations.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info};

use crate::db::schema::{CURRENT_SCHEMA_VERSION, MIGRATIONS, Migration, SQLITE_INIT, statements};
use crate::error::StoreError;

/// Tracks applied schema versions in `schema_upgrades` and runs the pending
/// steps. Every step commits together with its ledger entry.
#[derive(Clone)]
pub struct SchemaLedger {
    pool: SqlitePool,
}

impl SchemaLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Highest recorded version. A missing or empty ledger means the database
    /// was never initialized.
    pub async fn current_version(&self) -> Result<i64, StoreError> {
        let has_ledger: bool = sqlx::query_scalar(
            r#"
        SELECT EXISTS (
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_upgrades'
        )
        "#,
        )
        .fetch_one(&self.pool)
        .await?;
        if !has_ledger {
            return Err(StoreError::StoreUninitialized);
        }

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_upgrades")
            .fetch_one(&self.pool)
            .await?;
        version.ok_or(StoreError::StoreUninitialized)
    }

    /// Every recorded version in insertion order.
    pub async fn history(&self) -> Result<Vec<i64>, StoreError> {
        let versions = sqlx::query_scalar("SELECT version FROM schema_upgrades ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        Ok(versions)
    }

    /// Creates the current layout and records [`CURRENT_SCHEMA_VERSION`] in a
    /// single transaction.
    pub async fn initialize_fresh(&self) -> Result<(), StoreError> {
        let version = CURRENT_SCHEMA_VERSION;
        info!("Initially creating tables...");

        let mut tx = self.pool.begin().await?;
        for stmt in statements(SQLITE_INIT) {
            sqlx::query(stmt)
                .execute(&mut *tx)
                .await
                .map_err(|source| StoreError::Migration { version, source })?;
        }
        record_version(&mut tx, version).await?;
        tx.commit()
            .await
            .map_err(|source| StoreError::Migration { version, source })?;

        info!(version, "DB is now at version {version}");
        Ok(())
    }

    /// Applies every step above `from_version` in ascending order and returns
    /// the version reached.
    pub async fn upgrade(&self, from_version: i64) -> Result<i64, StoreError> {
        debug!(from_version, "Upgrading db");
        let mut reached = from_version;
        for step in MIGRATIONS.iter().filter(|m| m.version > from_version) {
            self.apply(step).await?;
            reached = step.version;
        }
        Ok(reached)
    }

    /// Startup algorithm: initialize an empty store, upgrade an old one, refuse
    /// one written by a newer build. Safe to call on every start.
    pub async fn migrate(&self) -> Result<i64, StoreError> {
        let version = match self.current_version().await {
            Ok(version) => version,
            Err(StoreError::StoreUninitialized) => {
                self.initialize_fresh().await?;
                return Ok(CURRENT_SCHEMA_VERSION);
            }
            Err(e) => return Err(e),
        };

        if version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaAhead {
                found: version,
                expected: CURRENT_SCHEMA_VERSION,
            });
        }
        if version < CURRENT_SCHEMA_VERSION {
            return self.upgrade(version).await;
        }

        debug!(version, "DB schema is up to date");
        Ok(version)
    }

    async fn apply(&self, step: &Migration) -> Result<(), StoreError> {
        let version = step.version;
        info!(version, description = step.description, "Applying db migration");

        let mut tx = self.pool.begin().await?;
        for stmt in statements(step.sql) {
            sqlx::query(stmt)
                .execute(&mut *tx)
                .await
                .map_err(|source| StoreError::Migration { version, source })?;
        }
        record_version(&mut tx, version).await?;
        tx.commit()
            .await
            .map_err(|source| StoreError::Migration { version, source })?;

        info!(version, "DB is now at version {version}");
        Ok(())
    }
}

async fn record_version(conn: &mut SqliteConnection, version: i64) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO schema_upgrades (version) VALUES (?)")
        .bind(version)
        .execute(conn)
        .await
        .map_err(|source| {
            error!(version, error = %source, "Failed to set db version");
            StoreError::LedgerWrite { version, source }
        })?;
    Ok(())
}
