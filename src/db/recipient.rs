//! Global registry of recipient addresses shared by all notifiers.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::StoreError;
use crate::service::notifier_cache::NotifierCacheInvalidator;

#[derive(Clone)]
pub struct RecipientRegistry {
    pool: SqlitePool,
    cache: Arc<dyn NotifierCacheInvalidator>,
}

impl RecipientRegistry {
    pub fn new(pool: SqlitePool, cache: Arc<dyn NotifierCacheInvalidator>) -> Self {
        Self { pool, cache }
    }

    /// Registers the address if it is not known yet.
    pub async fn ensure(&self, email: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        ensure_on(&mut conn, email).await
    }

    pub async fn exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM recipients WHERE email = ?)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let emails = sqlx::query_scalar("SELECT email FROM recipients ORDER BY email")
            .fetch_all(&self.pool)
            .await?;
        Ok(emails)
    }

    /// Names of the notifiers this address is subscribed to.
    pub async fn subscriptions(&self, email: &str) -> Result<Vec<String>, StoreError> {
        let notifiers = sqlx::query_scalar(
            r#"
        SELECT notifier
        FROM notifier_recipients
        WHERE recipient = ?
        ORDER BY notifier
        "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifiers)
    }

    /// Drops the address and, through the store's cascade, every subscription
    /// it had. Cached notifiers are invalidated wholesale afterwards.
    pub async fn remove(&self, email: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM recipients WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;
        self.cache.invalidate_all();

        let removed = res.rows_affected() > 0;
        debug!(removed, "recipient removed from registry");
        Ok(removed)
    }
}

pub(crate) async fn ensure_on(conn: &mut SqliteConnection, email: &str) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO recipients (email) VALUES (?) ON CONFLICT(email) DO NOTHING")
        .bind(email)
        .execute(conn)
        .await?;
    Ok(())
}
