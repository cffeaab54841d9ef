//! Notifier persistence and recipient subscriptions.

use std::collections::BTreeSet;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::DbNotifier;
use crate::db::recipient::{self, RecipientRegistry};
use crate::error::StoreError;
use crate::service::notifier_cache::NotifierCacheInvalidator;
use crate::types::Notifier;
use crate::utils::interval;

#[derive(Clone)]
pub struct NotifierRepository {
    pool: SqlitePool,
    recipients: RecipientRegistry,
    cache: Arc<dyn NotifierCacheInvalidator>,
}

impl NotifierRepository {
    pub fn new(
        pool: SqlitePool,
        recipients: RecipientRegistry,
        cache: Arc<dyn NotifierCacheInvalidator>,
    ) -> Self {
        Self {
            pool,
            recipients,
            cache,
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM notifier WHERE name = ?)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar("SELECT name FROM notifier")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    /// Loads a notifier, optionally with its recipients. `Ok(None)` when no
    /// notifier has that name.
    ///
    /// The row is read in its own transaction, which is committed before the
    /// recipients are fetched. A concurrent writer can therefore slip in
    /// between both reads.
    pub async fn read(
        &self,
        name: &str,
        fetch_recipients: bool,
    ) -> Result<Option<Notifier>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, DbNotifier>(
            r#"
        SELECT name, source, "interval"
        FROM notifier
        WHERE name = ?
        "#,
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let interval = interval::parse_iso8601(&row.interval)?;

        let recipients = if fetch_recipients {
            self.recipients(name).await?
        } else {
            BTreeSet::new()
        };

        Ok(Some(Notifier {
            name: row.name,
            source: row.source,
            interval,
            recipients,
        }))
    }

    pub async fn recipients(&self, name: &str) -> Result<BTreeSet<String>, StoreError> {
        let emails: Vec<String> = sqlx::query_scalar(
            r#"
        SELECT recipient
        FROM notifier_recipients
        WHERE notifier = ?
        "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(emails.into_iter().collect())
    }

    /// Upserts name, source and interval. Recipients are not written here;
    /// use [`Self::add_recipient`] and friends.
    pub async fn write(&self, notifier: &Notifier) -> Result<(), StoreError> {
        let encoded = interval::to_iso8601(notifier.interval);
        sqlx::query(
            r#"
        INSERT INTO notifier (name, source, "interval")
        VALUES (?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            source = excluded.source,
            "interval" = excluded."interval"
        "#,
        )
        .bind(&notifier.name)
        .bind(&notifier.source)
        .bind(&encoded)
        .execute(&self.pool)
        .await?;
        self.cache.invalidate(&notifier.name);

        debug!(notifier = %notifier.name, interval = %encoded, "notifier written");
        Ok(())
    }

    /// Removes the notifier; its subscriptions cascade.
    pub async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM notifier WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        self.cache.invalidate(name);

        let deleted = res.rows_affected() > 0;
        debug!(notifier = name, deleted, "notifier delete");
        Ok(deleted)
    }

    /// Subscribes `email`, registering the address first if needed. Both steps
    /// are no-ops when already done and commit together, so an unknown
    /// notifier leaves the registry untouched. Returns whether a new
    /// subscription was made.
    pub async fn add_recipient(&self, notifier: &str, email: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        recipient::ensure_on(&mut tx, email).await?;
        let res = sqlx::query(
            r#"
        INSERT INTO notifier_recipients (notifier, recipient)
        VALUES (?, ?)
        ON CONFLICT(notifier, recipient) DO NOTHING
        "#,
        )
        .bind(notifier)
        .bind(email)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        self.cache.invalidate(notifier);

        let added = res.rows_affected() > 0;
        debug!(notifier, added, "recipient subscribed");
        Ok(added)
    }

    /// Unsubscribes `email` from this notifier only; the address stays registered.
    pub async fn remove_recipient_from_notifier(
        &self,
        notifier: &str,
        email: &str,
    ) -> Result<bool, StoreError> {
        let res =
            sqlx::query("DELETE FROM notifier_recipients WHERE notifier = ? AND recipient = ?")
                .bind(notifier)
                .bind(email)
                .execute(&self.pool)
                .await?;
        self.cache.invalidate(notifier);

        let removed = res.rows_affected() > 0;
        debug!(notifier, removed, "recipient unsubscribed");
        Ok(removed)
    }

    /// Removes the address from the registry and thereby from every notifier.
    pub async fn remove_recipient_globally(&self, email: &str) -> Result<bool, StoreError> {
        self.recipients.remove(email).await
    }
}
