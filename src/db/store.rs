use std::{str::FromStr, sync::Arc, time::Duration};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::info;

use crate::db::ledger::SchemaLedger;
use crate::db::notifier::NotifierRepository;
use crate::db::profile::ProfileRepository;
use crate::db::recipient::RecipientRegistry;
use crate::error::StoreError;
use crate::service::notifier_cache::{NoopInvalidator, NotifierCacheInvalidator};

/// Pool settings for [`Store::open`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared handle to the relay database. Cheap to clone; all repositories
/// share one pool and rely on statement-level atomicity of the engine.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    ledger: SchemaLedger,
    profiles: ProfileRepository,
    notifiers: NotifierRepository,
    recipients: RecipientRegistry,
}

impl Store {
    /// Connects and brings the schema to the current version. Any error here
    /// must keep the process from serving.
    pub async fn open(
        database_url: &str,
        options: StoreOptions,
        cache: Arc<dyn NotifierCacheInvalidator>,
    ) -> Result<Self, StoreError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(options.busy_timeout)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_opts)
            .await?;
        info!("Connected to db");

        let store = Self::from_pool(pool, cache);
        let version = store.ledger.migrate().await?;
        info!(version, "Store ready");
        Ok(store)
    }

    /// [`Store::open`] with default pool settings and no notifier cache.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Self::open(database_url, StoreOptions::default(), Arc::new(NoopInvalidator)).await
    }

    /// Wraps an existing pool without touching the schema.
    pub fn from_pool(pool: SqlitePool, cache: Arc<dyn NotifierCacheInvalidator>) -> Self {
        let recipients = RecipientRegistry::new(pool.clone(), cache.clone());
        Self {
            ledger: SchemaLedger::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            notifiers: NotifierRepository::new(pool.clone(), recipients.clone(), cache),
            recipients,
            pool,
        }
    }

    pub fn ledger(&self) -> &SchemaLedger {
        &self.ledger
    }

    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    pub fn notifiers(&self) -> &NotifierRepository {
        &self.notifiers
    }

    pub fn recipients(&self) -> &RecipientRegistry {
        &self.recipients
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
