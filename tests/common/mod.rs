#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use calrelay::Store;
use tokio::fs;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A throwaway SQLite file under the system temp dir.
pub struct TempDb {
    pub path: PathBuf,
    pub url: String,
}

impl TempDb {
    pub fn new(prefix: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        SystemTime::now().hash(&mut hasher);
        std::process::id().hash(&mut hasher);
        COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);

        let db_file_name = format!("test_{prefix}_{}.sqlite", hasher.finish());
        let path = std::env::temp_dir().join(db_file_name);
        let url = format!("sqlite:{}", path.to_str().unwrap());
        Self { path, url }
    }

    pub async fn open(&self) -> Store {
        Store::connect(&self.url).await.unwrap()
    }

    pub async fn cleanup(self) {
        let wal_path = PathBuf::from(format!("{}-wal", self.path.to_string_lossy()));
        let shm_path = PathBuf::from(format!("{}-shm", self.path.to_string_lossy()));
        let _ = fs::remove_file(&wal_path).await;
        let _ = fs::remove_file(&shm_path).await;
        let _ = fs::remove_file(&self.path).await;
    }
}

pub async fn count(store: &Store, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

pub fn token(seed: char) -> String {
    std::iter::repeat_n(seed, 64).collect()
}
