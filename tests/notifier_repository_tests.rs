mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use calrelay::db::{Store, StoreOptions};
use calrelay::error::StoreError;
use calrelay::service::notifier_cache::{NotifierCache, NotifierCacheInvalidator};
use calrelay::types::Notifier;
use common::{TempDb, count};

fn changes(interval: Duration) -> Notifier {
    Notifier::new("changes", "https://example.org/lectures.ics", interval)
}

#[derive(Default)]
struct RecordingInvalidator {
    events: Mutex<Vec<String>>,
}

impl RecordingInvalidator {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl NotifierCacheInvalidator for RecordingInvalidator {
    fn invalidate(&self, name: &str) {
        self.events.lock().unwrap().push(format!("one:{name}"));
    }

    fn invalidate_all(&self) {
        self.events.lock().unwrap().push("all".to_string());
    }
}

#[tokio::test]
async fn interval_round_trips_as_duration() {
    let db = TempDb::new("notifier_interval");
    let store = db.open().await;
    let notifiers = store.notifiers();

    let ninety_minutes = Duration::from_secs(60 * 60 + 30 * 60);
    notifiers.write(&changes(ninety_minutes)).await.unwrap();

    assert!(notifiers.exists("changes").await.unwrap());
    let read = notifiers.read("changes", false).await.unwrap().unwrap();
    assert_eq!(read.interval, Duration::from_secs(90 * 60));
    assert_eq!(read.source, "https://example.org/lectures.ics");
    assert!(read.recipients.is_empty());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn stored_day_components_are_honoured() {
    let db = TempDb::new("notifier_days");
    let store = db.open().await;

    sqlx::query(r#"INSERT INTO notifier (name, source, "interval") VALUES ('daily', 'x', 'P1DT2H')"#)
        .execute(store.pool())
        .await
        .unwrap();

    let read = store.notifiers().read("daily", false).await.unwrap().unwrap();
    assert_eq!(read.interval, Duration::from_secs(26 * 3600));

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn unparseable_stored_interval_is_an_error() {
    let db = TempDb::new("notifier_bad_interval");
    let store = db.open().await;

    sqlx::query(r#"INSERT INTO notifier (name, source, "interval") VALUES ('monthly', 'x', 'P1M')"#)
        .execute(store.pool())
        .await
        .unwrap();

    let err = store.notifiers().read("monthly", true).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidInterval(_)));
    assert!(!err.is_validation());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn missing_notifier_reads_as_none() {
    let db = TempDb::new("notifier_missing");
    let store = db.open().await;

    assert!(store.notifiers().read("nope", true).await.unwrap().is_none());
    assert!(!store.notifiers().exists("nope").await.unwrap());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn rewrite_keeps_recipients() {
    let db = TempDb::new("notifier_upsert");
    let store = db.open().await;
    let notifiers = store.notifiers();

    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();
    notifiers
        .add_recipient("changes", "a@example.org")
        .await
        .unwrap();

    let mut updated = changes(Duration::from_secs(7200));
    updated.source = "https://example.org/new.ics".to_string();
    notifiers.write(&updated).await.unwrap();

    assert_eq!(count(&store, "SELECT COUNT(*) FROM notifier").await, 1);
    let read = notifiers.read("changes", true).await.unwrap().unwrap();
    assert_eq!(read.interval, Duration::from_secs(7200));
    assert_eq!(read.source, "https://example.org/new.ics");
    assert!(read.recipients.contains("a@example.org"));
    assert_eq!(notifiers.list_names().await.unwrap(), vec!["changes".to_string()]);

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn adding_a_recipient_twice_is_idempotent() {
    let db = TempDb::new("notifier_dedup");
    let store = db.open().await;
    let notifiers = store.notifiers();
    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();

    assert!(notifiers.add_recipient("changes", "a@x.com").await.unwrap());
    assert!(!notifiers.add_recipient("changes", "a@x.com").await.unwrap());

    assert_eq!(count(&store, "SELECT COUNT(*) FROM recipients").await, 1);
    assert_eq!(
        count(
            &store,
            "SELECT COUNT(*) FROM notifier_recipients WHERE notifier = 'changes'"
        )
        .await,
        1
    );

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn recipients_are_shared_across_notifiers() {
    let db = TempDb::new("notifier_shared");
    let store = db.open().await;
    let notifiers = store.notifiers();
    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();
    notifiers
        .write(&Notifier::new("exams", "https://example.org/exams.ics", Duration::from_secs(600)))
        .await
        .unwrap();

    notifiers.add_recipient("changes", "a@x.com").await.unwrap();
    notifiers.add_recipient("exams", "a@x.com").await.unwrap();
    notifiers.add_recipient("exams", "b@x.com").await.unwrap();

    assert_eq!(
        store.recipients().list().await.unwrap(),
        vec!["a@x.com".to_string(), "b@x.com".to_string()]
    );
    assert_eq!(
        store.recipients().subscriptions("a@x.com").await.unwrap(),
        vec!["changes".to_string(), "exams".to_string()]
    );

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn unsubscribing_keeps_the_registry_entry() {
    let db = TempDb::new("notifier_unsubscribe");
    let store = db.open().await;
    let notifiers = store.notifiers();
    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();
    notifiers.add_recipient("changes", "a@x.com").await.unwrap();

    assert!(
        notifiers
            .remove_recipient_from_notifier("changes", "a@x.com")
            .await
            .unwrap()
    );
    assert!(notifiers.recipients("changes").await.unwrap().is_empty());
    assert!(store.recipients().exists("a@x.com").await.unwrap());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn global_removal_cascades_to_every_notifier() {
    let db = TempDb::new("notifier_global_remove");
    let store = db.open().await;
    let notifiers = store.notifiers();
    for name in ["changes", "exams"] {
        notifiers
            .write(&Notifier::new(name, "x", Duration::from_secs(60)))
            .await
            .unwrap();
        notifiers.add_recipient(name, "a@x.com").await.unwrap();
        notifiers.add_recipient(name, "b@x.com").await.unwrap();
    }

    assert!(notifiers.remove_recipient_globally("a@x.com").await.unwrap());

    for name in ["changes", "exams"] {
        let read = notifiers.read(name, true).await.unwrap().unwrap();
        assert!(!read.recipients.contains("a@x.com"));
        assert!(read.recipients.contains("b@x.com"));
    }
    assert!(!store.recipients().exists("a@x.com").await.unwrap());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn delete_cascades_subscriptions_only() {
    let db = TempDb::new("notifier_delete");
    let store = db.open().await;
    let notifiers = store.notifiers();
    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();
    notifiers.add_recipient("changes", "a@x.com").await.unwrap();

    assert!(notifiers.delete("changes").await.unwrap());
    assert_eq!(count(&store, "SELECT COUNT(*) FROM notifier_recipients").await, 0);
    assert!(store.recipients().exists("a@x.com").await.unwrap());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn writes_invalidate_the_cache() {
    let db = TempDb::new("notifier_cache_events");
    let recorder = Arc::new(RecordingInvalidator::default());
    let store = Store::open(&db.url, StoreOptions::default(), recorder.clone())
        .await
        .unwrap();
    let notifiers = store.notifiers();

    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();
    notifiers.add_recipient("changes", "a@x.com").await.unwrap();
    notifiers
        .remove_recipient_from_notifier("changes", "a@x.com")
        .await
        .unwrap();
    assert_eq!(
        recorder.take(),
        vec!["one:changes", "one:changes", "one:changes"]
    );

    notifiers.remove_recipient_globally("a@x.com").await.unwrap();
    assert_eq!(recorder.take(), vec!["all"]);

    notifiers.delete("changes").await.unwrap();
    assert_eq!(recorder.take(), vec!["one:changes"]);

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn global_removal_empties_a_real_cache() {
    let db = TempDb::new("notifier_cache_moka");
    let cache = Arc::new(NotifierCache::new(64, Duration::from_secs(60)));
    let store = Store::open(&db.url, StoreOptions::default(), cache.clone())
        .await
        .unwrap();
    let notifiers = store.notifiers();

    notifiers
        .write(&changes(Duration::from_secs(3600)))
        .await
        .unwrap();
    notifiers.add_recipient("changes", "a@x.com").await.unwrap();
    let materialized = notifiers.read("changes", true).await.unwrap().unwrap();
    cache.insert(materialized);
    assert!(cache.get("changes").is_some());

    notifiers.remove_recipient_globally("a@x.com").await.unwrap();
    assert!(cache.get("changes").is_none());

    store.close().await;
    db.cleanup().await;
}

#[tokio::test]
async fn subscribing_to_an_unknown_notifier_registers_nothing() {
    let db = TempDb::new("notifier_unknown_link");
    let store = db.open().await;

    let err = store
        .notifiers()
        .add_recipient("missing", "a@x.com")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DatabaseError(_)));

    assert!(!store.recipients().exists("a@x.com").await.unwrap());
    assert_eq!(count(&store, "SELECT COUNT(*) FROM recipients").await, 0);

    store.close().await;
    db.cleanup().await;
}
