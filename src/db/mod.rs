//! Database module: schema ledger and repositories over a shared SQLite pool.
//!
//! Layout:
//! - `schema.rs`: baseline DDL and ordered migration steps
//! - `ledger.rs`: applied-version bookkeeping and the startup algorithm
//! - `models.rs`: Rust structs mirroring DB rows
//! - `profile.rs`, `notifier.rs`, `recipient.rs`: repositories
//! - `store.rs`: pool construction, wires everything together

pub mod ledger;
pub mod models;
pub mod notifier;
pub mod profile;
pub mod recipient;
pub mod schema;
pub mod store;

pub use ledger::SchemaLedger;
pub use notifier::NotifierRepository;
pub use profile::ProfileRepository;
pub use recipient::RecipientRegistry;
pub use schema::{CURRENT_SCHEMA_VERSION, SQLITE_INIT};
pub use store::{Store, StoreOptions};
