//! Persistence layer of the calendar relay: profiles with their module
//! pipelines and admin tokens, notifiers with their recipients, and the
//! schema ledger that upgrades the database in place.

pub mod config;
pub mod db;
pub mod error;
pub mod service;
pub mod types;
pub mod utils;

pub use db::Store;
pub use error::StoreError;
