pub mod importer;
pub mod notifier_cache;
