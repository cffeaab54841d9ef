//! Bulk import of profiles and notifiers from a TOML document.
//!
//! Re-running an import is safe: profile and notifier metadata is upserted,
//! modules are only added when no identical module exists, tokens are upserted
//! by value and subscriptions are idempotent.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Store;
use crate::error::StoreError;
use crate::types::{AdminToken, Module, Notifier, Profile};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImportDocument {
    #[serde(default)]
    pub profiles: Vec<ProfileImport>,
    #[serde(default)]
    pub notifiers: Vec<NotifierImport>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileImport {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub immutable_past: bool,
    #[serde(default)]
    pub admin_tokens: Vec<AdminToken>,
    /// Flat module maps, each carrying its module name under `"name"`.
    #[serde(default)]
    pub modules: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotifierImport {
    pub name: String,
    pub source: String,
    #[serde(with = "crate::utils::interval")]
    pub interval: Duration,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl ImportDocument {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::from(Toml::file(path.as_ref())).extract()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, figment::Error> {
        Figment::from(Toml::string(toml)).extract()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub profiles: usize,
    pub modules_added: usize,
    pub modules_present: usize,
    pub tokens: usize,
    pub notifiers: usize,
    pub subscriptions_added: usize,
    pub subscriptions_present: usize,
}

/// Writes the document into the store. Stops at the first failing entry;
/// entries written before it stay written.
pub async fn import(store: &Store, document: &ImportDocument) -> Result<ImportReport, StoreError> {
    let mut report = ImportReport::default();

    for entry in &document.profiles {
        let modules = entry
            .modules
            .iter()
            .map(|flat| Module::from_flat_map(flat.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        for token in &entry.admin_tokens {
            AdminToken::validate(&token.token)?;
        }

        let profiles = store.profiles();
        profiles
            .write(&Profile {
                name: entry.name.clone(),
                source: entry.source.clone(),
                public: entry.public,
                immutable_past: entry.immutable_past,
                ..Default::default()
            })
            .await?;
        report.profiles += 1;

        for module in &modules {
            if profiles.module_exists(&entry.name, module).await? {
                report.modules_present += 1;
            } else {
                profiles.add_module(&entry.name, module).await?;
                report.modules_added += 1;
            }
        }

        for token in &entry.admin_tokens {
            profiles
                .add_token(&entry.name, &token.token, token.note.as_deref())
                .await?;
            report.tokens += 1;
        }
    }

    for entry in &document.notifiers {
        let notifiers = store.notifiers();
        notifiers
            .write(&Notifier::new(&entry.name, &entry.source, entry.interval))
            .await?;
        report.notifiers += 1;

        for email in &entry.recipients {
            if notifiers.add_recipient(&entry.name, email).await? {
                report.subscriptions_added += 1;
            } else {
                report.subscriptions_present += 1;
            }
        }
    }

    info!(
        profiles = report.profiles,
        modules_added = report.modules_added,
        modules_present = report.modules_present,
        tokens = report.tokens,
        notifiers = report.notifiers,
        subscriptions_added = report.subscriptions_added,
        subscriptions_present = report.subscriptions_present,
        "import finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_with_both_interval_forms() {
        let doc = ImportDocument::from_toml_str(
            r#"
            [[profiles]]
            name = "lectures"
            source = "https://example.org/lectures.ics"
            public = true
            modules = [
                { name = "delete-bysummary-regex", regex = "^Tutorial" },
            ]
            admin_tokens = [
                { token = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef", note = "ops" },
            ]

            [[notifiers]]
            name = "lectures-changes"
            source = "https://example.org/lectures.ics"
            interval = "1h30m"
            recipients = ["a@example.org"]

            [[notifiers]]
            name = "daily"
            source = "https://example.org/daily.ics"
            interval = "P1D"
            "#,
        )
        .unwrap();

        assert_eq!(doc.profiles.len(), 1);
        let profile = &doc.profiles[0];
        assert!(profile.public);
        assert!(!profile.immutable_past);
        assert_eq!(
            profile.modules[0].get("regex").map(String::as_str),
            Some("^Tutorial")
        );
        assert_eq!(profile.admin_tokens[0].note.as_deref(), Some("ops"));

        assert_eq!(doc.notifiers[0].interval, Duration::from_secs(5400));
        assert_eq!(doc.notifiers[1].interval, Duration::from_secs(86_400));
        assert!(doc.notifiers[1].recipients.is_empty());
    }

    #[test]
    fn rejects_calendar_relative_interval() {
        let err = ImportDocument::from_toml_str(
            r#"
            [[notifiers]]
            name = "monthly"
            source = "x"
            interval = "P1M"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn overflowing_interval_is_a_parse_error() {
        let err = ImportDocument::from_toml_str(
            r#"
            [[notifiers]]
            name = "forever"
            source = "x"
            interval = "16000000000000w120000000000000d"
            "#,
        );
        assert!(err.is_err());
    }
}
