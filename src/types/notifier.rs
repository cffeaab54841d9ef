use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A scheduled notification: which calendar to watch, how often, and who to tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifier {
    pub name: String,
    pub source: String,
    #[serde(with = "crate::utils::interval")]
    pub interval: Duration,
    /// Subscribed addresses. Only populated when read with recipients;
    /// `write` never persists this field.
    #[serde(default)]
    pub recipients: BTreeSet<String>,
}

impl Notifier {
    pub fn new(name: impl Into<String>, source: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            interval,
            recipients: BTreeSet::new(),
        }
    }
}
