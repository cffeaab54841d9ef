use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbProfile {
    pub name: String,
    pub source: String,
    pub public: bool,
    pub immutable_past: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbModule {
    pub name: String,
    /// Canonical JSON object without the reserved `name` key.
    pub parameters: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAdminToken {
    pub token: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbNotifier {
    pub name: String,
    pub source: String,
    /// ISO-8601 duration.
    pub interval: String,
}
