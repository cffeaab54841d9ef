//! SQL DDL for the relay store.
//!
//! `SQLITE_INIT` creates the current layout on an empty database; `MIGRATIONS`
//! lists the forward-only steps that bring an older deployment up to it.
//! Both must agree: after either path the layout is that of
//! [`CURRENT_SCHEMA_VERSION`].

/// Schema version this build expects after startup.
pub const CURRENT_SCHEMA_VERSION: i64 = 3;

/// Baseline schema at [`CURRENT_SCHEMA_VERSION`].
///
/// Plain `CREATE TABLE` on purpose: a database that already holds these tables
/// without a recorded version fails here instead of being silently adopted.
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Version ledger (append-only, current version = MAX(version))
-- ---------------------------------------------------------------------------
CREATE TABLE schema_upgrades (
    version INTEGER NOT NULL
);

-- ---------------------------------------------------------------------------
-- Profiles, their module pipeline and admin tokens
-- ---------------------------------------------------------------------------
CREATE TABLE profile (
    name TEXT PRIMARY KEY NOT NULL,
    source TEXT NOT NULL,
    public INTEGER NOT NULL DEFAULT 0,
    immutable_past INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE module (
    profile TEXT NOT NULL REFERENCES profile(name) ON DELETE CASCADE,
    name TEXT NOT NULL,
    parameters TEXT NOT NULL, -- canonical JSON object, sorted keys
    position INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX idx_module_profile_position ON module(profile, position);

CREATE TABLE admin_tokens (
    token TEXT PRIMARY KEY NOT NULL,
    profile TEXT NOT NULL REFERENCES profile(name) ON DELETE CASCADE,
    note TEXT NULL
);

CREATE INDEX idx_admin_tokens_profile ON admin_tokens(profile);

-- ---------------------------------------------------------------------------
-- Notifiers and the global recipient registry
-- ---------------------------------------------------------------------------
CREATE TABLE notifier (
    name TEXT PRIMARY KEY NOT NULL,
    source TEXT NOT NULL,
    "interval" TEXT NOT NULL -- ISO-8601 duration
);

CREATE TABLE recipients (
    email TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE notifier_recipients (
    notifier TEXT NOT NULL REFERENCES notifier(name) ON DELETE CASCADE,
    recipient TEXT NOT NULL REFERENCES recipients(email) ON DELETE CASCADE,
    PRIMARY KEY (notifier, recipient)
);

CREATE INDEX idx_notifier_recipients_recipient ON notifier_recipients(recipient);
"#;

/// A forward-only schema change. Applied when the recorded version is below
/// `version`, then `version` is appended to the ledger.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Ordered by ascending `version`.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        description: "admin token notes",
        sql: "ALTER TABLE admin_tokens ADD COLUMN note TEXT",
    },
    Migration {
        version: 3,
        description: "explicit module order",
        sql: r#"
ALTER TABLE module ADD COLUMN position INTEGER NOT NULL DEFAULT 0;
UPDATE module SET position = rowid;
CREATE INDEX idx_module_profile_position ON module(profile, position)
"#,
    },
];

/// Splits a script into individual statements. Scripts here never carry
/// semicolons inside literals or comments.
pub(crate) fn statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_strictly_ascending_and_end_at_current() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.last().copied(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn baseline_splits_into_statements() {
        let stmts: Vec<&str> = statements(SQLITE_INIT).collect();
        assert_eq!(stmts.len(), 10);
        assert!(stmts.iter().all(|s| !s.ends_with(';')));
    }
}
