//! Profile persistence: metadata, module pipeline and admin tokens.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::models::{DbAdminToken, DbModule, DbProfile};
use crate::error::StoreError;
use crate::types::{AdminToken, Module, Profile};
use crate::utils::logging::debug_json;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM profile WHERE name = ?)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Profile names, unordered. With `public_only` the private ones are left out.
    pub async fn list_names(&self, public_only: bool) -> Result<Vec<String>, StoreError> {
        let sql = if public_only {
            "SELECT name FROM profile WHERE public = 1"
        } else {
            "SELECT name FROM profile"
        };
        let names = sqlx::query_scalar(sql).fetch_all(&self.pool).await?;
        Ok(names)
    }

    /// Loads a profile with its tokens and ordered modules. `Ok(None)` when no
    /// profile has that name.
    pub async fn read(&self, name: &str) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, DbProfile>(
            r#"
        SELECT name, source, public, immutable_past
        FROM profile
        WHERE name = ?
        "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let tokens = sqlx::query_as::<_, DbAdminToken>(
            r#"
        SELECT token, note
        FROM admin_tokens
        WHERE profile = ?
        ORDER BY token
        "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|t| AdminToken {
            token: t.token,
            note: t.note,
        })
        .collect();

        let modules = self.modules(name).await?;

        let profile = Profile {
            name: row.name,
            source: row.source,
            public: row.public,
            immutable_past: row.immutable_past,
            tokens,
            modules,
        };
        debug_json("profile read", &profile);
        Ok(Some(profile))
    }

    /// Upserts metadata only. Modules and tokens of an existing profile are kept.
    pub async fn write(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
        INSERT INTO profile (name, source, public, immutable_past)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            source = excluded.source,
            public = excluded.public,
            immutable_past = excluded.immutable_past
        "#,
        )
        .bind(&profile.name)
        .bind(&profile.source)
        .bind(profile.public)
        .bind(profile.immutable_past)
        .execute(&self.pool)
        .await?;

        debug!(profile = %profile.name, "profile written");
        Ok(())
    }

    /// Removes the profile; its modules and tokens go with it.
    pub async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM profile WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let deleted = res.rows_affected() > 0;
        debug!(profile = name, deleted, "profile delete");
        Ok(deleted)
    }

    /// The module pipeline in execution order.
    pub async fn modules(&self, profile: &str) -> Result<Vec<Module>, StoreError> {
        let rows = sqlx::query_as::<_, DbModule>(
            r#"
        SELECT name, parameters, position
        FROM module
        WHERE profile = ?
        ORDER BY position, rowid
        "#,
        )
        .bind(profile)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Module::decode(row.name, &row.parameters).map_err(StoreError::from))
            .collect()
    }

    /// Whether a module with this name and exactly these parameters is attached.
    pub async fn module_exists(&self, profile: &str, module: &Module) -> Result<bool, StoreError> {
        let parameters = module.encode_parameters()?;
        let exists: bool = sqlx::query_scalar(
            r#"
        SELECT EXISTS (
            SELECT 1 FROM module WHERE profile = ? AND name = ? AND parameters = ?
        )
        "#,
        )
        .bind(profile)
        .bind(&module.name)
        .bind(&parameters)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Appends the module at the end of the profile's pipeline. Identical
    /// modules are not deduplicated; callers check [`Self::module_exists`].
    pub async fn add_module(&self, profile: &str, module: &Module) -> Result<(), StoreError> {
        let parameters = module.encode_parameters()?;
        sqlx::query(
            r#"
        INSERT INTO module (profile, name, parameters, position)
        VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM module WHERE profile = ?))
        "#,
        )
        .bind(profile)
        .bind(&module.name)
        .bind(&parameters)
        .bind(profile)
        .execute(&self.pool)
        .await?;

        debug!(profile, module = %module.name, %parameters, "module added");
        Ok(())
    }

    /// Removes every module matching name and parameters exactly. Returns the
    /// number of rows removed.
    pub async fn remove_module(&self, profile: &str, module: &Module) -> Result<u64, StoreError> {
        let parameters = module.encode_parameters()?;
        let res = sqlx::query("DELETE FROM module WHERE profile = ? AND name = ? AND parameters = ?")
            .bind(profile)
            .bind(&module.name)
            .bind(&parameters)
            .execute(&self.pool)
            .await?;

        let removed = res.rows_affected();
        if removed == 0 {
            warn!(profile, module = %module.name, %parameters, "no module matched for removal");
        }
        Ok(removed)
    }

    /// Registers a token for `profile`, or updates only its note when the
    /// token already exists. Ownership of an existing token never moves.
    pub async fn add_token(
        &self,
        profile: &str,
        token: &str,
        note: Option<&str>,
    ) -> Result<(), StoreError> {
        AdminToken::validate(token)?;
        sqlx::query(
            r#"
        INSERT INTO admin_tokens (token, profile, note)
        VALUES (?, ?, ?)
        ON CONFLICT(token) DO UPDATE SET
            note = excluded.note
        "#,
        )
        .bind(token)
        .bind(profile)
        .bind(note)
        .execute(&self.pool)
        .await?;

        debug!(profile, has_note = note.is_some(), "admin token written");
        Ok(())
    }

    /// Deletes the token wherever it lives. Tokens are globally unique, so
    /// `profile` does not scope the deletion.
    pub async fn remove_token(&self, profile: &str, token: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM admin_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        let removed = res.rows_affected() > 0;
        debug!(profile, removed, "admin token removed");
        Ok(removed)
    }

    pub async fn token_exists(&self, token: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM admin_tokens WHERE token = ?)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
