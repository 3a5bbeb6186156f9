// ABOUTME: Backing-store boundary trait and its SQLite implementation
// ABOUTME: Narrow query/command interface; unknown rows are Ok(None), never errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! # Backing Store
//!
//! The persistent store is an external collaborator consumed through the
//! narrow [`BackingStore`] interface: look up an auth record, delete one
//! (revocation), and find or publish an artifact. Its schema and engine are
//! deliberately not part of the gateway's design; [`Database`] is the
//! SQLite implementation used in production and tests.
//!
//! A key absent from the store is `Ok(None)` — the caller decides that is
//! a user fault. [`StoreError`] is reserved for the query itself failing.

use crate::models::AuthKeyRecord;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// Failure of a backing-store query or command.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying query failed.
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),
    /// A stored row could not be decoded into its model type.
    #[error("cannot parse store response: {0}")]
    Parse(String),
}

/// Narrow query/command interface against the persistent store.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Look up the authorization record for `key`. `Ok(None)` if the key
    /// is unknown.
    async fn auth_record(&self, key: &str) -> Result<Option<AuthKeyRecord>, StoreError>;

    /// Delete the authorization record for `key`. Deleting an absent key
    /// is not an error.
    async fn delete_auth_record(&self, key: &str) -> Result<(), StoreError>;

    /// Find the artifact payload for an `(os, arch)` pair. Always reads the
    /// latest stored payload; results are never cached.
    async fn find_artifact(&self, os: &str, arch: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace the artifact payload for an `(os, arch)` pair.
    async fn put_artifact(&self, os: &str, arch: &str, data: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration statement fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        // Ensure SQLite creates the database file if it doesn't exist.
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_string()
        };

        let pool = SqlitePool::connect(&connection_options).await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Create the schema if it does not exist yet.
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS auth_keys (
                key TEXT PRIMARY KEY,
                admin INTEGER NOT NULL DEFAULT 0,
                expiration INTEGER NOT NULL DEFAULT 0,
                ip_allow_list TEXT NOT NULL DEFAULT '[]',
                owner TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS artifacts (
                os TEXT NOT NULL,
                arch TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (os, arch)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace an authorization record.
    ///
    /// Provisioning is an operator concern, not a gateway endpoint; this
    /// exists for seeding tools and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or allow-list serialization fails.
    pub async fn upsert_auth_record(&self, record: &AuthKeyRecord) -> Result<(), StoreError> {
        let allow_list = serde_json::to_string(&record.ip_allow_list)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        sqlx::query(
            r"
            INSERT OR REPLACE INTO auth_keys (key, admin, expiration, ip_allow_list, owner)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(&record.key)
        .bind(record.admin)
        .bind(record.expiration)
        .bind(allow_list)
        .bind(&record.owner)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuthKeyRecord, StoreError> {
        let allow_list: String = row.get("ip_allow_list");
        let ip_allow_list = serde_json::from_str(&allow_list)
            .map_err(|e| StoreError::Parse(format!("bad ip_allow_list column: {e}")))?;
        Ok(AuthKeyRecord {
            key: row.get("key"),
            admin: row.get("admin"),
            expiration: row.get("expiration"),
            ip_allow_list,
            owner: row.get("owner"),
        })
    }
}

#[async_trait]
impl BackingStore for Database {
    async fn auth_record(&self, key: &str) -> Result<Option<AuthKeyRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT key, admin, expiration, ip_allow_list, owner FROM auth_keys WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn delete_auth_record(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM auth_keys WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_artifact(&self, os: &str, arch: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT data FROM artifacts WHERE os = ? AND arch = ?")
            .bind(os)
            .bind(arch)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("data")))
    }

    async fn put_artifact(&self, os: &str, arch: &str, data: &str) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO artifacts (os, arch, data, updated_at)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(os)
        .bind(arch)
        .bind(data)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
