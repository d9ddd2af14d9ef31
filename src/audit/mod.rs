//! Audit log — SQLite-based history of vault mutations.
//!
//! Records every `set` and `remove` in a local SQLite database at
//! `<state_dir>/audit.db`. Only targets and operation names are stored,
//! never secrets.
//!
//! Logging degrades gracefully: if the database can't be opened or
//! written to, the vault operation still succeeds.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::errors::{CredVaultError, Result};

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub target: String,
    pub kind: String,
    pub details: Option<String>,
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<state_dir>/audit.db`.
    ///
    /// Returns `None` if the database can't be opened — callers should
    /// treat this as "audit logging unavailable" and continue normally.
    pub fn open(state_dir: &Path) -> Option<Self> {
        std::fs::create_dir_all(state_dir).ok()?;
        let db_path = Self::db_path(state_dir);
        let conn = Connection::open(&db_path).ok()?;

        // Owner-only permissions on the database.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                target      TEXT NOT NULL,
                kind        TEXT NOT NULL,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Errors are ignored.
    pub fn log(&self, operation: &str, target: &str, kind: &str, details: Option<&str>) {
        let now = Utc::now().to_rfc3339();
        let _ = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, target, kind, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![now, operation, target, kind, details],
        );
    }

    /// Most recent entries first, at most `limit`, optionally only those
    /// at or after `since`.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let since = since.map(|ts| ts.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, target, kind, details
                 FROM audit_log
                 WHERE ?1 IS NULL OR timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| CredVaultError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![since, limit_i64], |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    target: row.get(3)?,
                    kind: row.get(4)?,
                    details: row.get(5)?,
                })
            })
            .map_err(|e| CredVaultError::AuditError(format!("query exec: {e}")))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CredVaultError::AuditError(format!("row parse: {e}")))
    }

    /// Path to the audit database inside `state_dir`.
    pub fn db_path(state_dir: &Path) -> PathBuf {
        state_dir.join("audit.db")
    }
}
