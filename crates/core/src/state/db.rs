//! # Unified Sitewright Database
//!
//! Single SQLite database for all persistent state: site snapshots, the
//! three memory tiers, and chat history. This is the persistence
//! collaborator from the orchestration core's point of view - the editor's
//! relational schema lives elsewhere.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::site::SiteState;

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Which memory tier a row belongs to. Each tier has its own table and key
/// space (userId / projectId / sessionId).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTier {
    User,
    Project,
    Session,
}

impl MemoryTier {
    fn table(&self) -> &'static str {
        match self {
            Self::User => "user_memory",
            Self::Project => "project_memory",
            Self::Session => "session_memory",
        }
    }
}

/// A raw memory row: serialized record plus its optimistic version counter.
#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub key: String,
    pub data: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// One persisted chat message.
#[derive(Debug, Clone)]
pub struct ChatMessageRow {
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Unified database manager for all Sitewright state.
pub struct SitewrightDb {
    conn: Arc<Mutex<Connection>>,
}

impl SitewrightDb {
    /// Open or create the database at `.sitewright/sitewright.db`
    pub fn open() -> Result<Self> {
        Self::open_at(".sitewright/sitewright.db")
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path.as_ref()).context("Failed to open sitewright database")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock error: {}", e))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    fn migrate_v1(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sites (
                project_id TEXT PRIMARY KEY,
                site_id    TEXT NOT NULL,
                state      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS user_memory (
                key        TEXT PRIMARY KEY,
                data       TEXT NOT NULL,
                version    INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS project_memory (
                key        TEXT PRIMARY KEY,
                data       TEXT NOT NULL,
                version    INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS session_memory (
                key        TEXT PRIMARY KEY,
                data       TEXT NOT NULL,
                version    INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id         TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chat_messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                ON chat_messages(session_id, id DESC);",
        )?;
        Ok(())
    }

    // === Sites ===

    /// Upsert the serialized SiteState for a project.
    pub fn upsert_site(&self, state: &SiteState) -> Result<()> {
        let json = serde_json::to_string(state).context("Failed to serialize site state")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sites (project_id, site_id, state, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id) DO UPDATE SET
                site_id = excluded.site_id,
                state = excluded.state,
                updated_at = excluded.updated_at",
            params![
                state.project_id,
                state.site_id,
                json,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_site(&self, project_id: &str) -> Result<Option<SiteState>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT state FROM sites WHERE project_id = ?1",
                [project_id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => {
                let state =
                    serde_json::from_str(&json).context("Failed to parse stored site state")?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    // === Memory rows ===

    pub fn get_memory(&self, tier: MemoryTier, key: &str) -> Result<Option<MemoryRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT key, data, version, updated_at FROM {} WHERE key = ?1",
            tier.table()
        );
        let row = conn
            .query_row(&sql, [key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;
        Ok(row.map(|(key, data, version, updated_at)| MemoryRow {
            key,
            data,
            version,
            updated_at: updated_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        }))
    }

    /// Insert a fresh record at version 1. Fails if the key already exists;
    /// get-or-create callers race through `get_memory` first.
    pub fn insert_memory(&self, tier: MemoryTier, key: &str, data: &str) -> Result<()> {
        let conn = self.lock()?;
        let sql = format!(
            "INSERT INTO {} (key, data, version, updated_at) VALUES (?1, ?2, 1, ?3)",
            tier.table()
        );
        conn.execute(&sql, params![key, data, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    /// Compare-and-set update. Returns the new version on success, or `None`
    /// when `expected_version` no longer matches (a concurrent writer won).
    pub fn update_memory(
        &self,
        tier: MemoryTier,
        key: &str,
        data: &str,
        expected_version: i64,
    ) -> Result<Option<i64>> {
        let conn = self.lock()?;
        let sql = format!(
            "UPDATE {} SET data = ?1, version = version + 1, updated_at = ?2
             WHERE key = ?3 AND version = ?4",
            tier.table()
        );
        let changed = conn.execute(
            &sql,
            params![data, Utc::now().to_rfc3339(), key, expected_version],
        )?;
        if changed == 1 {
            Ok(Some(expected_version + 1))
        } else {
            Ok(None)
        }
    }

    // === Chat history ===

    pub fn ensure_chat_session(&self, session_id: &str, project_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO chat_sessions (id, project_id, created_at) VALUES (?1, ?2, ?3)",
            params![session_id, project_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn append_chat_message(&self, session_id: &str, role: &str, content: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO chat_messages (session_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role, content, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Most recent `limit` messages, newest first. Callers reverse for
    /// chronological prompts.
    pub fn recent_chat_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessageRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, role, content, created_at FROM chat_messages
             WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut messages = Vec::new();
        for row in rows {
            let (session_id, role, content, created_at) = row?;
            messages.push(ChatMessageRow {
                session_id,
                role,
                content,
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_roundtrip() {
        let db = SitewrightDb::open_in_memory().unwrap();
        let state = SiteState::new("proj-1", "site-1");

        assert!(db.get_site("proj-1").unwrap().is_none());
        db.upsert_site(&state).unwrap();

        let loaded = db.get_site("proj-1").unwrap().unwrap();
        assert_eq!(loaded.site_id, "site-1");
    }

    #[test]
    fn test_memory_compare_and_set() {
        let db = SitewrightDb::open_in_memory().unwrap();
        db.insert_memory(MemoryTier::User, "u1", "{}").unwrap();

        let row = db.get_memory(MemoryTier::User, "u1").unwrap().unwrap();
        assert_eq!(row.version, 1);

        // Matching version succeeds and bumps
        let v2 = db
            .update_memory(MemoryTier::User, "u1", "{\"a\":1}", 1)
            .unwrap();
        assert_eq!(v2, Some(2));

        // Stale version is rejected
        let stale = db
            .update_memory(MemoryTier::User, "u1", "{\"a\":2}", 1)
            .unwrap();
        assert_eq!(stale, None);
    }

    #[test]
    fn test_chat_messages_newest_first() {
        let db = SitewrightDb::open_in_memory().unwrap();
        db.ensure_chat_session("s1", "p1").unwrap();
        db.append_chat_message("s1", "user", "first").unwrap();
        db.append_chat_message("s1", "assistant", "second").unwrap();
        db.append_chat_message("s1", "user", "third").unwrap();

        let recent = db.recent_chat_messages("s1", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "third");
        assert_eq!(recent[1].content, "second");
    }
}
