//! SessionStore: abstracts the session backend.
//!
//! Uses enum dispatch to support both backends without trait objects.
//! - `Db` variant: SQLite `sessions` table (backend = "db")
//! - `Memory` variant: in-process map (backend = "memory")

use super::{MemoryStore, SessionData};
use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

/// Storage backend for session records
#[derive(Clone)]
pub enum SessionStore {
    /// SQLite database backend
    Db(Arc<Database>),
    /// In-memory backend
    Memory(Arc<MemoryStore>),
}

/// Expiry timestamps are compared as text, so they must share one format
fn expiry_string(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl SessionStore {
    /// Load a live session record. Expired or unknown keys yield `None`.
    pub async fn load(&self, key: &str, now: DateTime<Utc>) -> Result<Option<SessionData>> {
        match self {
            SessionStore::Db(db) => {
                let key = key.to_string();
                let now = expiry_string(now);
                let raw: Option<String> = db
                    .with_conn(move |conn| {
                        conn.query_row(
                            "SELECT data FROM sessions WHERE session_key = ? AND expires_at > ?",
                            params![key, now],
                            |row| row.get(0),
                        )
                        .optional()
                    })
                    .await?;

                match raw {
                    Some(raw) => match SessionData::from_json(&raw) {
                        Ok(data) => Ok(Some(data)),
                        Err(e) => {
                            // A corrupt record is treated as no session at all
                            tracing::warn!("Discarding unreadable session record: {}", e);
                            Ok(None)
                        }
                    },
                    None => Ok(None),
                }
            }
            SessionStore::Memory(store) => Ok(store.load(key, now)),
        }
    }

    /// Insert or replace a record
    pub async fn save(&self, key: &str, data: &SessionData, expires_at: DateTime<Utc>) -> Result<()> {
        match self {
            SessionStore::Db(db) => {
                let key = key.to_string();
                let raw = data.to_json()?;
                let expires_at = expiry_string(expires_at);
                db.with_conn(move |conn| {
                    conn.execute(
                        "INSERT INTO sessions (session_key, data, expires_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(session_key) DO UPDATE SET data = ?2, expires_at = ?3",
                        params![key, raw, expires_at],
                    )
                })
                .await?;
                Ok(())
            }
            SessionStore::Memory(store) => {
                store.save(key, data.clone(), expires_at);
                Ok(())
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        match self {
            SessionStore::Db(db) => {
                let key = key.to_string();
                db.with_conn(move |conn| {
                    conn.execute("DELETE FROM sessions WHERE session_key = ?", [key])
                })
                .await?;
                Ok(())
            }
            SessionStore::Memory(store) => {
                store.delete(key);
                Ok(())
            }
        }
    }

    /// Remove every record whose expiry has passed; returns how many went
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        match self {
            SessionStore::Db(db) => {
                let now = expiry_string(now);
                db.with_conn(move |conn| {
                    conn.execute("DELETE FROM sessions WHERE expires_at <= ?", [now])
                })
                .await
            }
            SessionStore::Memory(store) => Ok(store.purge_expired(now)),
        }
    }

    /// Backend name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SessionStore::Db(_) => "db",
            SessionStore::Memory(_) => "memory",
        }
    }
}
