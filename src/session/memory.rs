//! In-memory session backend.
//!
//! Volatile storage for `backend = "memory"`. All sessions are lost on
//! restart.

use super::SessionData;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug)]
struct Entry {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

/// Process-local session map
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, key: &str, now: DateTime<Utc>) -> Option<SessionData> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.data.clone())
    }

    pub fn save(&self, key: &str, data: SessionData, expires_at: DateTime<Utc>) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(key.to_string(), Entry { data, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.sessions.write().unwrap().remove(key);
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
