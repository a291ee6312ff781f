//! Server-side sessions
//!
//! A client carries only an opaque session key in a cookie; the data lives
//! in a [`SessionStore`]. The [`middleware::session_middleware`] layer loads
//! the record before a handler runs and persists it afterwards when the
//! handler changed anything.

pub mod memory;
pub mod middleware;
pub mod store;

pub use memory::MemoryStore;
pub use middleware::{session_middleware, SessionManager};
pub use store::SessionStore;

use crate::error::Result;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex};

/// Key/value session contents, stored as a JSON object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData(serde_json::Map<String, serde_json::Value>);

impl SessionData {
    /// Decode a stored JSON object
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(SessionData(serde_json::from_str(raw)?))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn get_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Typed read; `None` when the field is absent or has another shape
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.0.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Generate a new opaque session key
pub fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug)]
struct SessionInner {
    key: String,
    /// Key the record was loaded under, if it came from the store
    loaded_key: Option<String>,
    data: SessionData,
    modified: bool,
}

/// Per-request session handle.
///
/// Cloning shares the same underlying state; the middleware keeps one clone
/// and hands another to the handler through request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

/// Point-in-time copy of a session taken after the handler finished
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub key: String,
    pub loaded_key: Option<String>,
    pub data: SessionData,
    pub modified: bool,
}

impl Session {
    /// A new, empty session under a freshly generated key
    pub fn fresh() -> Self {
        Self::from_parts(generate_key(), None, SessionData::default())
    }

    /// A session loaded from the store
    pub fn loaded(key: String, data: SessionData) -> Self {
        Self::from_parts(key.clone(), Some(key), data)
    }

    fn from_parts(key: String, loaded_key: Option<String>, data: SessionData) -> Self {
        Session {
            inner: Arc::new(Mutex::new(SessionInner {
                key,
                loaded_key,
                data,
                modified: false,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap()
    }

    pub fn key(&self) -> String {
        self.lock().key.clone()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lock().data.get(key)
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let mut inner = self.lock();
        inner.data.insert(key, value)?;
        inner.modified = true;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut inner = self.lock();
        let removed = inner.data.remove(key);
        if removed.is_some() {
            inner.modified = true;
        }
        removed
    }

    /// Read-modify-write the data under one lock; always marks the session modified
    pub fn update<T>(&self, f: impl FnOnce(&mut SessionData) -> Result<T>) -> Result<T> {
        let mut inner = self.lock();
        let out = f(&mut inner.data)?;
        inner.modified = true;
        Ok(out)
    }

    /// Move the data to a new key; the old record is deleted on persist
    pub fn cycle_key(&self) {
        let mut inner = self.lock();
        inner.key = generate_key();
        inner.modified = true;
    }

    /// Drop all data and the key; the client's cookie is expired on persist
    pub fn flush(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.key = generate_key();
        inner.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            key: inner.key.clone(),
            loaded_key: inner.loaded_key.clone(),
            data: inner.data.clone(),
            modified: inner.modified,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Session layer is not installed",
        ))
    }
}
