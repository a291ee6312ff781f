//! Session loading/persisting middleware

use super::{Session, SessionStore};
use crate::config::SessionConfig;
use crate::error::Result;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};

/// Session store plus cookie settings, shared by the middleware
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    cookie_name: String,
    max_age: Duration,
    secure: bool,
}

/// What to do with the client's cookie after persisting
#[derive(Debug, PartialEq, Eq)]
enum CookieAction {
    Keep,
    Set(String),
    Expire,
}

impl SessionManager {
    pub fn new(store: SessionStore, config: &SessionConfig) -> Self {
        SessionManager {
            store,
            cookie_name: config.cookie_name.clone(),
            max_age: Duration::days(config.max_age_days.max(1)),
            secure: config.secure_cookie,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Resolve the session for a presented cookie value.
    ///
    /// Unknown or expired keys get a brand new key rather than adopting the
    /// client-supplied one.
    async fn open(&self, presented: Option<&str>, now: DateTime<Utc>) -> Result<Session> {
        if let Some(key) = presented {
            if let Some(data) = self.store.load(key, now).await? {
                return Ok(Session::loaded(key.to_string(), data));
            }
        }
        Ok(Session::fresh())
    }

    /// Write back whatever the handler changed
    async fn persist(&self, session: &Session, had_cookie: bool, now: DateTime<Utc>) -> Result<CookieAction> {
        let snap = session.snapshot();

        if let Some(old) = snap.loaded_key.as_deref() {
            if old != snap.key {
                self.store.delete(old).await?;
            }
        }

        if !snap.modified {
            return Ok(CookieAction::Keep);
        }

        if snap.data.is_empty() {
            self.store.delete(&snap.key).await?;
            return Ok(if had_cookie {
                CookieAction::Expire
            } else {
                CookieAction::Keep
            });
        }

        self.store.save(&snap.key, &snap.data, now + self.max_age).await?;
        Ok(CookieAction::Set(snap.key))
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time_duration(self.max_age))
            .build()
    }
}

fn time_duration(d: Duration) -> time::Duration {
    time::Duration::seconds(d.num_seconds())
}

fn session_error(e: crate::error::RangoError) -> Response {
    tracing::error!("Session backend failure: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Session storage unavailable" })),
    )
        .into_response()
}

/// Session middleware
///
/// Loads the session named by the cookie (or starts a fresh one), exposes
/// it to handlers through request extensions, and after the handler runs
/// persists any changes and sets or expires the cookie.
pub async fn session_middleware(
    State(manager): State<SessionManager>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let now = Utc::now();
    let presented = jar.get(&manager.cookie_name).map(|c| c.value().to_string());

    let session = match manager.open(presented.as_deref(), now).await {
        Ok(session) => session,
        Err(e) => return session_error(e),
    };

    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    match manager.persist(&session, presented.is_some(), now).await {
        Ok(CookieAction::Keep) => response,
        Ok(CookieAction::Set(key)) => (jar.add(manager.cookie(key)), response).into_response(),
        Ok(CookieAction::Expire) => {
            let removal = Cookie::build((manager.cookie_name.clone(), "")).path("/");
            (jar.remove(removal), response).into_response()
        }
        Err(e) => session_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStore, SessionData};
    use std::sync::Arc;

    fn manager() -> SessionManager {
        SessionManager::new(
            SessionStore::Memory(Arc::new(MemoryStore::new())),
            &SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_untouched_fresh_session_not_saved() {
        let mgr = manager();
        let now = Utc::now();
        let session = mgr.open(None, now).await.unwrap();

        assert_eq!(mgr.persist(&session, false, now).await.unwrap(), CookieAction::Keep);
        assert!(mgr.store().load(&session.key(), now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_modified_session_saved_and_reopened() {
        let mgr = manager();
        let now = Utc::now();
        let session = mgr.open(None, now).await.unwrap();
        session.insert("visits", 1).unwrap();

        let action = mgr.persist(&session, false, now).await.unwrap();
        assert_eq!(action, CookieAction::Set(session.key()));

        let reopened = mgr.open(Some(&session.key()), now).await.unwrap();
        assert_eq!(reopened.key(), session.key());
        assert_eq!(reopened.get::<u64>("visits"), Some(1));
    }

    #[tokio::test]
    async fn test_unknown_key_not_adopted() {
        let mgr = manager();
        let session = mgr.open(Some("attacker-chosen"), Utc::now()).await.unwrap();
        assert_ne!(session.key(), "attacker-chosen");
    }

    #[tokio::test]
    async fn test_cycle_deletes_old_record() {
        let mgr = manager();
        let now = Utc::now();
        let mut data = SessionData::default();
        data.insert("visits", 3).unwrap();
        mgr.store().save("old", &data, now + Duration::days(1)).await.unwrap();

        let session = mgr.open(Some("old"), now).await.unwrap();
        session.cycle_key();
        let action = mgr.persist(&session, true, now).await.unwrap();

        assert!(matches!(action, CookieAction::Set(ref k) if k != "old"));
        assert!(mgr.store().load("old", now).await.unwrap().is_none());
        assert!(mgr.store().load(&session.key(), now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_flush_expires_cookie() {
        let mgr = manager();
        let now = Utc::now();
        let mut data = SessionData::default();
        data.insert("_auth_user_id", 1).unwrap();
        mgr.store().save("k", &data, now + Duration::days(1)).await.unwrap();

        let session = mgr.open(Some("k"), now).await.unwrap();
        session.flush();

        assert_eq!(mgr.persist(&session, true, now).await.unwrap(), CookieAction::Expire);
        assert!(mgr.store().load("k", now).await.unwrap().is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = manager().cookie("abc".to_string());
        assert_eq!(cookie.name(), "sessionid");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
