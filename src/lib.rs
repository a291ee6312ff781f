//! Rango - category and page browsing service
//!
//! This crate provides:
//! - SQLite storage for categories, pages and user accounts
//! - Server-side sessions keyed by an opaque cookie
//! - Per-visitor visit counting held in the session
//! - A JSON HTTP API for browsing, accounts and administration
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use rango::{Config, Rango};
//!
//! let rango = Rango::new(Config::default())?;
//! rango.start_session_cleanup();
//! rango.start_api_server().await?;
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! rango --config ~/.rango/config.toml
//! ```

pub mod accounts;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod populate;
pub mod session;
pub mod slug;
pub mod visits;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{RangoError, Result};

use config::SessionBackend;
use session::{MemoryStore, SessionManager, SessionStore};
use std::sync::Arc;

/// Core service that owns the database and session backend
pub struct Rango {
    /// Configuration
    pub config: Config,

    /// Database connection
    pub db: Arc<Database>,

    /// Session backend
    sessions: SessionStore,
}

impl Rango {
    /// Create a new instance with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(config.db_path())?);
        if let Some(path) = db.path() {
            tracing::info!("Using database at {}", path.display());
        }
        Ok(Self::with_database(config, db))
    }

    /// Create an instance over an existing database
    pub fn with_database(config: Config, db: Arc<Database>) -> Self {
        let sessions = match config.session.backend {
            SessionBackend::Db => SessionStore::Db(db.clone()),
            SessionBackend::Memory => SessionStore::Memory(Arc::new(MemoryStore::new())),
        };
        Rango {
            config,
            db,
            sessions,
        }
    }

    /// Shared state handed to the HTTP handlers
    pub fn app_state(&self) -> api::AppState {
        api::AppState {
            db: self.db.clone(),
            sessions: SessionManager::new(self.sessions.clone(), &self.config.session),
            admin_key: self.config.server.admin_key.clone(),
        }
    }

    /// Start the HTTP API server (blocks until shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!(
            "Starting API server on {} (session backend: {})",
            addr,
            self.sessions.kind()
        );
        api::serve(addr, self.app_state()).await
    }

    /// Load the sample categories and pages
    pub async fn populate(&self) -> Result<populate::PopulateSummary> {
        self.db
            .with_conn(|conn| populate::populate(conn))
            .await
    }

    /// Start the periodic expired-session purge
    ///
    /// Spawns a background task that deletes expired session records at the
    /// configured interval.
    pub fn start_session_cleanup(&self) {
        let interval_minutes = self.config.session.cleanup_interval_minutes;
        if interval_minutes == 0 {
            tracing::info!("Session cleanup is disabled");
            return;
        }

        let store = self.sessions.clone();
        tracing::info!(
            "Starting periodic session cleanup (every {} minutes)",
            interval_minutes
        );

        tokio::spawn(async move {
            use std::time::Duration;

            let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes * 60));

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match store.purge_expired(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Purged {} expired sessions", n),
                    Err(e) => tracing::error!("Session cleanup failed: {}", e),
                }
            }
        });
    }
}
