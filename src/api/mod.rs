//! HTTP API module for Rango
//!
//! JSON endpoints for browsing categories and pages, accounts, and a small
//! admin surface.

mod admin_routes;
mod auth;
pub mod routes;

use crate::db::Database;
use crate::error::{RangoError, Result};
use crate::session::{session_middleware, SessionManager};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use auth::CurrentUser;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: Arc<Database>,
    /// Session store and cookie settings
    pub sessions: SessionManager,
    /// Bearer key for /admin; admin routes are refused when unset
    pub admin_key: Option<String>,
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_router(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RangoError::Api(e.to_string()))?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    // Open to anonymous visitors
    let public_routes = Router::new()
        .route("/", get(routes::index))
        .route("/rango/", get(routes::index))
        .route("/rango/about/", get(routes::about))
        .route("/rango/category/:category_name_slug/", get(routes::show_category))
        .route("/rango/goto/", get(routes::goto_page))
        .route("/rango/register/", post(routes::register))
        .route("/rango/login/", post(routes::user_login));

    // Require a logged-in, active user
    let login_routes = Router::new()
        .route("/rango/add_category/", post(routes::add_category))
        .route(
            "/rango/category/:category_name_slug/add_page/",
            post(routes::add_page),
        )
        .route("/rango/like_category/", post(routes::like_category))
        .route("/rango/restricted/", get(routes::restricted))
        .route("/rango/logout/", post(routes::user_logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    let admin_routes = Router::new()
        .route("/categories", get(admin_routes::list_categories))
        .route(
            "/categories/:id",
            get(admin_routes::get_category).delete(admin_routes::delete_category),
        )
        .route("/pages", get(admin_routes::list_pages))
        .route(
            "/pages/:id",
            get(admin_routes::get_page).delete(admin_routes::delete_page),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_middleware,
        ));

    Router::new()
        // Health check (no session work)
        .route("/health", get(routes::health))
        .merge(
            public_routes
                .merge(login_routes)
                .layer(middleware::from_fn_with_state(
                    state.sessions.clone(),
                    session_middleware,
                )),
        )
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
