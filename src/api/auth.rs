//! Access control middleware: logged-in users and admin key

use super::AppState;
use crate::accounts;
use crate::db::users::User;
use crate::session::Session;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// The authenticated user, placed in request extensions by [`require_login`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Login-required middleware
///
/// Resolves the session's user. Anonymous requests (and sessions whose user
/// has been deactivated) are refused with 401.
pub async fn require_login(
    State(state): State<AppState>,
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match accounts::current_user(&state.db, &session).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Login required",
                "login_url": "/rango/login/"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to resolve session user: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Admin key middleware
///
/// Expected format: `Authorization: Bearer <admin_key>`.
/// If no admin key is configured, the admin routes are closed.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_key) = &state.admin_key else {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": "Admin interface is disabled. Set server.admin_key to enable it."
            })),
        )
            .into_response();
    };

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    match auth_header.and_then(bearer_token) {
        Some(provided_key) if provided_key == expected_key => next.run(request).await,
        Some(_) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Invalid admin key"
            })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Admin key required. Set Authorization: Bearer <admin_key>"
            })),
        )
            .into_response(),
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}
