//! HTTP route handlers

use super::{AppState, CurrentUser};
use crate::accounts::{self, Registration};
use crate::db::{categories, pages};
use crate::error::RangoError;
use crate::forms::{CategoryForm, FormErrors, LoginForm, PageForm, RegistrationForm};
use crate::session::Session;
use crate::slug::slugify;
use crate::visits;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const INDEX_URL: &str = "/rango/";
const BOLD_MESSAGE: &str = "Crunchy, creamy, cookie, candy, cupcake!";
const TOP_N: i64 = 5;

fn internal_error(e: RangoError) -> Response {
    tracing::error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("{} not found", what) })),
    )
        .into_response()
}

/// Count this request against the visitor's session.
///
/// Visit tracking never fails a page view; a write failure is logged and
/// the page reports a single visit.
fn track_visit(session: &Session, now: DateTime<Utc>) -> u64 {
    visits::track_session(session, now).unwrap_or_else(|e| {
        tracing::error!("Visit tracking failed: {}", e);
        1
    })
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Browsing
// ============================================================================

pub async fn index(State(state): State<AppState>, session: Session) -> Response {
    let visits = track_visit(&session, Utc::now());

    let result = state
        .db
        .with_conn(|conn| {
            let categories = categories::top_by_likes(conn, TOP_N)?;
            let pages = pages::top_by_views(conn, TOP_N)?;
            Ok::<_, rusqlite::Error>((categories, pages))
        })
        .await;

    match result {
        Ok((categories, pages)) => Json(serde_json::json!({
            "boldmessage": BOLD_MESSAGE,
            "categories": categories,
            "pages": pages,
            "visits": visits
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn about(session: Session) -> impl IntoResponse {
    let visits = track_visit(&session, Utc::now());
    Json(serde_json::json!({ "visits": visits }))
}

pub async fn show_category(
    State(state): State<AppState>,
    Path(category_name_slug): Path<String>,
) -> Response {
    let result = state
        .db
        .with_conn(move |conn| {
            let Some(category) = categories::get_by_slug(conn, &category_name_slug)? else {
                return Ok(None);
            };
            categories::increment_views(conn, category.id)?;
            let pages = pages::for_category(conn, category.id)?;
            let category = categories::Category {
                views: category.views + 1,
                ..category
            };
            Ok::<_, rusqlite::Error>(Some((category, pages)))
        })
        .await;

    match result {
        Ok(Some((category, pages))) => Json(serde_json::json!({
            "category": category,
            "pages": pages
        }))
        .into_response(),
        // Unknown slug renders an empty category rather than a 404
        Ok(None) => Json(serde_json::json!({
            "category": null,
            "pages": null
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct GotoQuery {
    pub page_id: Option<i64>,
}

/// Count a click-through and send the browser to the page's URL
pub async fn goto_page(State(state): State<AppState>, Query(query): Query<GotoQuery>) -> Response {
    let Some(page_id) = query.page_id else {
        return Redirect::to(INDEX_URL).into_response();
    };

    match state
        .db
        .with_conn(move |conn| pages::record_view(conn, page_id))
        .await
    {
        Ok(Some(url)) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Ok(None) => Redirect::to(INDEX_URL).into_response(),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Categories and pages (login required)
// ============================================================================

pub async fn add_category(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(form): Json<CategoryForm>,
) -> Response {
    let form = match form.clean() {
        Ok(form) => form,
        Err(errors) => return errors.into_response(),
    };
    let slug = slugify(&form.name);
    if slug.is_empty() {
        let mut errors = FormErrors::default();
        errors.add("name", "Category name must contain at least one letter or digit.");
        return errors.into_response();
    }

    let result = state
        .db
        .with_conn(move |conn| {
            if categories::exists(conn, &form.name, &slug)? {
                return Ok(None);
            }
            categories::insert(conn, &form.name, &slug, 0, 0).map(Some)
        })
        .await;

    match result {
        Ok(Some(category)) => {
            tracing::info!("{} added category {}", user.username, category.name);
            (StatusCode::CREATED, Json(category)).into_response()
        }
        Ok(None) => {
            let mut errors = FormErrors::default();
            errors.add("name", "Category with this Name already exists.");
            errors.into_response()
        }
        Err(e) => internal_error(e),
    }
}

pub async fn add_page(
    State(state): State<AppState>,
    Path(category_name_slug): Path<String>,
    Json(form): Json<PageForm>,
) -> Response {
    let category = match state
        .db
        .with_conn(move |conn| categories::get_by_slug(conn, &category_name_slug))
        .await
    {
        Ok(Some(category)) => category,
        Ok(None) => return Redirect::to(INDEX_URL).into_response(),
        Err(e) => return internal_error(e),
    };

    let form = match form.clean() {
        Ok(form) => form,
        Err(errors) => return errors.into_response(),
    };

    let category_id = category.id;
    match state
        .db
        .with_conn(move |conn| pages::insert(conn, category_id, &form.title, &form.url, 0))
        .await
    {
        Ok(page) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "category": category,
                "page": page
            })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub category_id: i64,
}

pub async fn like_category(State(state): State<AppState>, Json(req): Json<LikeRequest>) -> Response {
    let id = req.category_id;
    match state.db.with_conn(move |conn| categories::like(conn, id)).await {
        Ok(Some(likes)) => Json(serde_json::json!({
            "category_id": id,
            "likes": likes
        }))
        .into_response(),
        Ok(None) => not_found("Category"),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Accounts
// ============================================================================

pub async fn register(State(state): State<AppState>, Json(form): Json<RegistrationForm>) -> Response {
    let (user_form, profile_form) = match form.clean() {
        Ok(forms) => forms,
        Err(errors) => {
            tracing::debug!("Registration rejected: {:?}", errors);
            return errors.into_response();
        }
    };

    match accounts::register(&state.db, user_form, profile_form, Utc::now()).await {
        Ok(Registration::Created(user)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "registered": true,
                "user": user
            })),
        )
            .into_response(),
        Ok(Registration::Rejected(errors)) => errors.into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn user_login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Response {
    let user = match accounts::authenticate(&state.db, &form.username, &form.password).await {
        Ok(user) => user,
        Err(e) => return internal_error(e),
    };

    let Some(user) = user else {
        tracing::warn!("Invalid login details for username {:?}", form.username);
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Invalid login details supplied" })),
        )
            .into_response();
    };

    if !user.is_active {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Your Rango account is disabled" })),
        )
            .into_response();
    }

    match accounts::login(&state.db, &session, &user, Utc::now()).await {
        Ok(()) => Redirect::to(INDEX_URL).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn restricted(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Since you're logged in, you can see this text!",
        "username": user.username
    }))
}

pub async fn user_logout(session: Session) -> Response {
    accounts::logout(&session);
    Redirect::to(INDEX_URL).into_response()
}
