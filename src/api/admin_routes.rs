//! Admin listings and deletions, guarded by the admin key

use super::AppState;
use crate::db::{categories, pages};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

fn db_error(e: crate::error::RangoError) -> Response {
    tracing::error!("Admin request failed: {}", e);
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

pub async fn list_categories(State(state): State<AppState>) -> Response {
    match state.db.with_conn(|conn| categories::list_all(conn)).await {
        Ok(categories) => Json(serde_json::json!({
            "total": categories.len(),
            "categories": categories
        }))
        .into_response(),
        Err(e) => db_error(e),
    }
}

/// Pages with their category name, ordered by category then title
pub async fn list_pages(State(state): State<AppState>) -> Response {
    match state.db.with_conn(|conn| pages::list_with_category(conn)).await {
        Ok(pages) => Json(serde_json::json!({
            "total": pages.len(),
            "pages": pages
        }))
        .into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.db.with_conn(move |conn| categories::get_by_id(conn, id)).await {
        Ok(Some(category)) => Json(category).into_response(),
        Ok(None) => not_found("Category"),
        Err(e) => db_error(e),
    }
}

pub async fn delete_category(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.db.with_conn(move |conn| categories::delete(conn, id)).await {
        Ok(true) => {
            tracing::info!("Admin deleted category {}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => not_found("Category"),
        Err(e) => db_error(e),
    }
}

pub async fn get_page(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.db.with_conn(move |conn| pages::get_by_id(conn, id)).await {
        Ok(Some(page)) => Json(page).into_response(),
        Ok(None) => not_found("Page"),
        Err(e) => db_error(e),
    }
}

pub async fn delete_page(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.db.with_conn(move |conn| pages::delete(conn, id)).await {
        Ok(true) => {
            tracing::info!("Admin deleted page {}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => not_found("Page"),
        Err(e) => db_error(e),
    }
}
