//! Page queries

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

/// Maximum length of a page title
pub const TITLE_MAX_LENGTH: usize = 128;
/// Maximum length of a page URL
pub const URL_MAX_LENGTH: usize = 200;

/// A link filed under a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub url: String,
    pub views: i64,
}

/// Page row joined with its category name, as shown in the admin listing
#[derive(Debug, Clone, Serialize)]
pub struct PageListing {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub url: String,
}

const COLUMNS: &str = "id, category_id, title, url, views";

fn from_row(row: &Row<'_>) -> Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        category_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        views: row.get(4)?,
    })
}

/// Most-viewed pages first
pub fn top_by_views(conn: &Connection, limit: i64) -> Result<Vec<Page>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM pages ORDER BY views DESC, id ASC LIMIT ?"
    ))?;
    let rows = stmt.query_map([limit], from_row)?;
    rows.collect()
}

/// Pages belonging to one category, most-viewed first
pub fn for_category(conn: &Connection, category_id: i64) -> Result<Vec<Page>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM pages WHERE category_id = ? ORDER BY views DESC, id ASC"
    ))?;
    let rows = stmt.query_map([category_id], from_row)?;
    rows.collect()
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Page>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM pages WHERE id = ?"),
        [id],
        from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, category_id: i64, title: &str, url: &str, views: i64) -> Result<Page> {
    conn.execute(
        "INSERT INTO pages (category_id, title, url, views) VALUES (?, ?, ?, ?)",
        params![category_id, title, url, views],
    )?;
    Ok(Page {
        id: conn.last_insert_rowid(),
        category_id,
        title: title.to_string(),
        url: url.to_string(),
        views,
    })
}

/// Count a click-through and return the target URL
pub fn record_view(conn: &Connection, id: i64) -> Result<Option<String>> {
    conn.query_row(
        "UPDATE pages SET views = views + 1 WHERE id = ? RETURNING url",
        [id],
        |row| row.get(0),
    )
    .optional()
}

/// Admin listing: title, category name, url
pub fn list_with_category(conn: &Connection) -> Result<Vec<PageListing>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, c.name, p.url
         FROM pages p JOIN categories c ON c.id = p.category_id
         ORDER BY c.name, p.title",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PageListing {
            id: row.get(0)?,
            title: row.get(1)?,
            category: row.get(2)?,
            url: row.get(3)?,
        })
    })?;
    rows.collect()
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM pages WHERE id = ?", [id])?;
    Ok(changed > 0)
}
