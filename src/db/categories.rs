//! Category queries

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

/// Maximum length of a category name
pub const NAME_MAX_LENGTH: usize = 128;

/// A browsable category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub views: i64,
    pub likes: i64,
}

const COLUMNS: &str = "id, name, slug, views, likes";

fn from_row(row: &Row<'_>) -> Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        views: row.get(3)?,
        likes: row.get(4)?,
    })
}

/// Most-liked categories first
pub fn top_by_likes(conn: &Connection, limit: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM categories ORDER BY likes DESC, id ASC LIMIT ?"
    ))?;
    let rows = stmt.query_map([limit], from_row)?;
    rows.collect()
}

/// All categories ordered by name
pub fn list_all(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM categories ORDER BY name"))?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect()
}

pub fn get_by_slug(conn: &Connection, slug: &str) -> Result<Option<Category>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM categories WHERE slug = ?"),
        [slug],
        from_row,
    )
    .optional()
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Category>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM categories WHERE id = ?"),
        [id],
        from_row,
    )
    .optional()
}

/// True if a category already uses this name or slug
pub fn exists(conn: &Connection, name: &str, slug: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1 OR slug = ?2)",
        params![name, slug],
        |row| row.get(0),
    )
}

/// Insert a category with explicit counters
pub fn insert(conn: &Connection, name: &str, slug: &str, views: i64, likes: i64) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (name, slug, views, likes) VALUES (?, ?, ?, ?)",
        params![name, slug, views, likes],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        slug: slug.to_string(),
        views,
        likes,
    })
}

/// Bump the view counter, returning false if the category is gone
pub fn increment_views(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("UPDATE categories SET views = views + 1 WHERE id = ?", [id])?;
    Ok(changed > 0)
}

/// Bump the like counter and return the new total
pub fn like(conn: &Connection, id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE categories SET likes = likes + 1 WHERE id = ? RETURNING likes",
        [id],
        |row| row.get(0),
    )
    .optional()
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM categories WHERE id = ?", [id])?;
    Ok(changed > 0)
}
