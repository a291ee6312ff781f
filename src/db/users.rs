//! User account and profile queries

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

/// A registered account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: String,
    pub last_login: Option<String>,
}

/// Optional extras attached one-to-one to a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub website: Option<String>,
    pub picture: Option<String>,
}

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub password_hash: &'a str,
    pub date_joined: &'a str,
}

const COLUMNS: &str = "id, username, email, password_hash, is_active, date_joined, last_login";

fn from_row(row: &Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: row.get(4)?,
        date_joined: row.get(5)?,
        last_login: row.get(6)?,
    })
}

pub fn get_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE username = ?"),
        [username],
        from_row,
    )
    .optional()
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?"),
        [id],
        from_row,
    )
    .optional()
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)",
        [username],
        |row| row.get(0),
    )
}

/// Create a user and its profile atomically, returning the new user id
pub fn insert_with_profile(
    conn: &mut Connection,
    user: &NewUser<'_>,
    profile: &UserProfile,
) -> Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (username, email, password_hash, date_joined) VALUES (?, ?, ?, ?)",
        params![user.username, user.email, user.password_hash, user.date_joined],
    )?;
    let user_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO user_profiles (user_id, website, picture) VALUES (?, ?, ?)",
        params![user_id, profile.website, profile.picture],
    )?;
    tx.commit()?;
    Ok(user_id)
}

pub fn get_profile(conn: &Connection, user_id: i64) -> Result<Option<UserProfile>> {
    conn.query_row(
        "SELECT website, picture FROM user_profiles WHERE user_id = ?",
        [user_id],
        |row| {
            Ok(UserProfile {
                website: row.get(0)?,
                picture: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn set_last_login(conn: &Connection, user_id: i64, at: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_login = ? WHERE id = ?",
        params![at, user_id],
    )?;
    Ok(())
}

pub fn set_active(conn: &Connection, user_id: i64, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET is_active = ? WHERE id = ?",
        params![active, user_id],
    )?;
    Ok(changed > 0)
}
