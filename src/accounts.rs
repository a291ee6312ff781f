//! User accounts: registration, authentication and session login state

use crate::db::users::{self, NewUser, User, UserProfile};
use crate::db::Database;
use crate::error::{RangoError, Result};
use crate::forms::{FormErrors, UserForm, UserProfileForm};
use crate::session::Session;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};

/// Session field holding the logged-in user's id
pub const SESSION_USER_KEY: &str = "_auth_user_id";

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
///
/// An unparseable stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Outcome of a registration attempt
#[derive(Debug)]
pub enum Registration {
    Created(User),
    Rejected(FormErrors),
}

/// Create an account from already-cleaned forms
pub async fn register(
    db: &Database,
    user_form: UserForm,
    profile_form: UserProfileForm,
    now: DateTime<Utc>,
) -> Result<Registration> {
    // Hashing runs on the blocking pool
    let password = user_form.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    let date_joined = now.to_rfc3339();

    db.with_conn(move |conn| -> Result<Registration> {
        if users::username_exists(conn, &user_form.username)? {
            let mut errors = FormErrors::default();
            errors.add("username", "A user with that username already exists.");
            return Ok(Registration::Rejected(errors));
        }

        let new_user = NewUser {
            username: &user_form.username,
            email: user_form.email.as_deref(),
            password_hash: &password_hash,
            date_joined: &date_joined,
        };
        let profile = UserProfile {
            website: profile_form.website,
            picture: profile_form.picture,
        };
        let id = users::insert_with_profile(conn, &new_user, &profile)?;
        let user = users::get_by_id(conn, id)?
            .ok_or_else(|| RangoError::NotFound("User", id.to_string()))?;

        tracing::info!("Registered user {}", user.username);
        Ok(Registration::Created(user))
    })
    .await
}

/// Look up a user by credentials. Unknown user or wrong password gives `None`.
///
/// Inactive users are returned; the caller decides how to treat them.
pub async fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<User>> {
    let username = username.to_string();
    let user = db
        .with_conn(move |conn| users::get_by_username(conn, &username))
        .await?;

    let Some(user) = user else {
        return Ok(None);
    };

    let password = password.to_string();
    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?;

    Ok(ok.then_some(user))
}

/// Attach an authenticated user to the session.
///
/// The session key is rotated so a key known before login is useless after.
pub async fn login(db: &Database, session: &Session, user: &User, now: DateTime<Utc>) -> Result<()> {
    session.cycle_key();
    session.insert(SESSION_USER_KEY, user.id)?;

    let id = user.id;
    let at = now.to_rfc3339();
    db.with_conn(move |conn| users::set_last_login(conn, id, &at))
        .await?;

    tracing::info!("User {} logged in", user.username);
    Ok(())
}

/// Drop everything in the session, including the login
pub fn logout(session: &Session) {
    session.flush();
}

/// Resolve the session's logged-in user, if any.
///
/// A session pointing at a missing or deactivated account counts as anonymous.
pub async fn current_user(db: &Database, session: &Session) -> Result<Option<User>> {
    let Some(id) = session.get::<i64>(SESSION_USER_KEY) else {
        return Ok(None);
    };

    let user = db.with_conn(move |conn| users::get_by_id(conn, id)).await?;
    Ok(user.filter(|u| u.is_active))
}
