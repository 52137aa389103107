//! Acting-user resolution and user profiles.
//!
//! Credentials and token validation live in front of this crate; what
//! reaches here is a raw numeric identity. Every scoped operation takes a
//! [`UserId`], and the only way to get one outside tests is
//! [`resolve_user`], so an unresolved identity never reaches the ledger or
//! the budget engine.

use regex::Regex;
use rusqlite::types::{ToSql, ToSqlOutput};
use tracing::{debug, info};

use crate::db::{Database, UserField};
use crate::error::{Error, Result};
use crate::models::{NewUser, User};

const MIN_USERNAME: usize = 3;
const MAX_USERNAME: usize = 50;

// ASCII-only so it compiles without the regex crate's unicode tables.
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct UserId(i64);

impl UserId {
    #[cfg(test)]
    pub(crate) fn from_raw(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

/// Turn a raw identity into a known user, or fail with `Unauthorized`.
pub(crate) fn resolve_user(db: &Database, raw: Option<&str>) -> Result<UserId> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Unauthorized("no user identity supplied".into()))?;
    let id: i64 = raw
        .parse()
        .map_err(|_| Error::Unauthorized(format!("malformed user identity '{raw}'")))?;
    match db.get_user(id)? {
        Some(user) => {
            debug!(user_id = user.id, username = %user.username, "identity resolved");
            Ok(UserId(user.id))
        }
        None => Err(Error::Unauthorized(format!("unknown user {id}"))),
    }
}

/// Create a user after validating the profile. A taken username or email is
/// a `Conflict`.
pub(crate) fn register_user(db: &Database, new: &NewUser) -> Result<User> {
    let new = normalize_user(new)?;
    ensure_available(db, &new, None)?;
    let id = db.insert_user(&new)?;
    info!(user_id = id, username = %new.username, "user registered");
    load_user(db, id)
}

/// Replace the acting user's profile fields.
pub(crate) fn update_user(db: &Database, user: UserId, new: &NewUser) -> Result<User> {
    let new = normalize_user(new)?;
    ensure_available(db, &new, Some(user.0))?;
    db.update_user(user, &new)?;
    info!(user = %user, "user profile updated");
    load_user(db, user.0)
}

pub(crate) fn get_user(db: &Database, user: UserId) -> Result<User> {
    load_user(db, user.0)
}

fn load_user(db: &Database, id: i64) -> Result<User> {
    db.get_user(id)?
        .ok_or_else(|| Error::not_found(format!("user {id}")))
}

fn ensure_available(db: &Database, new: &NewUser, exclude_id: Option<i64>) -> Result<()> {
    if db.user_field_taken(UserField::Username, &new.username, exclude_id)? {
        return Err(Error::conflict(format!(
            "username '{}' is already taken",
            new.username
        )));
    }
    if let Some(email) = &new.email {
        if db.user_field_taken(UserField::Email, email, exclude_id)? {
            return Err(Error::conflict(format!("email '{email}' is already registered")));
        }
    }
    Ok(())
}

fn normalize_user(new: &NewUser) -> Result<NewUser> {
    let username = new.username.trim();
    let len = username.chars().count();
    if !(MIN_USERNAME..=MAX_USERNAME).contains(&len) {
        return Err(Error::validation(format!(
            "username must be {MIN_USERNAME} to {MAX_USERNAME} characters, got {len}"
        )));
    }
    let email = new
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(Error::validation(format!("'{email}' is not a valid email address")));
        }
    }
    Ok(NewUser {
        username: username.to_string(),
        email: email.map(str::to_lowercase),
        phone: new.phone.trim().to_string(),
        avatar: new.avatar.trim().to_string(),
    })
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN)
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}
