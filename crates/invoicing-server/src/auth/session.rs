//! Cookie-carried login session.
//!
//! The session lives entirely in one encrypted cookie; nothing is written to
//! the database. Tampered or undecryptable cookies read as "no session".

use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedUser, UserId};

pub const SESSION_COOKIE: &str = "invoicing_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl SessionUser {
    pub fn new(user: &AuthenticatedUser, email: &str) -> Self {
        Self {
            user_id: user.id,
            user_name: user.display_name(),
            email: email.to_string(),
        }
    }
}

/// Cookie encryption key plus the cookie attributes that depend on deployment.
#[derive(Clone)]
pub struct SessionKeys {
    key: Key,
    secure: bool,
}

impl SessionKeys {
    /// Stretches an arbitrary-length secret into the 64 bytes `Key` requires.
    pub fn from_secret(secret: &str, secure: bool) -> Self {
        let digest = Sha512::digest(secret.as_bytes());
        Self {
            key: Key::from(digest.as_slice()),
            secure,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}

pub fn current(jar: &PrivateCookieJar) -> Option<SessionUser> {
    let cookie = jar.get(SESSION_COOKIE)?;
    match serde_json::from_str(cookie.value()) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed session cookie");
            None
        }
    }
}

pub fn establish(
    jar: PrivateCookieJar,
    keys: &SessionKeys,
    user: &SessionUser,
) -> AppResult<PrivateCookieJar> {
    let value = serde_json::to_string(user)
        .map_err(|e| AppError::Internal(format!("session encoding failed: {e}")))?;
    Ok(jar.add(build_cookie(value, keys.secure)))
}

pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn build_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}
