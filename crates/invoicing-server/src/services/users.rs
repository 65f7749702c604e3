//! User store: registration and credential checks.
//!
//! Public operations never return errors. Failures are logged here and
//! collapse into `None`, which is all callers act on.

use rusqlite::OptionalExtension;

use crate::auth::password;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedUser, NewUser, UserId};

/// Inserts a user and returns its id, or `None` if the email is taken or the
/// store is unavailable.
pub fn create_user(pool: &DbPool, new_user: &NewUser) -> Option<UserId> {
    insert_user(pool, new_user)
        .inspect_err(|e| e.log("create_user"))
        .ok()
}

/// Email match is exact and case-sensitive.
pub fn authenticate(pool: &DbPool, email: &str, password: &str) -> Option<AuthenticatedUser> {
    check_credentials(pool, email, password)
        .inspect_err(|e| e.log("authenticate"))
        .ok()
        .flatten()
}

fn insert_user(pool: &DbPool, new_user: &NewUser) -> AppResult<UserId> {
    let password_hash = password::hash_password(&new_user.password)?;
    let conn = pool.get()?;

    conn.execute(
        "INSERT INTO users (first_name, last_name, email, phone, password_hash) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            new_user.first_name,
            new_user.last_name,
            new_user.email,
            new_user.phone,
            password_hash
        ],
    )
    .map_err(|e| AppError::from_constraint(e, "A user with this email"))?;

    let user_id = conn.last_insert_rowid();
    tracing::info!(user_id, "Created user");
    Ok(user_id)
}

fn check_credentials(
    pool: &DbPool,
    email: &str,
    password: &str,
) -> AppResult<Option<AuthenticatedUser>> {
    let conn = pool.get()?;

    let row = conn
        .query_row(
            "SELECT id, first_name, last_name, password_hash FROM users WHERE email = ?1",
            rusqlite::params![email],
            |row| {
                let user = AuthenticatedUser {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                };
                Ok((user, row.get::<_, String>(3)?))
            },
        )
        .optional()?;
    drop(conn);

    let Some((user, password_hash)) = row else {
        return Ok(None);
    };

    if password::verify_password(password, &password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
