use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};

use crate::auth::session::{self, SessionUser};
use crate::error::AppError;

async fn session_jar<S>(parts: &mut Parts, state: &S) -> PrivateCookieJar
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    }
}

/// Requires an active session; rejects with 401 otherwise.
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = session_jar(parts, state).await;
        session::current(&jar).ok_or(AppError::Unauthorized)
    }
}

/// `Option<SessionUser>` never rejects; handlers fall back to explicit ids.
impl<S> OptionalFromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let jar = session_jar(parts, state).await;
        Ok(session::current(&jar))
    }
}
