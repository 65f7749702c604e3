use axum::{
    extract::State,
    response::Redirect,
    Json,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Serialize;

use super::form::FormFields;
use super::{AppState, INVOICE_PAGE, LOGIN_PAGE, REGISTER_PAGE};
use crate::auth::session::{self, SessionUser};
use crate::error::AppResult;
use crate::models::{NewUser, UserId};
use crate::services::users;

/// Absent fields become empty strings; nothing else is validated here.
fn new_user(mut fields: FormFields) -> NewUser {
    NewUser {
        first_name: fields.take_or_empty("firstName"),
        last_name: fields.take_or_empty("lastName"),
        email: fields.take_or_empty("email"),
        phone: fields.take_or_empty("phone"),
        password: fields.take_or_empty("password"),
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub ok: bool,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// POST /register
pub async fn register(State(state): State<AppState>, fields: FormFields) -> Redirect {
    match users::create_user(&state.db, &new_user(fields)) {
        Some(_) => Redirect::to(LOGIN_PAGE),
        None => Redirect::to(REGISTER_PAGE),
    }
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut fields: FormFields,
) -> AppResult<(PrivateCookieJar, Redirect)> {
    let email = fields.take_or_empty("email");
    let password = fields.take_or_empty("password");

    match users::authenticate(&state.db, &email, &password) {
        Some(user) => {
            tracing::info!(user_id = user.id, "User logged in");
            let session_user = SessionUser::new(&user, &email);
            let jar = session::establish(jar, &state.session, &session_user)?;
            Ok((jar, Redirect::to(INVOICE_PAGE)))
        }
        None => Ok((jar, Redirect::to(LOGIN_PAGE))),
    }
}

/// POST /logout
pub async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (session::clear(jar), Redirect::to(LOGIN_PAGE))
}

/// GET /me
pub async fn me(user: SessionUser) -> Json<MeResponse> {
    Json(MeResponse {
        ok: true,
        user_id: user.user_id,
        name: user.user_name,
        email: user.email,
    })
}
