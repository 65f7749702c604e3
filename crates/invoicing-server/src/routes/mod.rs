mod auth;
mod form;
mod invoices;
mod pages;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;

use crate::auth::session::SessionKeys;
use crate::config::Config;
use crate::db::DbPool;

pub(crate) const LOGIN_PAGE: &str = "/login";
pub(crate) const REGISTER_PAGE: &str = "/register";
pub(crate) const INVOICE_PAGE: &str = "/facture";

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub session: SessionKeys,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let session = SessionKeys::from_secret(&config.session_secret, config.secure_cookies);
        Self { db, config, session }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.session.key().clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let page = |file: &str| pages::serve(&static_dir, file);

    Router::new()
        .route("/health", get(health))
        // Pages
        .route("/", page("login.html"))
        .route(LOGIN_PAGE, page("login.html").post(auth::login))
        .route(REGISTER_PAGE, page("register.html").post(auth::register))
        .route(INVOICE_PAGE, page("facture.html"))
        // Assets
        .route("/login.css", page("login.css"))
        .route("/register.css", page("register.css"))
        .route("/facture.css", page("facture.css"))
        .route("/facture.js", page("facture.js"))
        // Session
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        // Invoices
        .route("/invoice", post(invoices::create))
        .route("/invoices", get(invoices::list))
        .with_state(state)
}
