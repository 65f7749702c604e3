use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use invoicing_server::config::{Config, LogFormat};
use invoicing_server::db;
use invoicing_server::routes::{create_router, AppState};
use serde_json::{json, Value};
use std::{
    fs,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

fn build_router(sqlite_path: String, db_connect_timeout: Duration) -> Router {
    let config = Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        sqlite_path,
        db_pool_size: 4,
        db_connect_timeout,
        session_secret: "integration-test-secret".to_string(),
        secure_cookies: false,
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
        log_format: LogFormat::Text,
    };

    let pool = db::create_pool(&config);
    db::ensure_schema(&pool);
    create_router(AppState::new(pool, config))
}

struct TestApp {
    router: Router,
    db_path: PathBuf,
}

fn temp_path(name: &str, suffix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut path = std::env::temp_dir();
    path.push(format!(
        "invoicing-{name}-{}-{}.{suffix}",
        std::process::id(),
        nanos
    ));
    path
}

impl TestApp {
    fn new(name: &str) -> Self {
        let db_path = temp_path(name, "sqlite");
        let router = build_router(db_path.display().to_string(), Duration::from_secs(5));
        Self { router, db_path }
    }

    /// App whose database path sits under a regular file, so no connection can
    /// ever be opened.
    fn unreachable(name: &str) -> Self {
        let blocker = temp_path(name, "blocker");
        fs::write(&blocker, b"").expect("failed to create blocker file");
        let sqlite_path = blocker.join("invoicing.sqlite").display().to_string();
        let router = build_router(sqlite_path, Duration::from_millis(200));
        Self {
            router,
            db_path: blocker,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, FORM);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("failed to build request"))
            .await
    }

    async fn post_raw(&self, uri: &str, content_type: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("failed to build request"))
            .await
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("failed to build request"))
            .await
    }

    async fn register(&self, email: &str, password: &str) -> Response<Body> {
        let body = format!(
            "firstName=A&lastName=B&email={}&phone=555&password={password}",
            email.replace('@', "%40")
        );
        self.post_form("/register", &body, None).await
    }

    /// Logs in and returns the `name=value` pair to send back as a cookie.
    async fn login(&self, email: &str, password: &str) -> Option<String> {
        let body = format!("email={}&password={password}", email.replace('@', "%40"));
        let resp = self.post_form("/login", &body, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        session_cookie(&resp)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let path = self.db_path.display().to_string();
        for suffix in ["", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{path}{suffix}"));
        }
    }
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect without location")
}

fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("invoicing_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn json_body(resp: Response<Body>) -> Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}

#[tokio::test]
async fn register_login_create_and_list() {
    let app = TestApp::new("e2e");

    let resp = app.register("a@b.com", "pw").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    assert_eq!(app.login("a@b.com", "wrong").await, None);
    let cookie = app.login("a@b.com", "pw").await.expect("no session cookie");

    let me = app.get("/me", Some(&cookie)).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(
        json_body(me).await,
        json!({ "ok": true, "user_id": 1, "name": "A B", "email": "a@b.com" })
    );

    let resp = app
        .post_form(
            "/invoice",
            "invoice_number=INV-1&invoice_date=2025-01-01&due_date=2025-02-01&subtotal=100.00&tax=20.00&total=120.00",
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "ok": true, "invoice_id": 1 }));

    let resp = app.get("/invoices", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        json_body(resp).await,
        json!({
            "ok": true,
            "invoices": [{
                "invoice_number": "INV-1",
                "invoice_date": "2025-01-01",
                "due_date": "2025-02-01",
                "subtotal": 100.0,
                "tax": 20.0,
                "total": 120.0,
                "status": "DRAFT"
            }]
        })
    );
}

#[tokio::test]
async fn login_redirects_to_invoice_page() {
    let app = TestApp::new("login");
    app.register("a@b.com", "pw").await;

    let resp = app
        .post_form("/login", "email=a%40b.com&password=pw", None)
        .await;
    assert_eq!(location(&resp), "/facture");

    let resp = app
        .post_form("/login", "email=a%40b.com&password=nope", None)
        .await;
    assert_eq!(location(&resp), "/login");
    assert_eq!(session_cookie(&resp), None);
}

#[tokio::test]
async fn duplicate_registration_goes_back_to_register() {
    let app = TestApp::new("dup-user");

    assert_eq!(location(&app.register("a@b.com", "pw").await), "/login");
    assert_eq!(location(&app.register("a@b.com", "pw2").await), "/register");

    // The original credentials are untouched.
    assert!(app.login("a@b.com", "pw").await.is_some());
    assert_eq!(app.login("a@b.com", "pw2").await, None);
}

#[tokio::test]
async fn registration_with_missing_fields_uses_empty_strings() {
    let app = TestApp::new("sparse-register");

    let resp = app.post_form("/register", "email=x%40y.com", None).await;
    assert_eq!(location(&resp), "/login");
    assert!(app.login("x@y.com", "").await.is_some());
}

#[tokio::test]
async fn missing_total_is_a_client_error() {
    let app = TestApp::new("missing-total");
    app.register("a@b.com", "pw").await;

    let resp = app
        .post_form(
            "/invoice",
            "user_id=1&invoice_number=INV-1&invoice_date=2025-01-01&due_date=2025-02-01&subtotal=100&tax=20",
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "ok": false, "error": "missing fields" })
    );

    let resp = app.get("/invoices?user_id=1", None).await;
    assert_eq!(json_body(resp).await, json!({ "ok": true, "invoices": [] }));
}

#[tokio::test]
async fn duplicate_invoice_number_is_a_server_error() {
    let app = TestApp::new("dup-invoice");
    app.register("a@b.com", "pw").await;
    app.register("c@d.com", "pw").await;

    let first = "user_id=1&invoice_number=INV-1&invoice_date=2025-01-01&due_date=2025-02-01&subtotal=1&tax=0&total=1";
    let again = "user_id=2&invoice_number=INV-1&invoice_date=2025-03-01&due_date=2025-04-01&subtotal=1&tax=0&total=1";

    assert_eq!(app.post_form("/invoice", first, None).await.status(), StatusCode::OK);

    let resp = app.post_form("/invoice", again, None).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["ok"], json!(false));
}

#[tokio::test]
async fn invoice_for_unknown_user_fails() {
    let app = TestApp::new("unknown-owner");

    let resp = app
        .post_form(
            "/invoice",
            "user_id=99&invoice_number=INV-1&invoice_date=2025-01-01&due_date=2025-02-01&subtotal=1&tax=0&total=1",
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn listing_needs_a_user() {
    let app = TestApp::new("list-anon");

    let resp = app.get("/invoices", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "ok": false, "error": "user_id required" })
    );

    let resp = app.get("/invoices?user_id=", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_orders_by_invoice_date_and_keeps_explicit_status() {
    let app = TestApp::new("list-order");
    app.register("a@b.com", "pw").await;

    for (number, day, status) in [
        ("INV-1", "2025-01-15", "SENT"),
        ("INV-2", "2025-06-01", "PAID"),
        ("INV-3", "2024-11-30", "DRAFT"),
    ] {
        let body = format!(
            "user_id=1&invoice_number={number}&invoice_date={day}&due_date=2025-12-31&subtotal=10.5&tax=2.1&total=12.6&status={status}"
        );
        assert_eq!(app.post_form("/invoice", &body, None).await.status(), StatusCode::OK);
    }

    let listed = json_body(app.get("/invoices?user_id=1", None).await).await;
    let summary: Vec<(String, String)> = listed["invoices"]
        .as_array()
        .expect("invoices array")
        .iter()
        .map(|inv| {
            (
                inv["invoice_number"].as_str().unwrap_or_default().to_string(),
                inv["status"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("INV-2".to_string(), "PAID".to_string()),
            ("INV-1".to_string(), "SENT".to_string()),
            ("INV-3".to_string(), "DRAFT".to_string()),
        ]
    );
    let total = listed["invoices"][0]["total"].as_f64().expect("numeric total");
    assert!((total - 12.6).abs() < 1e-9);
}

#[tokio::test]
async fn me_without_session_is_unauthorized() {
    let app = TestApp::new("me-anon");

    let resp = app.get("/me", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await, json!({ "ok": false }));

    let resp = app
        .get("/me", Some("invoicing_session=forged-value"))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let app = TestApp::new("logout");
    app.register("a@b.com", "pw").await;
    let cookie = app.login("a@b.com", "pw").await.expect("no session cookie");

    let resp = app.post_form("/logout", "", Some(&cookie)).await;
    assert_eq!(location(&resp), "/login");
    let cleared = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("invoicing_session="))
        .expect("removal cookie");
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn static_pages_are_served() {
    let app = TestApp::new("static");

    for (uri, needle) in [
        ("/", "action=\"/login\""),
        ("/login", "action=\"/login\""),
        ("/register", "name=\"firstName\""),
        ("/facture", "facture.js"),
        ("/facture.js", "/invoices"),
    ] {
        let resp = app.get(uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(needle), "{uri} did not contain {needle}");
    }

    for uri in ["/login.css", "/register.css", "/facture.css"] {
        assert_eq!(app.get(uri, None).await.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::new("health");
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn json_invoice_body_counts_as_missing_fields() {
    let app = TestApp::new("json-invoice");
    app.register("a@b.com", "pw").await;

    let resp = app
        .post_raw(
            "/invoice",
            Some("application/json"),
            r#"{"user_id":1,"invoice_number":"INV-1","invoice_date":"2025-01-01","due_date":"2025-02-01","subtotal":1,"tax":0,"total":1}"#,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "ok": false, "error": "missing fields" })
    );
}

#[tokio::test]
async fn repeated_form_key_uses_first_value() {
    let app = TestApp::new("repeated-key");
    app.register("a@b.com", "pw").await;
    app.register("c@d.com", "pw").await;

    let resp = app
        .post_form(
            "/invoice",
            "user_id=1&user_id=2&invoice_number=INV-1&invoice_date=2025-01-01&due_date=2025-02-01&subtotal=1&tax=0&total=1",
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let listed = json_body(app.get("/invoices?user_id=1&user_id=2", None).await).await;
    assert_eq!(listed["invoices"].as_array().map(Vec::len), Some(1));
    assert_eq!(listed["invoices"][0]["invoice_number"], json!("INV-1"));

    let other = json_body(app.get("/invoices?user_id=2&user_id=1", None).await).await;
    assert_eq!(other, json!({ "ok": true, "invoices": [] }));
}

#[tokio::test]
async fn auth_forms_without_urlencoded_body_still_redirect() {
    let app = TestApp::new("bare-auth");

    let resp = app.post_raw("/register", None, "").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = app
        .post_raw(
            "/login",
            Some("application/json"),
            r#"{"email":"a@b.com","password":"pw"}"#,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    assert_eq!(session_cookie(&resp), None);
}

#[tokio::test]
async fn unavailable_store_degrades_per_request() {
    let app = TestApp::unreachable("no-store");

    let resp = app
        .post_form(
            "/invoice",
            "user_id=1&invoice_number=INV-1&invoice_date=2025-01-01&due_date=2025-02-01&subtotal=1&tax=0&total=1",
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["ok"], json!(false));

    let resp = app.get("/invoices?user_id=1", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "ok": true, "invoices": [] }));

    assert_eq!(location(&app.register("a@b.com", "pw").await), "/register");
    assert_eq!(app.login("a@b.com", "pw").await, None);

    assert_eq!(app.get("/health", None).await.status(), StatusCode::OK);
}
