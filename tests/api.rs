//! HTTP-level tests against the in-memory store.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sleeptrack::{
    auth::{
        password::hash_password,
        repo_types::{NewUser, Role},
    },
    build_app,
    config::AppConfig,
    records::repo_types::{NewRecord, Record},
    store::{memory::MemoryStore, RecordStore, StoreError, UserStore},
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Record store whose backend is always down.
struct DownRecords;

#[async_trait]
impl RecordStore for DownRecords {
    async fn list_by_owner(&self, _owner: Uuid) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }

    async fn insert(&self, _new: NewRecord) -> Result<Record, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }

    async fn delete_owned(&self, _owner: Uuid, _id: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }
}

async fn seeded(production: bool) -> Router {
    let mut config = AppConfig::for_tests();
    config.production = production;
    let state = AppState::in_memory(config);
    for (name, email) in [("Alice", "A@B.com"), ("Bob", "bob@example.com")] {
        state
            .users
            .create(NewUser {
                name: name.into(),
                email: email.into(),
                password_hash: Some(hash_password("secret").unwrap()),
                role: Role::User,
            })
            .await
            .unwrap();
    }
    build_app(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, json)
}

fn set_cookie(headers: &HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .unwrap()
        .to_string()
}

/// `token=<jwt>` pair suitable for a Cookie request header.
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

async fn login(app: &Router, email: &str) -> String {
    let (status, headers, _) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie_pair(&set_cookie(&headers))
}

#[tokio::test]
async fn health() {
    let app = seeded(false).await;
    let (status, _, _) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_normalizes_email_and_sets_session_cookie() {
    let app = seeded(false).await;
    let (status, headers, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "a@b.com", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["name"], "Alice");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body.get("token").is_none());

    let cookie = set_cookie(&headers);
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn production_cookie_is_secure() {
    let app = seeded(true).await;
    let (status, headers, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "bob@example.com", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie(&headers).contains("Secure"));
}

#[tokio::test]
async fn login_failures() {
    let app = seeded(false).await;
    let (s1, _, wrong) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "bob@example.com", "password": "nope"})),
    )
    .await;
    let (s2, _, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "carol@example.com", "password": "nope"})),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["message"], "Invalid credentials");

    let (s3, _, missing) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    assert_eq!(s3, StatusCode::BAD_REQUEST);
    assert_eq!(missing["message"], "Missing required fields");

    let (s4, _, _) = send(&app, "POST", "/api/auth/login", None, None).await;
    assert_eq!(s4, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_collapses_to_null_user() {
    let app = seeded(false).await;
    let (status, _, body) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user": null}));

    let (status, _, body) =
        send(&app, "GET", "/api/auth/me", Some("token=not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user": null}));

    let cookie = login(&app, "bob@example.com").await;
    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "bob@example.com");
    assert_eq!(body["user"]["name"], "Bob");
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let app = seeded(false).await;
    let cookie = login(&app, "bob@example.com").await;
    let token = cookie.trim_start_matches("token=").to_string();
    let req = Request::builder()
        .uri("/api/records")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn records_require_identity() {
    let app = seeded(false).await;
    let (s, _, body) = send(&app, "GET", "/api/records", None, None).await;
    assert_eq!(s, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");

    let (s, _, _) = send(
        &app,
        "POST",
        "/api/records",
        None,
        Some(json!({"date": "2024-01-01", "amount": 8})),
    )
    .await;
    assert_eq!(s, StatusCode::UNAUTHORIZED);

    let (s, _, _) = send(
        &app,
        "DELETE",
        "/api/records/00000000-0000-0000-0000-000000000000",
        Some("token=forged"),
        None,
    )
    .await;
    assert_eq!(s, StatusCode::UNAUTHORIZED);

    let (s, _, _) = send(&app, "GET", "/api/records/summary", None, None).await;
    assert_eq!(s, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn record_lifecycle_is_owner_scoped() {
    let app = seeded(false).await;
    let alice = login(&app, "a@b.com").await;
    let bob = login(&app, "bob@example.com").await;

    for (date, amount) in [("2024-01-02", 7.0), ("2024-01-05", 8.5), ("2024-01-01", 6.0)] {
        let (s, _, rec) = send(
            &app,
            "POST",
            "/api/records",
            Some(&alice),
            Some(json!({"date": date, "amount": amount})),
        )
        .await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(rec["date"], date);
        assert_eq!(rec["text"], "");
    }

    let (s, _, body) = send(
        &app,
        "POST",
        "/api/records",
        Some(&alice),
        Some(json!({"date": "2024-01-03"})),
    )
    .await;
    assert_eq!(s, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields");

    let (s, _, list) = send(&app, "GET", "/api/records", Some(&alice), None).await;
    assert_eq!(s, StatusCode::OK);
    let dates: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-05", "2024-01-02", "2024-01-01"]);
    let first_id = list[0]["id"].as_str().unwrap().to_string();

    let (s, _, bob_list) = send(&app, "GET", "/api/records", Some(&bob), None).await;
    assert_eq!(s, StatusCode::OK);
    assert_eq!(bob_list, json!([]));

    let (s, _, body) = send(
        &app,
        "DELETE",
        &format!("/api/records/{first_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(s, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Record not found or not authorized");

    let (_, _, list) = send(&app, "GET", "/api/records", Some(&alice), None).await;
    assert_eq!(list.as_array().unwrap().len(), 3);

    let (s, _, body) = send(
        &app,
        "DELETE",
        &format!("/api/records/{first_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(s, StatusCode::OK);
    assert_eq!(body["message"], "Record deleted");

    let (s, _, summary) = send(&app, "GET", "/api/records/summary", Some(&alice), None).await;
    assert_eq!(s, StatusCode::OK);
    assert_eq!(summary["count"], 2);
    assert_eq!(summary["average"], 6.5);
    assert_eq!(summary["best"], 7.0);
    assert_eq!(summary["shortest"], 6.0);
    assert_eq!(summary["trend"][0]["date"], "2024-01-01");
}

#[tokio::test]
async fn register_then_logout() {
    let app = seeded(false).await;
    let (s, headers, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Carol", "email": "Carol@Example.com", "password": "longenough"})),
    )
    .await;
    assert_eq!(s, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "carol@example.com");
    let cookie = cookie_pair(&set_cookie(&headers));

    let (_, _, me) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(me["user"]["name"], "Carol");

    let (s, _, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Dup", "email": "bob@example.com", "password": "longenough"})),
    )
    .await;
    assert_eq!(s, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");

    let (s, headers, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(s, StatusCode::OK);
    let cleared = set_cookie(&headers);
    assert!(cleared.starts_with("token=;") || cleared.starts_with("token=\"\""));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn delete_on_summary_path_is_a_missing_record() {
    let app = seeded(false).await;
    let (s, _, _) = send(&app, "DELETE", "/api/records/summary", None, None).await;
    assert_eq!(s, StatusCode::UNAUTHORIZED);

    let bob = login(&app, "bob@example.com").await;
    let (s, _, body) = send(&app, "DELETE", "/api/records/summary", Some(&bob), None).await;
    assert_eq!(s, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Record not found or not authorized");
}

#[tokio::test]
async fn store_failure_is_a_generic_500() {
    let users = Arc::new(MemoryStore::new());
    users
        .create(NewUser {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            password_hash: Some(hash_password("secret").unwrap()),
            role: Role::User,
        })
        .await
        .unwrap();
    let state = AppState::from_parts(AppConfig::for_tests(), users, Arc::new(DownRecords));
    let app = build_app(state);
    let bob = login(&app, "bob@example.com").await;

    let (s, _, body) = send(&app, "GET", "/api/records", Some(&bob), None).await;
    assert_eq!(s, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "Internal server error"}));

    let (s, _, body) = send(
        &app,
        "POST",
        "/api/records",
        Some(&bob),
        Some(json!({"date": "2024-01-01", "amount": 7})),
    )
    .await;
    assert_eq!(s, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.to_string().contains("connection refused"));
}
