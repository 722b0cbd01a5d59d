//! End-to-end session handling against a mock backend.
//!
//! Starts an axum server on a random port that issues and checks bearer
//! tokens, then drives `PropertyApi` over real HTTP: login, expiry, refresh
//! and replay, failed refresh, query encoding and timeouts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use homefinder_core::auth::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY};
use homefinder_core::{
    ClientConfig, Credentials, ErrorKind, MemoryStore, PropertyApi, PropertyFilters, SessionStore,
};

#[derive(Default)]
struct Backend {
    valid_access: Option<String>,
    refresh_revoked: bool,
    refresh_calls: usize,
    refresh_with_auth_header: bool,
    property_auth_headers: Vec<Option<String>>,
    last_query: Option<String>,
}

type Shared = Arc<Mutex<Backend>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "No active account found" })))
            .into_response();
    }
    state.lock().unwrap().valid_access = Some("A1".to_string());
    Json(json!({
        "access": "A1",
        "refresh": "R1",
        "user": { "username": body["username"], "email": "maria@example.com" }
    }))
    .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut backend = state.lock().unwrap();
    backend.refresh_calls += 1;
    backend.refresh_with_auth_header |= headers.contains_key(header::AUTHORIZATION);
    if backend.refresh_revoked || body["refresh"] != "R1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Token is invalid or expired" })))
            .into_response();
    }
    backend.valid_access = Some("A2".to_string());
    Json(json!({ "access": "A2" })).into_response()
}

async fn property(State(state): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    let mut backend = state.lock().unwrap();
    let auth = bearer(&headers);
    backend.property_auth_headers.push(auth.clone());
    let expected = backend.valid_access.as_ref().map(|t| format!("Bearer {}", t));
    if auth.is_none() || auth != expected {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Given token not valid" })))
            .into_response();
    }
    Json(json!({
        "id": id,
        "title": "Lake house",
        "description": "",
        "price": "450000.00",
        "property_type": null,
        "listing_type": "sale",
        "bedrooms": 3,
        "bathrooms": "2",
        "square_feet": 1800,
        "address": "12 Shore Rd",
        "city": "Kingston",
        "state": "ON",
        "zip_code": "K7L 1A1",
        "latitude": null,
        "longitude": null,
        "status": "available",
        "owner": null,
        "created_at": "2024-11-02T10:00:00Z",
        "updated_at": "2024-11-02T10:00:00Z",
        "images": []
    }))
    .into_response()
}

async fn list(State(state): State<Shared>, RawQuery(query): RawQuery) -> Json<Value> {
    state.lock().unwrap().last_query = query;
    Json(json!([]))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!([]))
}

/// Start the mock backend; returns its API base URL and shared state.
async fn start_backend() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Backend::default()));
    let app = Router::new()
        .route("/api/users/api/token/", post(login))
        .route("/api/users/api/token/refresh/", post(refresh))
        .route("/api/properties/properties/", get(list))
        .route("/api/properties/properties/{id}/", get(property))
        .route("/api/properties/property-types/", get(slow))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), state)
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        username: "maria".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let (base_url, backend) = start_backend().await;
    let store = Arc::new(MemoryStore::new());
    let api = PropertyApi::new(&ClientConfig::new(base_url), store.clone()).unwrap();

    api.login_user(&credentials("secret")).await.unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));

    // Token still valid: no refresh.
    api.get_property_by_id(1).await.unwrap();
    assert_eq!(backend.lock().unwrap().refresh_calls, 0);

    // Server-side expiry.
    backend.lock().unwrap().valid_access = Some("expired".to_string());
    backend.lock().unwrap().property_auth_headers.clear();

    let property = api.get_property_by_id(1).await.unwrap();
    assert_eq!(property.title, "Lake house");

    {
        let backend = backend.lock().unwrap();
        assert_eq!(backend.refresh_calls, 1);
        assert!(!backend.refresh_with_auth_header);
        assert_eq!(
            backend.property_auth_headers,
            vec![Some("Bearer A1".to_string()), Some("Bearer A2".to_string())]
        );
    }
    assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A2"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));
}

#[tokio::test]
async fn rejected_refresh_clears_session() {
    let (base_url, backend) = start_backend().await;
    let store = Arc::new(MemoryStore::new());
    let api = PropertyApi::new(&ClientConfig::new(base_url), store.clone()).unwrap();

    api.login_user(&credentials("secret")).await.unwrap();
    {
        let mut backend = backend.lock().unwrap();
        backend.valid_access = Some("expired".to_string());
        backend.refresh_revoked = true;
    }

    let err = api.get_property_by_id(1).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionExpired);
    assert_eq!(err.message, "Session expired");
    assert_eq!(err.status, Some(401));
    assert_eq!(backend.lock().unwrap().refresh_calls, 1);

    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY] {
        assert_eq!(store.get(key).await.unwrap(), None, "{} should be cleared", key);
    }
}

#[tokio::test]
async fn bad_password_is_reported_without_refresh() {
    let (base_url, backend) = start_backend().await;
    let store = Arc::new(MemoryStore::new());
    let api = PropertyApi::new(&ClientConfig::new(base_url), store.clone()).unwrap();

    let err = api.login_user(&credentials("wrong")).await.unwrap_err();
    assert_eq!(err.message, "Login failed");
    assert_eq!(err.status, Some(400));
    assert_eq!(err.data.unwrap()["error"], "No active account found");
    assert_eq!(backend.lock().unwrap().refresh_calls, 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn filters_are_sent_as_query_string() {
    let (base_url, backend) = start_backend().await;
    let api = PropertyApi::new(&ClientConfig::new(base_url), Arc::new(MemoryStore::new())).unwrap();

    let filters = PropertyFilters {
        min_price: Some(500000),
        bedrooms: Some(3),
        city: Some(String::new()),
        ..Default::default()
    };
    let properties = api.get_all_properties(&filters).await.unwrap();
    assert!(properties.is_empty());
    assert_eq!(
        backend.lock().unwrap().last_query.as_deref(),
        Some("min_price=500000&bedrooms=3")
    );
}

#[tokio::test]
async fn timeout_is_a_transport_error() {
    let (base_url, _backend) = start_backend().await;
    let config = ClientConfig::new(base_url).with_timeout(Duration::from_millis(200));
    let api = PropertyApi::new(&config, Arc::new(MemoryStore::new())).unwrap();

    let err = api.get_property_types().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(err.status, None);
    assert_eq!(err.message, "Failed to fetch property types");
}
