//! In-process mock of the coaching platform backend.
#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, RETRY_AFTER};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use coach_client::{ApiClient, ClientConfig, MemoryTokenStore, Navigator, Route};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEACHER_EMAIL: &str = "teacher@example.com";
pub const STUDENT_EMAIL: &str = "student@example.com";
pub const PASSWORD: &str = "secret";
pub const TEACHER_TOKEN: &str = "abc";
pub const STUDENT_TOKEN: &str = "def";
/// `/auth/me` answers 200 with `success: false` for this token.
pub const DECLINED_TOKEN: &str = "declined";
/// `/auth/me` answers 200 with `user: null` for this token.
pub const USERLESS_TOKEN: &str = "userless";

#[derive(Default)]
pub struct MockState {
    pub flaky_calls: AtomicU32,
    pub expired_calls: AtomicU32,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start the mock on an ephemeral port; routes live under `/api`.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/change-password", put(change_password))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/{token}", put(reset_password))
        .route("/auth/verify-email/{token}", get(verify_email))
        .route("/echo", get(echo))
        .route("/unavailable", get(unavailable))
        .route("/unavailable-bare", get(unavailable_bare))
        .route("/unavailable-overflow", get(unavailable_overflow))
        .route("/accepted", get(accepted))
        .route("/expired", get(expired))
        .route("/missing", get(missing))
        .route("/slow", get(slow))
        .route("/flaky", get(flaky))
        .route("/notifications", get(notifications))
        .route("/notifications/stream", get(notification_stream));
    let app = Router::new().nest("/api", api).with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}/api"),
        state,
        handle,
    }
}

/// An address nothing listens on.
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

/// Records every navigation.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

pub struct TestClient {
    pub client: ApiClient,
    pub tokens: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn client_for(base_url: &str) -> TestClient {
    client_with(ClientConfig::new(base_url).unwrap(), MemoryTokenStore::new())
}

pub fn client_with(config: ClientConfig, tokens: MemoryTokenStore) -> TestClient {
    let tokens = Arc::new(tokens);
    let navigator = Arc::new(RecordingNavigator::default());
    let client = ApiClient::builder(config)
        .token_store(tokens.clone())
        .navigator(navigator.clone())
        .build()
        .unwrap();
    TestClient {
        client,
        tokens,
        navigator,
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn user_for(token: &str) -> Option<Value> {
    match token {
        TEACHER_TOKEN => Some(json!({
            "_id": "u-teacher",
            "role": "teacher",
            "firstName": "Ayşe",
            "lastName": "Yılmaz",
            "email": TEACHER_EMAIL,
            "school": "Atatürk Lisesi"
        })),
        STUDENT_TOKEN => Some(json!({
            "_id": "u-student",
            "role": "student",
            "firstName": "Deniz",
            "email": STUDENT_EMAIL
        })),
        _ => None,
    }
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "message": message })))
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    let token = match (body["email"].as_str(), body["password"].as_str()) {
        (Some(TEACHER_EMAIL), Some(PASSWORD)) => TEACHER_TOKEN,
        (Some(STUDENT_EMAIL), Some(PASSWORD)) => STUDENT_TOKEN,
        _ => return unauthorized("Invalid credentials"),
    };
    Json(json!({ "success": true, "token": token, "user": user_for(token) })).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Email already registered" })),
        )
            .into_response();
    }
    let user = json!({
        "_id": "u-new",
        "firstName": body["firstName"],
        "lastName": body["lastName"],
        "email": body["email"],
        "role": body["role"],
        "grade": body["grade"],
    });
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "token": "reg-token", "user": user })),
    )
        .into_response()
}

async fn me(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(DECLINED_TOKEN) => {
            return Json(json!({ "success": false, "message": "Account disabled" }))
                .into_response();
        }
        Some(USERLESS_TOKEN) => return Json(json!({ "user": null })).into_response(),
        _ => {}
    }
    match bearer(&headers).and_then(user_for) {
        Some(user) => Json(json!({ "success": true, "user": user })).into_response(),
        None => unauthorized("Token is not valid"),
    }
}

async fn change_password(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if bearer(&headers).and_then(user_for).is_none() {
        return unauthorized("Not authorized");
    }
    if body["currentPassword"] != PASSWORD {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": [{ "msg": "Current password is incorrect" }] })),
        )
            .into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn forgot_password(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": format!("Reset link sent to {}", body["email"].as_str().unwrap_or_default()),
    }))
}

async fn reset_password(Path(token): Path<String>, Json(body): Json<Value>) -> Response {
    if token != "reset token/1" || body["password"].as_str().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Reset token is invalid or has expired" })),
        )
            .into_response();
    }
    Json(json!({ "success": true, "message": "Password has been reset" })).into_response()
}

async fn verify_email(Path(token): Path<String>) -> Json<Value> {
    if token == "verify-1" {
        Json(json!({ "success": true, "message": "Email verified" }))
    } else {
        Json(json!({ "success": false, "message": "Verification link expired" }))
    }
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "authorization": header("authorization"),
        "client": header("x-client"),
    }))
}

async fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "Database is starting", "retryAfter": 10 })),
    )
        .into_response()
}

async fn unavailable_overflow() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "Database is starting", "retryAfter": 1e30 })),
    )
        .into_response()
}

async fn unavailable_bare() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "upstream connect error").into_response()
}

async fn accepted() -> Response {
    (
        StatusCode::ACCEPTED,
        [(RETRY_AFTER, "7")],
        Json(json!({ "status": "connecting" })),
    )
        .into_response()
}

async fn expired(State(state): State<Arc<MockState>>) -> Response {
    state.expired_calls.fetch_add(1, Ordering::SeqCst);
    // Give concurrent callers time to all be in flight.
    tokio::time::sleep(Duration::from_millis(50)).await;
    unauthorized("Token expired")
}

async fn missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Student not found" })),
    )
        .into_response()
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "ok": true }))
}

async fn flaky(State(state): State<Arc<MockState>>) -> Response {
    if state.flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Database is starting", "retryAfter": 0 })),
        )
            .into_response();
    }
    Json(json!({ "ok": true })).into_response()
}

pub fn notification_json(id: &str) -> Value {
    match id {
        "n1" => json!({
            "_id": "n1",
            "type": "assignment",
            "title": "Essay due",
            "message": "Your essay is due on Friday.",
            "createdAt": "2026-10-01T09:00:00Z",
            "read": false
        }),
        _ => json!({
            "_id": id,
            "type": "exam",
            "title": "Exam moved",
            "message": "The physics exam moved to Monday.",
            "createdAt": "2026-10-02T09:00:00Z",
            "read": false
        }),
    }
}

async fn notifications(headers: HeaderMap) -> Response {
    if bearer(&headers).and_then(user_for).is_none() {
        return unauthorized("Not authorized");
    }
    // Newest first, like the real backend.
    Json(json!({ "notifications": [notification_json("n2"), notification_json("n1")] }))
        .into_response()
}

async fn notification_stream(headers: HeaderMap) -> Response {
    if bearer(&headers).and_then(user_for).is_none() {
        return unauthorized("Not authorized");
    }
    let events = vec![
        Event::default().event("ping").data("keep-alive"),
        Event::default().data(notification_json("n1").to_string()),
        Event::default()
            .event("message")
            .data(notification_json("n2").to_string()),
    ];
    Sse::new(futures::stream::iter(events.into_iter().map(Ok::<_, Infallible>))).into_response()
}
