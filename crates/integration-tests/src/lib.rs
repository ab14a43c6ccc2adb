//! End-to-end test harness for Bon Manual.
//!
//! Starts an in-process mock of the manual backend and the web front end,
//! both on ephemeral local ports, and hands out `reqwest` clients to drive
//! them.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bon-manual-integration-tests
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use bon_manual_core::Role;
use bon_manual_web::{AppState, WebConfig, build_router};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Administrator secret the mock accepts.
pub const ADMIN_SECRET: &str = "admin-secret";

/// Store code the mock accepts.
pub const STORE_CODE: &str = "1234";

/// Verifying with this password makes the mock answer with an HTML error page.
pub const HTML_FAILURE_PASSWORD: &str = "html";

/// The streamed answer used unless a test scripts another: "Hello" in three
/// reads that cut frames apart, with references arriving last.
pub const HELLO_STREAM: [&str; 3] = [
    "event: chunk\ndata: {\"text\":\"Hel\"}\n\nevent: chu",
    "nk\ndata: {\"text\":\"lo\"}\n\nevent: meta\ndata: {\"references\":[{\"article_id\":1,",
    "\"category_code\":\"OPS\",\"title\":\"Doc\"}]}\n\n",
];

// =============================================================================
// Mock backend
// =============================================================================

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub admin_password: Option<String>,
    pub user_password: Option<String>,
    pub body: Option<Value>,
}

/// How the mock answers `/api/user/chat/stream`.
#[derive(Debug, Clone)]
pub struct StreamScript {
    /// Body pieces, each written as its own read.
    pub chunks: Vec<String>,
    /// Keep the stream open after the last piece.
    pub hang: bool,
}

impl Default for StreamScript {
    fn default() -> Self {
        Self {
            chunks: HELLO_STREAM.iter().map(ToString::to_string).collect(),
            hang: false,
        }
    }
}

#[derive(Default)]
struct MockData {
    categories: Vec<Value>,
    articles: Vec<Value>,
    next_id: i64,
    requests: Vec<Recorded>,
    stream: StreamScript,
}

/// In-memory stand-in for the manual backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    data: Arc<Mutex<MockData>>,
}

impl MockBackend {
    /// A backend seeded with two categories and three articles.
    #[must_use]
    pub fn seeded() -> Self {
        let mock = Self::default();
        {
            let mut data = mock.data.lock();
            data.categories = vec![
                json!({"id": 1, "code": "OPS", "name": "Operations", "description": "Daily routines", "sort_order": 1, "is_active": true}),
                json!({"id": 2, "code": "HR", "name": "People", "description": null, "sort_order": 2, "is_active": true}),
            ];
            data.articles = vec![
                article_json(1, 1, "Opening checklist"),
                article_json(2, 1, "Closing checklist"),
                article_json(3, 2, "Shift swaps"),
            ];
            data.next_id = 100;
        }
        mock
    }

    /// Script the next streamed answers.
    pub fn set_stream(&self, script: StreamScript) {
        self.data.lock().stream = script;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.data.lock().requests.clone()
    }

    /// The most recent request to `path`.
    #[must_use]
    pub fn last_request(&self, path: &str) -> Option<Recorded> {
        self.data
            .lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .cloned()
    }

    fn record(&self, method: Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
        let header = |role: Role| {
            headers
                .get(role.header_name())
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        let recorded = Recorded {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(ToString::to_string),
            admin_password: header(Role::Admin),
            user_password: header(Role::User),
            body,
        };
        self.data.lock().requests.push(recorded);
    }

    fn router(self) -> Router {
        Router::new()
            .route("/", get(|| async { "manual backend" }))
            .route("/api/auth/verify", post(verify))
            .route("/api/admin/categories", get(list_categories).post(create_category))
            .route(
                "/api/admin/categories/{id}",
                put(update_category).delete(delete_category),
            )
            .route("/api/admin/articles", get(list_articles).post(create_article))
            .route(
                "/api/admin/articles/{id}",
                get(get_article).put(update_article).delete(delete_article),
            )
            .route("/api/admin/preview-chat", post(preview_chat))
            .route("/api/user/chat", post(user_chat))
            .route("/api/user/chat/stream", post(user_chat_stream))
            .with_state(self)
    }

    /// Serve the mock on an ephemeral port and return its base URL.
    pub async fn spawn(self) -> String {
        format!("http://{}", serve(self.router()).await)
    }
}

fn article_json(id: i64, category_id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "category_id": category_id,
        "title": title,
        "content": format!("{title}: step by step."),
        "summary": null,
        "priority": 0,
        "requires_sm": false,
        "is_published": true,
    })
}

fn parse_body(body: &Bytes) -> Option<Value> {
    serde_json::from_slice(body).ok()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"ok": false, "message": "Unauthorized"})),
    )
        .into_response()
}

fn has_secret(headers: &HeaderMap, role: Role, secret: &str) -> bool {
    headers
        .get(role.header_name())
        .and_then(|v| v.to_str().ok())
        == Some(secret)
}

async fn verify(State(mock): State<MockBackend>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let body = parse_body(&body);
    mock.record(method, &uri, &headers, body.clone());
    let body = body.unwrap_or(Value::Null);

    match (body["mode"].as_str(), body["password"].as_str()) {
        (_, Some(HTML_FAILURE_PASSWORD)) => {
            (StatusCode::BAD_GATEWAY, "<html>upstream down</html>").into_response()
        }
        (Some("admin"), Some(ADMIN_SECRET)) | (Some("user"), Some(STORE_CODE)) => {
            Json(json!({"ok": true})).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"ok": false, "message": "Wrong password"})),
        )
            .into_response(),
    }
}

async fn list_categories(State(mock): State<MockBackend>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    mock.record(method, &uri, &headers, None);
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let data = mock.data.lock();
    let categories: Vec<Value> = data
        .categories
        .iter()
        .map(|category| {
            let mut category = category.clone();
            let count = data
                .articles
                .iter()
                .filter(|a| a["category_id"] == category["id"])
                .count();
            category["article_count"] = json!(count);
            category
        })
        .collect();
    Json(json!({"ok": true, "data": categories})).into_response()
}

async fn create_category(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    mock.record(method, &uri, &headers, body.clone());
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }
    let Some(mut category) = body else {
        return (StatusCode::BAD_REQUEST, Json(json!({"ok": false, "message": "Bad body"}))).into_response();
    };

    let mut data = mock.data.lock();
    if data
        .categories
        .iter()
        .any(|c| c["code"] == category["code"])
    {
        return Json(json!({"ok": false, "message": "Category code already exists"})).into_response();
    }
    data.next_id += 1;
    category["id"] = json!(data.next_id);
    data.categories.push(category);
    Json(json!({"ok": true, "data": {"id": data.next_id}})).into_response()
}

async fn update_category(
    State(mock): State<MockBackend>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    mock.record(method, &uri, &headers, body.clone());
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let mut data = mock.data.lock();
    let Some(category) = data.categories.iter_mut().find(|c| c["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, Json(json!({"ok": false, "message": "Not found"}))).into_response();
    };
    if let Some(Value::Object(fields)) = body {
        for (key, value) in fields {
            if key != "code" {
                category[key.as_str()] = value;
            }
        }
    }
    Json(json!({"ok": true})).into_response()
}

async fn delete_category(
    State(mock): State<MockBackend>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    mock.record(method, &uri, &headers, None);
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let mut data = mock.data.lock();
    data.categories.retain(|c| c["id"] != json!(id));
    data.articles.retain(|a| a["category_id"] != json!(id));
    Json(json!({"ok": true})).into_response()
}

async fn list_articles(
    State(mock): State<MockBackend>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    mock.record(method, &uri, &headers, None);
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let category: Option<i64> = query.get("category_id").and_then(|c| c.parse().ok());
    let data = mock.data.lock();
    let articles: Vec<&Value> = data
        .articles
        .iter()
        .filter(|a| category.is_none_or(|id| a["category_id"] == json!(id)))
        .collect();
    Json(json!({"ok": true, "data": articles})).into_response()
}

async fn get_article(
    State(mock): State<MockBackend>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    mock.record(method, &uri, &headers, None);
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let data = mock.data.lock();
    match data.articles.iter().find(|a| a["id"] == json!(id)) {
        Some(article) => Json(json!({"ok": true, "data": article})).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"ok": false, "message": "Article not found"}))).into_response(),
    }
}

async fn create_article(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    mock.record(method, &uri, &headers, body.clone());
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }
    let Some(mut article) = body else {
        return (StatusCode::BAD_REQUEST, Json(json!({"ok": false, "message": "Bad body"}))).into_response();
    };

    let mut data = mock.data.lock();
    data.next_id += 1;
    article["id"] = json!(data.next_id);
    data.articles.push(article);
    Json(json!({"ok": true, "data": {"id": data.next_id}})).into_response()
}

async fn update_article(
    State(mock): State<MockBackend>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    mock.record(method, &uri, &headers, body.clone());
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let mut data = mock.data.lock();
    let Some(article) = data.articles.iter_mut().find(|a| a["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, Json(json!({"ok": false, "message": "Article not found"}))).into_response();
    };
    if let Some(Value::Object(fields)) = body {
        for (key, value) in fields {
            article[key.as_str()] = value;
        }
    }
    Json(json!({"ok": true})).into_response()
}

async fn delete_article(
    State(mock): State<MockBackend>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    mock.record(method, &uri, &headers, None);
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    mock.data.lock().articles.retain(|a| a["id"] != json!(id));
    Json(json!({"ok": true})).into_response()
}

async fn preview_chat(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    mock.record(method, &uri, &headers, body.clone());
    if !has_secret(&headers, Role::Admin, ADMIN_SECRET) {
        return unauthorized();
    }

    let question = body
        .as_ref()
        .and_then(|b| b["question"].as_str())
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "ok": true,
        "answer": format!("Preview answer to: {question}"),
        "references": [{"article_id": 1, "category_code": "OPS", "title": "Opening checklist"}],
        "used_chunks": [{"content": "Unlock the front door, then switch on the lights.", "score": 0.91}],
    }))
    .into_response()
}

async fn user_chat(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.record(method, &uri, &headers, parse_body(&body));
    if !has_secret(&headers, Role::User, STORE_CODE) {
        return unauthorized();
    }

    Json(json!({
        "ok": true,
        "answer": "Hello",
        "references": [{"article_id": 1, "category_code": "OPS", "title": "Doc"}],
    }))
    .into_response()
}

async fn user_chat_stream(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.record(method, &uri, &headers, parse_body(&body));
    if !has_secret(&headers, Role::User, STORE_CODE) {
        return (StatusCode::UNAUTHORIZED, "Invalid store code").into_response();
    }

    let script = mock.data.lock().stream.clone();
    let pieces = futures::stream::iter(script.chunks).then(|piece| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, Infallible>(Bytes::from(piece))
    });
    let body = if script.hang {
        Body::from_stream(pieces.chain(futures::stream::pending()))
    } else {
        Body::from_stream(pieces)
    };

    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

// =============================================================================
// Web front end
// =============================================================================

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

/// A running front end and the mock behind it.
pub struct TestApp {
    pub url: String,
    pub backend_url: String,
    pub backend: MockBackend,
}

impl TestApp {
    /// Start a seeded mock backend and a front end pointed at it.
    pub async fn start() -> Self {
        let backend = MockBackend::seeded();
        let backend_url = backend.clone().spawn().await;
        let url = start_web(&backend_url).await;
        Self {
            url,
            backend_url,
            backend,
        }
    }

    /// Absolute URL for `path` on the front end.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    /// A client that keeps cookies and does not follow redirects.
    #[must_use]
    pub fn browser(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("client")
    }

    /// Sign `browser` in as `role`.
    pub async fn login(&self, browser: &reqwest::Client, role: Role, password: &str) -> reqwest::Response {
        browser
            .post(self.url("/login"))
            .form(&[("role", role.to_string().as_str()), ("password", password)])
            .send()
            .await
            .expect("login request")
    }
}

/// Start a front end pointed at `backend_url` and return its base URL.
pub async fn start_web(backend_url: &str) -> String {
    let backend_url = backend_url.to_string();
    let lookup = move |key: &str| match key {
        "BACKEND_API_URL" => Some(backend_url.clone()),
        "BACKEND_CONNECT_TIMEOUT_SECS" | "BACKEND_REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    };
    let config = WebConfig::from_lookup(&lookup).expect("config");
    let state = AppState::new(config).expect("state");
    format!("http://{}", serve(build_router(state)).await)
}

/// Read a response body as JSON.
pub async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("json body")
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
