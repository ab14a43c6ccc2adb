//! JSON and SSE proxy routes of the front end.
//!
//! Run with: `cargo test -p bon-manual-integration-tests --test proxy`

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use bon_manual_integration_tests::{
    ADMIN_SECRET, HELLO_STREAM, HTML_FAILURE_PASSWORD, STORE_CODE, StreamScript, TestApp, json_body,
    start_web,
};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_admin_secret_header_is_forwarded() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .get(app.url("/api/admin/categories"))
        .header("X-Admin-Password", ADMIN_SECRET)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["article_count"], 2);

    let request = app.backend.last_request("/api/admin/categories").unwrap();
    assert_eq!(request.admin_password.as_deref(), Some(ADMIN_SECRET));
    assert!(request.user_password.is_none());
}

#[tokio::test]
async fn test_missing_secret_is_forwarded_empty() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .get(app.url("/api/admin/categories"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["ok"], false);

    let request = app.backend.last_request("/api/admin/categories").unwrap();
    assert_eq!(request.admin_password.as_deref(), Some(""));
}

#[tokio::test]
async fn test_query_string_is_forwarded() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .get(app.url("/api/admin/articles?category_id=2"))
        .header("X-Admin-Password", ADMIN_SECRET)
        .send()
        .await
        .unwrap();

    let body = json_body(response).await;
    let articles = body["data"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Shift swaps");

    let request = app.backend.last_request("/api/admin/articles").unwrap();
    assert_eq!(request.query.as_deref(), Some("category_id=2"));
}

#[tokio::test]
async fn test_category_delete_drops_its_articles() {
    let app = TestApp::start().await;
    let client = reqwest::Client::new();

    let response = client
        .delete(app.url("/api/admin/categories/1"))
        .header("X-Admin-Password", ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(response).await, json!({"ok": true}));

    let body = json_body(
        client
            .get(app.url("/api/admin/articles"))
            .header("X-Admin-Password", ADMIN_SECRET)
            .send()
            .await
            .unwrap(),
    )
    .await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["title"].as_str())
        .collect();
    assert_eq!(titles, ["Shift swaps"]);
}

#[tokio::test]
async fn test_article_update_body_is_relayed() {
    let app = TestApp::start().await;
    let update = json!({
        "category_id": 2,
        "title": "Shift swaps and cover",
        "content": "Ask the supervisor first.",
        "summary": null,
        "priority": 3,
        "requires_sm": true,
        "is_published": true,
    });

    let response = reqwest::Client::new()
        .put(app.url("/api/admin/articles/3"))
        .header("X-Admin-Password", ADMIN_SECRET)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = app.backend.last_request("/api/admin/articles/3").unwrap();
    assert_eq!(request.method, reqwest::Method::PUT);
    assert_eq!(request.body.unwrap(), update);
}

#[tokio::test]
async fn test_verify_success_and_rejection() {
    let app = TestApp::start().await;
    let client = reqwest::Client::new();

    let ok = client
        .post(app.url("/api/auth/verify"))
        .json(&json!({"mode": "user", "password": STORE_CODE}))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(ok).await, json!({"ok": true}));

    let rejected = client
        .post(app.url("/api/auth/verify"))
        .json(&json!({"mode": "admin", "password": STORE_CODE}))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(rejected).await["message"], "Wrong password");

    let request = app.backend.last_request("/api/auth/verify").unwrap();
    assert!(request.admin_password.is_none());
    assert!(request.user_password.is_none());
}

#[tokio::test]
async fn test_verify_non_json_answer_becomes_envelope() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .post(app.url("/api/auth/verify"))
        .json(&json!({"mode": "user", "password": HTML_FAILURE_PASSWORD}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await,
        json!({"ok": false, "message": "Backend Error: <html>upstream down</html>"})
    );
}

#[tokio::test]
async fn test_preview_chat_relays_answer() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .post(app.url("/api/admin/preview-chat"))
        .header("X-Admin-Password", ADMIN_SECRET)
        .json(&json!({"question": "How do I open?"}))
        .send()
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["answer"], "Preview answer to: How do I open?");
    assert_eq!(body["used_chunks"][0]["score"], 0.91);
}

#[tokio::test]
async fn test_user_chat_requires_store_code() {
    let app = TestApp::start().await;
    let client = reqwest::Client::new();

    let ok = client
        .post(app.url("/api/user/chat"))
        .header("X-User-Password", STORE_CODE)
        .json(&json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(ok).await["answer"], "Hello");

    let refused = client
        .post(app.url("/api/user/chat"))
        .header("X-User-Password", "0000")
        .json(&json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stream_is_relayed_byte_for_byte() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .post(app.url("/api/user/chat/stream"))
        .header("X-User-Password", STORE_CODE)
        .json(&json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/event-stream");
    assert_eq!(headers["cache-control"], "no-cache");

    let body = response.text().await.unwrap();
    assert_eq!(body, HELLO_STREAM.concat());
}

#[tokio::test]
async fn test_stream_bytes_arrive_before_backend_finishes() {
    let app = TestApp::start().await;
    let first = "event: chunk\ndata: {\"text\":\"Early\"}\n\n";
    app.backend.set_stream(StreamScript {
        chunks: vec![first.to_string()],
        hang: true,
    });

    let mut response = reqwest::Client::new()
        .post(app.url("/api/user/chat/stream"))
        .header("X-User-Password", STORE_CODE)
        .json(&json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
        .await
        .expect("relay held the first bytes back")
        .unwrap()
        .unwrap();
    assert_eq!(chunk.as_ref(), first.as_bytes());
}

#[tokio::test]
async fn test_refused_stream_becomes_json_failure() {
    let app = TestApp::start().await;

    let response = reqwest::Client::new()
        .post(app.url("/api/user/chat/stream"))
        .header("X-User-Password", "0000")
        .json(&json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({"ok": false, "message": "Invalid store code"})
    );
}

#[tokio::test]
async fn test_unreachable_backend_reports_failure() {
    let url = start_web("http://127.0.0.1:9").await;
    let client = reqwest::Client::new();

    let admin = client
        .get(format!("{url}/api/admin/categories"))
        .header("X-Admin-Password", ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(admin).await,
        json!({"ok": false, "message": "Internal Server Error"})
    );

    let chat = client
        .post(format!("{url}/api/user/chat"))
        .header("X-User-Password", STORE_CODE)
        .json(&json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(chat.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(chat).await["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Proxy Error: "));
}
