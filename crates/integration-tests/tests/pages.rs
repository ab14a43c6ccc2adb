//! Browser flows through the server-rendered screens.
//!
//! Run with: `cargo test -p bon-manual-integration-tests --test pages`

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use bon_manual_core::Role;
use bon_manual_core::chat::GREETING;
use bon_manual_integration_tests::{ADMIN_SECRET, STORE_CODE, StreamScript, TestApp, location};
use reqwest::StatusCode;

const STREAMING: &str = "An answer is being written";

async fn page(browser: &reqwest::Client, url: String) -> String {
    let response = browser.get(url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.text().await.unwrap()
}

/// Reload the chat page until it contains `needle`; returns that page.
async fn wait_for(browser: &reqwest::Client, app: &TestApp, needle: &str) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let html = page(browser, app.url("/chat")).await;
            if html.contains(needle) {
                return html;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("chat page never showed {needle:?}"))
}

/// Reload the chat page until no answer is streaming; returns every page seen.
async fn wait_idle(browser: &reqwest::Client, app: &TestApp) -> String {
    let mut seen = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let html = page(browser, app.url("/chat")).await;
            let busy = html.contains(STREAMING);
            seen.push_str(&html);
            if !busy {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("answer never finished");
    seen
}

async fn ask(browser: &reqwest::Client, app: &TestApp, question: &str) {
    let response = browser
        .post(app.url("/chat"))
        .form(&[("question", question)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/chat");
}

fn hanging_after(text: &str) -> StreamScript {
    StreamScript {
        chunks: vec![format!("event: chunk\ndata: {{\"text\":\"{text}\"}}\n\n")],
        hang: true,
    }
}

#[tokio::test]
async fn test_store_owner_sign_in_and_chat() {
    let app = TestApp::start().await;
    let browser = app.browser();

    let response = app.login(&browser, Role::User, STORE_CODE).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/chat");

    let html = page(&browser, app.url("/chat")).await;
    assert!(html.contains("Store owner verified."));
    assert!(html.contains(GREETING));

    ask(&browser, &app, "How do I open?").await;

    let html = wait_idle(&browser, &app).await;
    assert!(html.contains("How do I open?"));
    assert!(html.contains("Hello"));
    assert!(html.contains("[OPS] Doc"));

    let verify = app.backend.last_request("/api/auth/verify").unwrap();
    let body = verify.body.unwrap();
    assert_eq!(body["mode"], "user");
    assert_eq!(body["password"], STORE_CODE);
}

#[tokio::test]
async fn test_wrong_secret_stays_on_entry_screen() {
    let app = TestApp::start().await;
    let browser = app.browser();

    let response = app.login(&browser, Role::Admin, "guess").await;
    assert_eq!(location(&response), "/");

    let html = page(&browser, app.url("/")).await;
    assert!(html.contains("Wrong password"));

    let response = browser.get(app.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_empty_password_is_not_sent() {
    let app = TestApp::start().await;
    let browser = app.browser();

    app.login(&browser, Role::User, "").await;

    let html = page(&browser, app.url("/")).await;
    assert!(html.contains("Please enter the password."));
    assert!(app.backend.last_request("/api/auth/verify").is_none());
}

#[tokio::test]
async fn test_role_gate_redirects_with_notice() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    let response = browser.get(app.url("/admin/categories")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = page(&browser, app.url("/")).await;
    assert!(html.contains("Only administrators can access this page."));
}

#[tokio::test]
async fn test_logout_forgets_credential() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    let response = browser.post(app.url("/logout")).send().await.unwrap();
    assert_eq!(location(&response), "/");

    let response = browser.get(app.url("/chat")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_cancel_without_running_answer() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    browser.post(app.url("/chat/cancel")).send().await.unwrap();

    let html = page(&browser, app.url("/chat")).await;
    assert!(html.contains("No answer is in progress."));
}

#[tokio::test]
async fn test_partial_answer_visible_while_streaming() {
    let app = TestApp::start().await;
    app.backend.set_stream(hanging_after("PartialTok"));
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    ask(&browser, &app, "Tell me everything").await;

    let html = wait_for(&browser, &app, "PartialTok").await;
    assert!(html.contains("Tell me everything"));
    assert!(html.contains(STREAMING));
    assert!(html.contains(r#"http-equiv="refresh""#));

    browser.post(app.url("/chat/cancel")).send().await.unwrap();
    wait_idle(&browser, &app).await;
}

#[tokio::test]
async fn test_cancel_stops_running_answer() {
    let app = TestApp::start().await;
    app.backend.set_stream(hanging_after("Half an ans"));
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    ask(&browser, &app, "Tell me everything").await;
    wait_for(&browser, &app, "Half an ans").await;

    let response = browser.post(app.url("/chat/cancel")).send().await.unwrap();
    assert_eq!(location(&response), "/chat");

    let html = wait_idle(&browser, &app).await;
    assert!(html.contains("Half an ans"));
    assert!(html.contains("Answer stopped."));

    let html = page(&browser, app.url("/chat")).await;
    assert!(html.contains("Half an ans"));
    assert!(!html.contains("Answer stopped."));
    assert!(!html.contains(STREAMING));
}

#[tokio::test]
async fn test_second_question_while_streaming_is_refused() {
    let app = TestApp::start().await;
    app.backend.set_stream(hanging_after("Working"));
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    ask(&browser, &app, "First question").await;
    wait_for(&browser, &app, "Working").await;
    ask(&browser, &app, "Second question").await;

    let html = page(&browser, app.url("/chat")).await;
    assert!(html.contains("Please wait for the current answer to finish."));
    assert!(!html.contains("Second question"));

    browser.post(app.url("/chat/cancel")).send().await.unwrap();
    let html = wait_idle(&browser, &app).await;
    assert!(!html.contains("Second question"));
}

#[tokio::test]
async fn test_notices_from_other_requests_survive_the_turn() {
    let app = TestApp::start().await;
    app.backend.set_stream(hanging_after("Still going"));
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    ask(&browser, &app, "Tell me everything").await;

    // Refused while the answer streams; leaves a notice in the session
    let response = browser.post(app.url("/chat/reset")).send().await.unwrap();
    assert_eq!(location(&response), "/chat");
    browser.post(app.url("/chat/cancel")).send().await.unwrap();

    let html = wait_idle(&browser, &app).await;
    assert!(html.contains("Please wait for the current answer to finish."));
    assert!(html.contains("Answer stopped."));
    assert!(html.contains("Tell me everything"));
}

#[tokio::test]
async fn test_failed_answer_shows_notice() {
    let app = TestApp::start().await;
    app.backend.set_stream(StreamScript {
        chunks: vec![
            "event: error\ndata: {\"code\":\"no_context\",\"message\":\"Nothing found\"}\n\n".to_string(),
        ],
        hang: false,
    });
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    ask(&browser, &app, "Unknown topic").await;

    let html = wait_idle(&browser, &app).await;
    assert!(html.contains("An error occurred. Please try again shortly."));
    assert!(html.contains("message-failed"));
}

#[tokio::test]
async fn test_new_conversation_clears_transcript() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::User, STORE_CODE).await;

    ask(&browser, &app, "How do I open?").await;
    let html = wait_idle(&browser, &app).await;
    assert!(html.contains("How do I open?"));

    browser.post(app.url("/chat/reset")).send().await.unwrap();
    let html = page(&browser, app.url("/chat")).await;
    assert!(!html.contains("How do I open?"));
    assert!(html.contains(GREETING));
}

#[tokio::test]
async fn test_admin_creates_and_deletes_category() {
    let app = TestApp::start().await;
    let browser = app.browser();
    let response = app.login(&browser, Role::Admin, ADMIN_SECRET).await;
    assert_eq!(location(&response), "/admin");

    let html = page(&browser, app.url("/admin/categories")).await;
    assert!(html.contains("Operations"));
    assert!(html.contains("People"));

    let response = browser
        .post(app.url("/admin/categories"))
        .form(&[
            ("code", "FIN"),
            ("name", "Finance"),
            ("description", "Cash handling"),
            ("sort_order", "3"),
            ("is_active", "on"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin/categories");

    let html = page(&browser, app.url("/admin/categories")).await;
    assert!(html.contains("Category created."));
    assert!(html.contains("Finance"));

    let posted = app
        .backend
        .requests()
        .into_iter()
        .find(|r| r.method == reqwest::Method::POST && r.path == "/api/admin/categories")
        .unwrap();
    let body = posted.body.unwrap();
    assert_eq!(body["code"], "FIN");
    assert_eq!(body["sort_order"], 3);
    assert_eq!(body["is_active"], true);

    browser
        .post(app.url("/admin/categories/1/delete"))
        .form(&[("confirm", "on")])
        .send()
        .await
        .unwrap();
    let html = page(&browser, app.url("/admin/categories")).await;
    assert!(html.contains("Category deleted."));
    assert!(!html.contains("Daily routines"));
}

#[tokio::test]
async fn test_category_delete_needs_confirmation() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::Admin, ADMIN_SECRET).await;

    browser
        .post(app.url("/admin/categories/1/delete"))
        .form::<[(&str, &str); 0]>(&[])
        .send()
        .await
        .unwrap();

    let html = page(&browser, app.url("/admin/categories")).await;
    assert!(html.contains("Tick the confirmation box to delete."));
    assert!(html.contains("Operations"));
    assert!(app.backend.last_request("/api/admin/categories/1").is_none());
}

#[tokio::test]
async fn test_duplicate_category_code_is_reported() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::Admin, ADMIN_SECRET).await;

    browser
        .post(app.url("/admin/categories"))
        .form(&[("code", "OPS"), ("name", "Again"), ("sort_order", "")])
        .send()
        .await
        .unwrap();

    let html = page(&browser, app.url("/admin/categories")).await;
    assert!(html.contains("Category code already exists"));
}

#[tokio::test]
async fn test_articles_filtered_by_category_and_title() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::Admin, ADMIN_SECRET).await;

    let html = page(&browser, app.url("/admin/articles?category=1&q=Opening")).await;
    assert!(html.contains("Opening checklist"));
    assert!(!html.contains("Closing checklist"));
    assert!(!html.contains("Shift swaps"));

    let request = app.backend.last_request("/api/admin/articles").unwrap();
    assert_eq!(request.query.as_deref(), Some("category_id=1"));
}

#[tokio::test]
async fn test_admin_edits_article() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::Admin, ADMIN_SECRET).await;

    let html = page(&browser, app.url("/admin/articles/3")).await;
    assert!(html.contains("Shift swaps"));

    let response = browser
        .post(app.url("/admin/articles/3"))
        .form(&[
            ("category_id", "2"),
            ("title", "Shift swaps and cover"),
            ("content", "Ask the supervisor first."),
            ("summary", ""),
            ("priority", "1"),
            ("is_published", "on"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin/articles");

    let html = page(&browser, app.url("/admin/articles")).await;
    assert!(html.contains("Article updated."));
    assert!(html.contains("Shift swaps and cover"));
}

#[tokio::test]
async fn test_preview_chat_transcript() {
    let app = TestApp::start().await;
    let browser = app.browser();
    app.login(&browser, Role::Admin, ADMIN_SECRET).await;

    let response = browser
        .post(app.url("/admin/preview"))
        .form(&[("question", "How do I open?")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin/preview");

    let html = page(&browser, app.url("/admin/preview")).await;
    assert!(html.contains("Preview answer to: How do I open?"));
    assert!(html.contains("Opening checklist"));
    assert!(html.contains("Used chunks"));

    browser
        .post(app.url("/admin/preview/reset"))
        .send()
        .await
        .unwrap();
    let html = page(&browser, app.url("/admin/preview")).await;
    assert!(!html.contains("Preview answer to"));
}
