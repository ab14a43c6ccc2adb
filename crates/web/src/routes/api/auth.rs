//! Secret verification proxy route.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::Method,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use tracing::instrument;

use super::proxy::{FailureStyle, failure, json_body, relay_status};
use crate::backend::ForwardRequest;
use crate::state::AppState;

const VERIFY_PATH: &str = "/api/auth/verify";

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new().route(VERIFY_PATH, post(verify))
}

/// Replay `{mode, password}` without a secret header.
///
/// A non-JSON backend answer becomes `Backend Error: <text>` under the
/// backend's own status.
#[instrument(skip(state, body))]
async fn verify(State(state): State<AppState>, body: Bytes) -> Response {
    let style = FailureStyle::Internal;
    let body = match json_body(&body) {
        Ok(body) => body,
        Err(e) => return style.respond(&e),
    };

    let response = match state
        .backend()
        .forward(ForwardRequest {
            method: Method::POST,
            path: VERIFY_PATH,
            query: None,
            header: None,
            body: body.as_ref(),
            stream: false,
        })
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "verification request failed");
            return style.respond(&e);
        }
    };

    let status = relay_status(response.status());
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return style.respond(&e),
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => (status, Json(json)).into_response(),
        Err(_) => failure(status, format!("Backend Error: {text}")),
    }
}
