//! Admin proxy routes. Each carries `X-Admin-Password`.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::Response,
    routing::{get, post, put},
};
use bon_manual_core::Role;
use tracing::instrument;

use super::proxy::{FailureStyle, Replay, replay, secret_header};
use crate::state::AppState;

/// Build the admin proxy router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/categories", get(forward).post(forward))
        .route("/api/admin/categories/{id}", put(forward).delete(forward))
        .route("/api/admin/articles", get(forward).post(forward))
        .route(
            "/api/admin/articles/{id}",
            get(forward).put(forward).delete(forward),
        )
        .route("/api/admin/preview-chat", post(preview_chat))
}

/// Replay an admin content request under the same path.
#[instrument(skip(state, headers, body), fields(path = %uri.path()))]
async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let name = Role::Admin.header_name();
    replay(
        state.backend(),
        Replay {
            method,
            path: uri.path(),
            query: uri.query(),
            header: Some((name, secret_header(&headers, name))),
            body: &body,
            style: FailureStyle::Internal,
        },
    )
    .await
}

/// Replay an admin preview question.
#[instrument(skip(state, headers, body))]
async fn preview_chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let name = Role::Admin.header_name();
    replay(
        state.backend(),
        Replay {
            method: Method::POST,
            path: "/api/admin/preview-chat",
            query: None,
            header: Some((name, secret_header(&headers, name))),
            body: &body,
            style: FailureStyle::Proxy,
        },
    )
    .await
}
