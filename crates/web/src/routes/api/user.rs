//! Store-owner chat proxy routes. Each carries `X-User-Password`.

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, header},
    response::{IntoResponse, Response},
    routing::post,
};
use bon_manual_core::Role;
use futures::StreamExt;
use tracing::instrument;

use super::proxy::{FailureStyle, Replay, failure, json_body, relay_status, replay, secret_header};
use crate::backend::ForwardRequest;
use crate::backend::client::EVENT_STREAM;
use crate::state::AppState;

const CHAT_PATH: &str = "/api/user/chat";
const STREAM_PATH: &str = "/api/user/chat/stream";

/// Build the store-owner proxy router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(CHAT_PATH, post(chat))
        .route(STREAM_PATH, post(chat_stream))
}

/// Replay a whole-answer chat question.
#[instrument(skip(state, headers, body))]
async fn chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let name = Role::User.header_name();
    replay(
        state.backend(),
        Replay {
            method: Method::POST,
            path: CHAT_PATH,
            query: None,
            header: Some((name, secret_header(&headers, name))),
            body: &body,
            style: FailureStyle::Proxy,
        },
    )
    .await
}

/// Relay the backend's event stream byte for byte as it arrives.
#[instrument(skip(state, headers, body))]
async fn chat_stream(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let style = FailureStyle::Proxy;
    let body = match json_body(&body) {
        Ok(body) => body,
        Err(e) => return style.respond(&e),
    };

    let name = Role::User.header_name();
    let response = match state
        .backend()
        .forward(ForwardRequest {
            method: Method::POST,
            path: STREAM_PATH,
            query: None,
            header: Some((name, secret_header(&headers, name))),
            body: body.as_ref(),
            stream: true,
        })
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "stream request failed");
            return style.respond(&e);
        }
    };

    let status = relay_status(response.status());
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "backend refused stream");
        let message = if text.trim().is_empty() {
            "Backend Error".to_string()
        } else {
            text
        };
        return failure(status, message);
    }

    let mut upstream = response.bytes_stream();
    let relay = async_stream::stream! {
        let mut relayed = 0usize;
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    relayed += bytes.len();
                    yield Ok::<_, reqwest::Error>(bytes);
                }
                Err(e) => {
                    tracing::warn!(error = %e, relayed, "stream relay interrupted");
                    yield Err(e);
                    break;
                }
            }
        }
        tracing::debug!(relayed, "stream relay finished");
    };

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        Body::from_stream(relay),
    )
        .into_response()
}
