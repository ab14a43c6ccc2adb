//! Request replay shared by every proxy route.

use axum::{
    Json,
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bon_manual_core::Envelope;
use serde_json::Value;

use crate::backend::{BackendClient, ForwardRequest};

/// How a route words its failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStyle {
    /// `Internal Server Error`, with no detail.
    Internal,
    /// `Proxy Error: <detail>`, used by chat routes.
    Proxy,
}

impl FailureStyle {
    /// Build the 500 envelope for a failure described by `detail`.
    pub fn respond(self, detail: &dyn std::fmt::Display) -> Response {
        let message = match self {
            Self::Internal => "Internal Server Error".to_string(),
            Self::Proxy => format!("Proxy Error: {detail}"),
        };
        failure(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// `{ok:false, message}` with the given status.
pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(Envelope::<Value>::failure(message))).into_response()
}

/// The value of header `name` on the incoming request, empty when absent.
pub fn secret_header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Parse an optional JSON request body. An empty body is no body.
///
/// # Errors
///
/// Returns the parse error if the body is present but not JSON.
pub fn json_body(body: &Bytes) -> Result<Option<Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some)
}

/// Convert a backend status into the one sent to the browser.
pub fn relay_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// A buffered request to replay against the backend.
pub struct Replay<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub header: Option<(&'static str, &'a str)>,
    pub body: &'a Bytes,
    pub style: FailureStyle,
}

/// Replay a JSON request and relay the backend's status and JSON body.
pub async fn replay(backend: &BackendClient, request: Replay<'_>) -> Response {
    let body = match json_body(request.body) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(path = request.path, error = %e, "request body is not JSON");
            return request.style.respond(&e);
        }
    };

    let response = match backend
        .forward(ForwardRequest {
            method: request.method,
            path: request.path,
            query: request.query,
            header: request.header,
            body: body.as_ref(),
            stream: false,
        })
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(path = request.path, error = %e, "backend unreachable");
            return request.style.respond(&e);
        }
    };

    let status = relay_status(response.status());
    match response.json::<Value>().await {
        Ok(json) => (status, Json(json)).into_response(),
        Err(e) => {
            tracing::error!(path = request.path, status = %status, error = %e, "backend answered with non-JSON body");
            request.style.respond(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_secret_header_defaults_to_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(secret_header(&headers, "x-admin-password"), "");

        headers.insert("x-admin-password", HeaderValue::from_static("s3cret"));
        assert_eq!(secret_header(&headers, "X-Admin-Password"), "s3cret");
    }

    #[test]
    fn test_json_body() {
        assert_eq!(json_body(&Bytes::new()).ok(), Some(None));
        assert_eq!(json_body(&Bytes::from_static(b"  \n")).ok(), Some(None));
        assert_eq!(
            json_body(&Bytes::from_static(br#"{"question":"hi"}"#)).ok(),
            Some(Some(serde_json::json!({"question": "hi"})))
        );
        assert!(json_body(&Bytes::from_static(b"{not json")).is_err());
    }

    #[test]
    fn test_failure_styles() {
        let internal = FailureStyle::Internal.respond(&"connection refused");
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let proxy = FailureStyle::Proxy.respond(&"connection refused");
        assert_eq!(proxy.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
