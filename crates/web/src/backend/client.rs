//! HTTP client for the manual backend.
//!
//! Two surfaces share one connection pool:
//! - [`BackendClient::forward`] replays a browser request verbatim for the
//!   JSON proxy and the streaming relay
//! - typed calls used by the server-rendered screens and the terminal client

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use bon_manual_core::{
    Article, ArticleDraft, ArticleId, Category, CategoryDraft, CategoryId, CategoryUpdate,
    ChatAnswer, Credential, Envelope, PreviewAnswer, Role,
};
use futures::{Stream, StreamExt};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use crate::config::BackendConfig;

use super::error::BackendError;

pub const EVENT_STREAM: &str = "text/event-stream";

/// A browser request to replay against the backend.
#[derive(Debug)]
pub struct ForwardRequest<'a> {
    pub method: Method,
    /// Path below the base URL, starting with `/`.
    pub path: &'a str,
    /// Raw query string without the leading `?`.
    pub query: Option<&'a str>,
    /// Credential header to inject: name and caller-supplied value.
    pub header: Option<(&'static str, &'a str)>,
    pub body: Option<&'a Value>,
    /// Ask for an event stream and skip the request timeout.
    pub stream: bool,
}

/// Manual backend client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                request_timeout: config.request_timeout,
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    // =========================================================================
    // Forwarding
    // =========================================================================

    /// Replay a request and hand back the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error only if no response arrived; non-success statuses are
    /// the caller's to relay.
    #[instrument(skip(self, request), fields(method = %request.method, path = request.path))]
    pub async fn forward(&self, request: ForwardRequest<'_>) -> Result<reqwest::Response, BackendError> {
        let url = match request.query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}?{query}", self.url(request.path)),
            None => self.url(request.path),
        };

        let mut builder = self.inner.client.request(request.method, url);
        if let Some((name, value)) = request.header {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }
        if request.stream {
            builder = builder.header(ACCEPT, EVENT_STREAM);
        } else {
            builder = builder.timeout(self.inner.request_timeout);
        }

        Ok(builder.send().await?)
    }

    /// Check that the backend answers at all. Any status counts as reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if no response arrived within the connect timeout.
    pub async fn ping(&self) -> Result<u16, BackendError> {
        let response = self
            .inner
            .client
            .get(self.url("/"))
            .timeout(self.inner.request_timeout)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange a role's password for a verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or its answer is not
    /// an envelope. An `ok: false` verdict is returned, not raised.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, role: Role, password: &str) -> Result<Envelope<Value>, BackendError> {
        let response = self
            .inner
            .client
            .post(self.url("/api/auth/verify"))
            .timeout(self.inner.request_timeout)
            .json(&json!({ "mode": role, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| BackendError::Status {
            status: status.as_u16(),
            message: format!("Backend Error: {body}"),
        })
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List every category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential))]
    pub async fn categories(&self, credential: &Credential) -> Result<Vec<Category>, BackendError> {
        let envelope = self
            .call::<Vec<Category>, ()>(Method::GET, "/api/admin/categories", credential, None)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential, draft), fields(code = %draft.code))]
    pub async fn create_category(
        &self,
        credential: &Credential,
        draft: &CategoryDraft,
    ) -> Result<(), BackendError> {
        self.call::<Value, _>(Method::POST, "/api/admin/categories", credential, Some(draft))
            .await
            .map(drop)
    }

    /// Update a category's name, description, order and status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential, update))]
    pub async fn update_category(
        &self,
        credential: &Credential,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<(), BackendError> {
        let path = format!("/api/admin/categories/{id}");
        self.call::<Value, _>(Method::PUT, &path, credential, Some(update))
            .await
            .map(drop)
    }

    /// Delete a category. Its articles stop being listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential))]
    pub async fn delete_category(&self, credential: &Credential, id: CategoryId) -> Result<(), BackendError> {
        let path = format!("/api/admin/categories/{id}");
        self.call::<Value, ()>(Method::DELETE, &path, credential, None)
            .await
            .map(drop)
    }

    // =========================================================================
    // Articles
    // =========================================================================

    /// List articles, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential))]
    pub async fn articles(
        &self,
        credential: &Credential,
        category: Option<CategoryId>,
    ) -> Result<Vec<Article>, BackendError> {
        let path = match category {
            Some(id) => format!("/api/admin/articles?category_id={id}"),
            None => "/api/admin/articles".to_string(),
        };
        let envelope = self
            .call::<Vec<Article>, ()>(Method::GET, &path, credential, None)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Fetch one article.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the backend rejects it, or the
    /// envelope carries no article.
    #[instrument(skip(self, credential))]
    pub async fn article(&self, credential: &Credential, id: ArticleId) -> Result<Article, BackendError> {
        let path = format!("/api/admin/articles/{id}");
        self.call::<Article, ()>(Method::GET, &path, credential, None)
            .await?
            .data
            .ok_or_else(|| BackendError::Parse(format!("article {id} missing from response")))
    }

    /// Create an article.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential, draft))]
    pub async fn create_article(&self, credential: &Credential, draft: &ArticleDraft) -> Result<(), BackendError> {
        self.call::<Value, _>(Method::POST, "/api/admin/articles", credential, Some(draft))
            .await
            .map(drop)
    }

    /// Replace an article's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential, draft))]
    pub async fn update_article(
        &self,
        credential: &Credential,
        id: ArticleId,
        draft: &ArticleDraft,
    ) -> Result<(), BackendError> {
        let path = format!("/api/admin/articles/{id}");
        self.call::<Value, _>(Method::PUT, &path, credential, Some(draft))
            .await
            .map(drop)
    }

    /// Delete an article.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential))]
    pub async fn delete_article(&self, credential: &Credential, id: ArticleId) -> Result<(), BackendError> {
        let path = format!("/api/admin/articles/{id}");
        self.call::<Value, ()>(Method::DELETE, &path, credential, None)
            .await
            .map(drop)
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Ask as an admin and get the answer with retrieval metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential, question))]
    pub async fn preview_chat(&self, credential: &Credential, question: &str) -> Result<PreviewAnswer, BackendError> {
        let body = json!({ "question": question });
        let envelope = self
            .call::<Value, _>(Method::POST, "/api/admin/preview-chat", credential, Some(&body))
            .await?;
        Ok(PreviewAnswer {
            answer: envelope.answer.unwrap_or_default(),
            references: envelope.references.unwrap_or_default(),
            used_chunks: envelope.used_chunks.unwrap_or_default(),
        })
    }

    /// Ask as a store owner and wait for the whole answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, credential, question))]
    pub async fn chat(&self, credential: &Credential, question: &str) -> Result<ChatAnswer, BackendError> {
        let body = json!({ "question": question });
        let envelope = self
            .call::<Value, _>(Method::POST, "/api/user/chat", credential, Some(&body))
            .await?;
        Ok(ChatAnswer {
            answer: envelope.answer.unwrap_or_default(),
            references: envelope.references.unwrap_or_default(),
        })
    }

    /// Ask as a store owner and receive the answer as raw SSE bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial request fails or the backend answers
    /// with a non-success status.
    #[instrument(skip(self, credential, question))]
    pub async fn chat_stream(
        &self,
        credential: &Credential,
        question: &str,
    ) -> Result<impl Stream<Item = Result<Bytes, BackendError>> + Send + 'static, BackendError> {
        let body = json!({ "question": question });
        let response = self
            .forward(ForwardRequest {
                method: Method::POST,
                path: "/api/user/chat/stream",
                query: None,
                header: Some(credential.header()),
                body: Some(&body),
                stream: true,
            })
            .await?;

        // Check for error responses before streaming
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: if text.trim().is_empty() {
                    "Backend Error".to_string()
                } else {
                    text
                },
            });
        }

        Ok(response.bytes_stream().map(|chunk| chunk.map_err(BackendError::from)))
    }

    /// Send an authenticated request and unwrap the envelope.
    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        credential: &Credential,
        body: Option<&B>,
    ) -> Result<Envelope<T>, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (name, value) = credential.header();
        let mut builder = self
            .inner
            .client
            .request(method, self.url(path))
            .timeout(self.inner.request_timeout)
            .header(name, value);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        read_envelope(response).await
    }
}

/// Parse an envelope, turning `ok: false` and bare error statuses into errors.
async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<Envelope<T>, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) if envelope.ok && status.is_success() => Ok(envelope),
        Ok(envelope) => Err(BackendError::Rejected(envelope.message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        }))),
        Err(_) if !status.is_success() => Err(BackendError::Status {
            status: status.as_u16(),
            message: body,
        }),
        Err(e) => Err(BackendError::Parse(format!("Failed to parse response: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        let config = BackendConfig::new("http://127.0.0.1:4000/").expect("config");
        BackendClient::new(&config).expect("client")
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = client();
        assert_eq!(client.base_url(), "http://127.0.0.1:4000");
        assert_eq!(
            client.url("/api/admin/categories"),
            "http://127.0.0.1:4000/api/admin/categories"
        );
    }

    #[test]
    fn test_backend_client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<BackendClient>();
    }

    #[test]
    fn test_backend_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendClient>();
    }
}
