//! Administrator screens.
//!
//! Every handler takes the admin credential through [`RequireAdmin`] and
//! makes one round trip to the backend. Outcomes surface as flash notices
//! on the page the handler redirects to.
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod articles;
pub mod categories;
pub mod dashboard;
pub mod preview;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::backend::BackendError;
use crate::models::Flash;
use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(dashboard::router())
        .merge(preview::router())
        .merge(categories::router())
        .merge(articles::router())
}

/// Show a success notice and go to `to`.
async fn done(session: &Session, message: impl Into<String>, to: &str) -> Response {
    Flash::success(message).push(session).await;
    Redirect::to(to).into_response()
}

/// Surface a backend failure as a notice and go to `to`.
async fn failed(session: &Session, action: &str, error: &BackendError, to: &str) -> Response {
    tracing::warn!(action, error = %error, "admin action failed");
    Flash::error(error.user_message()).push(session).await;
    Redirect::to(to).into_response()
}
