//! JSON proxy to the manual backend.
//!
//! Every route forwards to the same path on the backend, attaching the
//! role secret the browser sent under its fixed header.
//!
//! ```text
//! POST              /api/auth/verify            (no secret)
//! GET, POST         /api/admin/categories       X-Admin-Password
//! PUT, DELETE       /api/admin/categories/{id}  X-Admin-Password
//! GET, POST         /api/admin/articles         X-Admin-Password
//! GET, PUT, DELETE  /api/admin/articles/{id}    X-Admin-Password
//! POST              /api/admin/preview-chat     X-Admin-Password
//! POST              /api/user/chat              X-User-Password
//! POST              /api/user/chat/stream       X-User-Password (SSE relay)
//! ```

pub mod admin;
pub mod auth;
pub mod proxy;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(admin::router())
        .merge(user::router())
}
