//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Backend reachability check
//!
//! # Entry
//! GET  /                                - Role selection and sign-in
//! POST /login                           - Verify a role secret
//! POST /logout                          - Clear the session
//!
//! # Store owner
//! GET  /chat                            - Transcript and question form
//! POST /chat                            - Ask (streams the answer server-side)
//! POST /chat/cancel                     - Stop the running answer
//! POST /chat/reset                      - Clear the transcript
//!
//! # Administrator
//! GET  /admin                           - Category overview
//! GET  /admin/preview                   - Preview chat
//! POST /admin/preview                   - Ask a preview question
//! POST /admin/preview/reset             - Clear the preview transcript
//! GET  /admin/categories                - Category table
//! GET  /admin/categories/new            - New category form
//! POST /admin/categories                - Create category
//! GET  /admin/categories/{id}/edit      - Edit category form
//! POST /admin/categories/{id}           - Update category
//! POST /admin/categories/{id}/delete    - Delete category
//! GET  /admin/articles                  - Article list (?category=, ?q=)
//! GET  /admin/articles/new              - New article form (?category=)
//! POST /admin/articles                  - Create article
//! GET  /admin/articles/{id}             - Edit article form
//! POST /admin/articles/{id}             - Update article
//! POST /admin/articles/{id}/delete      - Delete article
//!
//! # JSON proxy
//! /api/...                              - See [`api`]
//! ```

pub mod admin;
pub mod api;
pub mod chat;
pub mod home;

use axum::Router;

use crate::state::AppState;

/// Build the complete router for all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(home::router())
        .merge(chat::router())
        .merge(admin::router())
        .merge(api::router())
}
