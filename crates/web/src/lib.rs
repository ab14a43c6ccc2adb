//! Bon Manual web front end library.
//!
//! This crate provides the role-gated web front end as a library,
//! allowing it to be tested and driven by the terminal client.
//!
//! # Security
//!
//! The front end holds no content of its own. Every data-bearing call goes to
//! the manual backend with the caller's role secret attached:
//! - `X-Admin-Password` for category, article and preview routes
//! - `X-User-Password` for store-owner chat routes
//!
//! The secret lives only in the server-side session for the life of the
//! browser session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::build_router;
pub use config::WebConfig;
pub use state::AppState;
