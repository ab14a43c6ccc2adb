//! Session middleware configuration.
//!
//! Sessions live in memory and the cookie carries no expiry, so the
//! credential and transcripts disappear when the browser session ends.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bon_manual_session";

/// Create the session layer with an in-memory store.
///
/// # Arguments
///
/// * `config` - Web configuration (for determining HTTPS mode)
#[must_use]
pub fn create_session_layer(config: &WebConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
