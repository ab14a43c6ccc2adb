//! Session keys.
//!
//! What the front end remembers about a visitor lives in the server-side
//! session and ends with the browser session. Chat transcripts are the
//! exception: see `services::transcripts`.

/// Session keys for per-visitor state.
pub mod keys {
    /// Verified role and secret (`bon_manual_core::Credential`).
    pub const CREDENTIAL: &str = "bon_auth";

    /// Admin preview transcript.
    pub const PREVIEW_MESSAGES: &str = "preview_messages";

    /// One-shot notice shown on the next page.
    pub const FLASH: &str = "flash";
}
