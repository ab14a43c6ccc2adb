//! Session-held models for the web front end.

pub mod flash;
pub mod preview;
pub mod session;

pub use flash::{Flash, FlashLevel};
pub use preview::{PreviewEntry, PreviewTranscript};
pub use session::keys as session_keys;
