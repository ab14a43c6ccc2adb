//! Business logic services.
//!
//! # Services
//!
//! - `chat` - Store-owner chat turns streamed in the background
//! - `transcripts` - Server-side transcripts the turns write into
//! - `turns` - Per-session registry of in-flight turns and their cancellation

pub mod chat;
pub mod transcripts;
pub mod turns;

pub use chat::{ChatService, Submission, TurnOutcome};
pub use transcripts::TranscriptStore;
pub use turns::{TurnGuard, TurnRegistry};
