//! Server-Sent Events protocol for streamed chat answers.
//!
//! Bytes flow through three layers:
//! - [`FrameSplitter`] buffers reads and cuts complete frames at blank lines
//! - [`parse_frame`] turns one frame into a [`StreamEvent`]
//! - [`ChatTurn`] tracks the turn's state and stops at the first `error`
//!
//! [`SseDecoder`] combines the first two for callers that only need events.

mod decoder;
mod event;
mod frame;
mod turn;

pub use decoder::SseDecoder;
pub use event::{FrameError, StreamErrorKind, StreamEvent, StreamFailure, parse_frame, split_frame};
pub use frame::FrameSplitter;
pub use turn::{ChatTurn, TurnError, TurnState};
