//! One question/answer exchange over the stream.

use thiserror::Error;

use super::decoder::SseDecoder;
use super::event::{StreamEvent, StreamFailure};
use crate::chat::{MessageId, MessageList};

/// Lifecycle of a streamed turn.
///
/// `Idle -> AwaitingFirstByte -> Streaming -> Completed | Errored`, with
/// `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingFirstByte,
    Streaming,
    Completed,
    Errored,
    Cancelled,
}

impl TurnState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }
}

/// Why a turn ended without completing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("backend reported {0}")]
    Backend(StreamFailure),

    #[error("backend responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("stream transport failed: {0}")]
    Transport(String),

    #[error("turn was cancelled")]
    Cancelled,
}

/// Drives one assistant message from an SSE byte stream.
///
/// The turn owns the decoder and the state; the caller owns the transcript
/// and applies the returned events to [`ChatTurn::message_id`].
#[derive(Debug)]
pub struct ChatTurn {
    message: MessageId,
    state: TurnState,
    decoder: SseDecoder,
    failure: Option<StreamFailure>,
}

impl ChatTurn {
    #[must_use]
    pub fn new(message: MessageId) -> Self {
        Self {
            message,
            state: TurnState::Idle,
            decoder: SseDecoder::new(),
            failure: None,
        }
    }

    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message
    }

    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// The backend failure that ended the turn, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&StreamFailure> {
        self.failure.as_ref()
    }

    /// The request has been sent.
    pub fn begin(&mut self) {
        if self.state == TurnState::Idle {
            self.state = TurnState::AwaitingFirstByte;
        }
    }

    /// Decode one read. Events after an `error` event are dropped and the
    /// turn becomes `Errored`; reads after a terminal state are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        if self.state.is_terminal() || bytes.is_empty() {
            return Vec::new();
        }
        self.state = TurnState::Streaming;
        let events = self.decoder.feed(bytes);
        self.settle(events)
    }

    /// The stream ended: flush the residual buffer and settle the state.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        let events = self.decoder.finish();
        let events = self.settle(events);
        if self.state != TurnState::Errored {
            self.state = TurnState::Completed;
        }
        events
    }

    /// A stream-level fault (transport error, bad status). Returns whether the
    /// turn was still live.
    pub fn fail(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = TurnState::Errored;
        true
    }

    /// Stop the turn; partial text stays as it is.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = TurnState::Cancelled;
        true
    }

    /// Decode a read and merge it straight into `messages`.
    pub fn feed_into(&mut self, bytes: &[u8], messages: &mut MessageList) -> Vec<StreamEvent> {
        let events = self.feed(bytes);
        self.apply(&events, messages);
        events
    }

    /// Finish and merge the flushed events into `messages`.
    pub fn finish_into(&mut self, messages: &mut MessageList) -> Vec<StreamEvent> {
        let events = self.finish();
        self.apply(&events, messages);
        events
    }

    fn apply(&self, events: &[StreamEvent], messages: &mut MessageList) {
        for event in events {
            messages.apply(self.message, event);
        }
    }

    fn settle(&mut self, mut events: Vec<StreamEvent>) -> Vec<StreamEvent> {
        if let Some(at) = events
            .iter()
            .position(|e| matches!(e, StreamEvent::Error(_)))
        {
            events.truncate(at + 1);
            if let Some(StreamEvent::Error(failure)) = events.last() {
                self.failure = Some(failure.clone());
            }
            self.state = TurnState::Errored;
        }
        events
    }
}
