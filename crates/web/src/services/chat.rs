//! Store-owner chat turns.
//!
//! Submitting a question appends it to the session's transcript and starts
//! the turn in a background task. The task writes each merged event back to
//! the [`TranscriptStore`](super::TranscriptStore), so the chat page shows
//! the answer growing until the turn completes, fails or is cancelled.

use bon_manual_core::Credential;
use bon_manual_core::chat::MessageList;
use bon_manual_core::stream::TurnError;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::TurnGuard;
use crate::backend::stream_answer;
use crate::error::AppError;
use crate::models::Flash;
use crate::state::AppState;

/// Notice left for the next page load after a stopped answer.
pub const STOPPED_NOTICE: &str = "Answer stopped.";

/// Whether a question was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The answer is streaming in the background.
    Started,
    /// Another turn for this session is still streaming.
    Busy,
}

/// How a turn ended.
#[derive(Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    /// The answer carries the error notice.
    Failed(TurnError),
    /// Stopped on request; partial text kept.
    Cancelled,
}

impl From<Result<(), TurnError>> for TurnOutcome {
    fn from(result: Result<(), TurnError>) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(TurnError::Cancelled) => Self::Cancelled,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Chat operations for one visitor session.
pub struct ChatService<'a> {
    state: &'a AppState,
    session: &'a Session,
}

impl<'a> ChatService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState, session: &'a Session) -> Self {
        Self { state, session }
    }

    /// The visitor's transcript as it stands, opening with the greeting.
    #[must_use]
    pub fn transcript(&self) -> MessageList {
        self.turn_key().map_or_else(MessageList::with_greeting, |key| {
            self.state.transcripts().snapshot(&key)
        })
    }

    /// A notice left by a finished turn, shown once.
    #[must_use]
    pub fn take_notice(&self) -> Option<Flash> {
        let key = self.turn_key()?;
        self.state.transcripts().take_notice(&key)
    }

    /// Whether a turn is streaming for this session right now.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.turn_key()
            .is_some_and(|key| self.state.turns().is_active(&key))
    }

    /// Append `question` and start streaming its answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no id yet. Backend failures land
    /// in the transcript, not here.
    pub fn submit(&self, credential: &Credential, question: &str) -> Result<Submission, AppError> {
        let key = self
            .turn_key()
            .ok_or_else(|| AppError::Internal("chat session has no id".to_string()))?;
        let Some(guard) = self.state.turns().begin(&key) else {
            return Ok(Submission::Busy);
        };

        let mut messages = self.state.transcripts().snapshot(&key);
        messages.push_user(question);
        self.state.transcripts().replace(&key, messages.clone());

        tokio::spawn(run_turn(
            self.state.clone(),
            key,
            credential.clone(),
            question.to_string(),
            messages,
            guard,
        ));
        Ok(Submission::Started)
    }

    /// Stop this session's running turn. Returns whether one was running.
    #[must_use]
    pub fn cancel(&self) -> bool {
        self.turn_key()
            .is_some_and(|key| self.state.turns().cancel(&key))
    }

    /// Forget the transcript.
    pub fn reset(&self) {
        if let Some(key) = self.turn_key() {
            self.state.transcripts().remove(&key);
        }
    }

    fn turn_key(&self) -> Option<String> {
        self.session.id().map(|id| id.to_string())
    }
}

/// Stream one answer into the stored transcript.
///
/// The turn slot is released only after the final transcript and notice are
/// stored.
#[instrument(skip_all)]
async fn run_turn(
    state: AppState,
    key: String,
    credential: Credential,
    question: String,
    mut messages: MessageList,
    guard: TurnGuard,
) -> TurnOutcome {
    let transcripts = state.transcripts();
    let result = stream_answer(
        state.backend(),
        &credential,
        &question,
        &mut messages,
        guard.token(),
        |message, _| transcripts.merge(&key, message),
    )
    .await;
    transcripts.replace(&key, messages);

    let outcome = TurnOutcome::from(result.map(|_| ()));
    match &outcome {
        TurnOutcome::Completed => info!("chat turn completed"),
        TurnOutcome::Cancelled => {
            info!("chat turn cancelled");
            transcripts.notify(&key, Flash::warning(STOPPED_NOTICE));
        }
        TurnOutcome::Failed(e) => warn!(error = %e, "chat turn failed"),
    }

    drop(guard);
    outcome
}
