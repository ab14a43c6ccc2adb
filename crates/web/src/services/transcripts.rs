//! Store-owner transcripts kept server-side, keyed by session.
//!
//! A streaming turn runs in its own task and mirrors every merged event
//! here, so a page load mid-answer shows the text received so far. Notices
//! raised by the turn itself wait here until the next page load.

use std::sync::Arc;
use std::time::Duration;

use bon_manual_core::chat::{Message, MessageList};
use moka::sync::Cache;
use parking_lot::Mutex;

use crate::models::Flash;

/// Transcripts idle this long are dropped along with their session.
const IDLE_EXPIRY: Duration = Duration::from_secs(12 * 60 * 60);

const MAX_ROOMS: u64 = 10_000;

#[derive(Default)]
struct Room {
    messages: Option<MessageList>,
    notice: Option<Flash>,
}

/// Per-session transcripts and turn notices.
#[derive(Clone)]
pub struct TranscriptStore {
    rooms: Cache<String, Arc<Mutex<Room>>>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    #[must_use]
    pub fn new() -> Self {
        let rooms = Cache::builder()
            .max_capacity(MAX_ROOMS)
            .time_to_idle(IDLE_EXPIRY)
            .build();
        Self { rooms }
    }

    /// The session's transcript, opening with the greeting.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> MessageList {
        self.rooms
            .get(key)
            .and_then(|room| room.lock().messages.clone())
            .unwrap_or_else(MessageList::with_greeting)
    }

    pub fn replace(&self, key: &str, messages: MessageList) {
        self.room(key).lock().messages = Some(messages);
    }

    /// Write one message back by id, leaving the rest of the transcript alone.
    pub fn merge(&self, key: &str, message: &Message) {
        self.room(key)
            .lock()
            .messages
            .get_or_insert_with(MessageList::with_greeting)
            .upsert(message.clone());
    }

    /// Leave a notice for the session's next page load.
    pub fn notify(&self, key: &str, notice: Flash) {
        self.room(key).lock().notice = Some(notice);
    }

    #[must_use]
    pub fn take_notice(&self, key: &str) -> Option<Flash> {
        self.rooms.get(key)?.lock().notice.take()
    }

    pub fn remove(&self, key: &str) {
        self.rooms.invalidate(key);
    }

    fn room(&self, key: &str) -> Arc<Mutex<Room>> {
        self.rooms.get_with(key.to_string(), Arc::default)
    }
}
