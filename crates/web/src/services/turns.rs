//! One streamed turn per session at a time.
//!
//! A session's input stays locked while its turn is streaming; the entry
//! holds the turn's cancellation token so another request can stop it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// In-flight turns keyed by session.
#[derive(Clone, Default)]
pub struct TurnRegistry {
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl TurnRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the session's turn slot. `None` while another turn is running.
    #[must_use]
    pub fn begin(&self, key: &str) -> Option<TurnGuard> {
        let mut active = self.active.lock();
        if active.contains_key(key) {
            return None;
        }
        let token = CancellationToken::new();
        active.insert(key.to_string(), token.clone());
        Some(TurnGuard {
            registry: self.clone(),
            key: key.to_string(),
            token,
        })
    }

    /// Cancel the session's running turn. Returns whether one was running.
    pub fn cancel(&self, key: &str) -> bool {
        self.active.lock().get(key).is_some_and(|token| {
            token.cancel();
            true
        })
    }

    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.active.lock().contains_key(key)
    }

    /// Cancel everything, e.g. on shutdown.
    pub fn cancel_all(&self) {
        for token in self.active.lock().values() {
            token.cancel();
        }
    }
}

/// Releases the session's slot when dropped.
pub struct TurnGuard {
    registry: TurnRegistry,
    key: String,
    token: CancellationToken,
}

impl TurnGuard {
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.registry.active.lock().remove(&self.key);
    }
}
