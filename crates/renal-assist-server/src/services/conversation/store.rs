use chrono::Duration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::types::{ConversationSession, ConversationTurn, SessionStats, TurnMetadata};
use crate::models::chat::{Role, SessionId};
use crate::utils::clock::Clock;

/// Thread-safe in-memory session store.
///
/// Sessions are bounded in length (`max_history` turns) and in idle time
/// (`ttl` since the last append). Expired sessions disappear either lazily
/// when read or through [`SessionStore::sweep`].
#[derive(Clone)]
pub struct SessionStore {
    /// Session storage: session_id -> ConversationSession
    storage: Arc<DashMap<SessionId, ConversationSession>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_history: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_history: usize, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing session store (ttl={}s, max_history={})",
            ttl.num_seconds(),
            max_history
        );
        Self {
            storage: Arc::new(DashMap::new()),
            clock,
            ttl,
            max_history: max_history.max(1),
        }
    }

    /// Record one turn, creating the session on first reference.
    ///
    /// `user_id` and `patient_context` are taken from `metadata` only when the
    /// session is created. An expired session is replaced by a fresh one.
    /// Returns the transcript length right after this turn was recorded.
    pub fn append(&self, session_id: &str, role: Role, content: &str, metadata: TurnMetadata) -> usize {
        let now = self.clock.now();
        let turn = ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: now,
            metadata,
        };

        // The entry guard holds the shard lock for the whole trim + push
        match self.storage.entry(session_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let session = occupied.get_mut();
                if session.is_expired(now, self.ttl) {
                    debug!("Session {} expired, starting a new one", session_id);
                    *session = ConversationSession::new(session_id.to_string(), &turn.metadata, now);
                }
                session.push(turn, self.max_history);
                session.messages.len()
            }
            Entry::Vacant(vacant) => {
                debug!("Creating session {}", session_id);
                let mut session = ConversationSession::new(session_id.to_string(), &turn.metadata, now);
                session.push(turn, self.max_history);
                let len = session.messages.len();
                vacant.insert(session);
                len
            }
        }
    }

    /// Ordered transcript, oldest first; empty when absent or expired
    pub fn get(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.session(session_id)
            .map(|session| session.messages)
            .unwrap_or_default()
    }

    /// Full session snapshot with the same lazy-expiry rule as [`get`](Self::get)
    pub fn session(&self, session_id: &str) -> Option<ConversationSession> {
        let now = self.clock.now();
        let ttl = self.ttl;

        if self
            .storage
            .remove_if(session_id, |_, session| session.is_expired(now, ttl))
            .is_some()
        {
            debug!("Session {} expired, removed from store", session_id);
            return None;
        }

        self.storage.get(session_id).map(|entry| entry.value().clone())
    }

    /// Remove a session unconditionally
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self.storage.remove(session_id).is_some();
        if removed {
            debug!("Cleared session {}", session_id);
        }
        removed
    }

    /// Remove every expired session. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut removed = 0usize;

        self.storage.retain(|_, session| {
            let keep = !session.is_expired(now, ttl);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            info!("Session sweep removed {} expired sessions", removed);
        }

        removed
    }

    /// Number of stored sessions (expired ones included until read or swept)
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn stats(&self) -> SessionStats {
        let active_sessions = self.storage.len();
        let total_messages: usize = self
            .storage
            .iter()
            .map(|entry| entry.value().messages.len())
            .sum();

        let average_messages_per_session = if active_sessions == 0 {
            0.0
        } else {
            let avg = total_messages as f64 / active_sessions as f64;
            (avg * 10.0).round() / 10.0
        };

        SessionStats {
            active_sessions,
            total_messages,
            average_messages_per_session,
        }
    }
}

/// Run [`SessionStore::sweep`] every `period` on a background task.
///
/// The first tick fires one full period after start.
pub fn spawn_sweeper(store: SessionStore, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let removed = store.sweep();
            debug!("Periodic session sweep finished, removed={}", removed);
        }
    })
}
