use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::chat::{PatientContext, ReplySource, Role, SessionId};

/// Per-turn metadata recorded with each message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<PatientContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ReplySource>,
}

impl TurnMetadata {
    pub fn new(user_id: Option<String>, patient_context: Option<PatientContext>) -> Self {
        Self {
            user_id,
            patient_context,
            source: None,
        }
    }

    pub fn with_source(mut self, source: ReplySource) -> Self {
        self.source = Some(source);
        self
    }
}

/// One dialogue turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: TurnMetadata,
}

/// Complete conversation state stored in the session store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub session_id: SessionId,

    /// Ordered oldest first, bounded by the store's history limit
    pub messages: Vec<ConversationTurn>,

    pub created_at: DateTime<Utc>,

    /// Bumped on every append; drives expiry
    pub last_activity: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Snapshot taken when the session was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<PatientContext>,
}

impl ConversationSession {
    /// Create a session seeded from the metadata of its first turn
    pub fn new(session_id: SessionId, metadata: &TurnMetadata, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
            user_id: metadata.user_id.clone(),
            patient_context: metadata.patient_context.clone(),
        }
    }

    /// Shared by the lazy read check and the periodic sweep
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity > ttl
    }

    /// Append a turn, dropping the oldest ones beyond `max_history`
    pub fn push(&mut self, turn: ConversationTurn, max_history: usize) {
        self.last_activity = turn.timestamp;
        self.messages.push(turn);

        if self.messages.len() > max_history {
            let overflow = self.messages.len() - max_history;
            self.messages.drain(..overflow);
        }
    }
}

/// Session store statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub active_sessions: usize,
    pub total_messages: usize,
    pub average_messages_per_session: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(content: &str, at: DateTime<Utc>) -> ConversationTurn {
        ConversationTurn {
            role: Role::User,
            content: content.to_string(),
            timestamp: at,
            metadata: TurnMetadata::default(),
        }
    }

    #[test]
    fn test_push_trims_oldest_and_touches() {
        let start = Utc::now();
        let mut session = ConversationSession::new("s".into(), &TurnMetadata::default(), start);

        for i in 0..5 {
            session.push(turn(&i.to_string(), start + Duration::seconds(i)), 3);
        }

        let contents: Vec<_> = session.messages.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
        assert_eq!(session.last_activity, start + Duration::seconds(4));
        assert_eq!(session.created_at, start);
    }

    #[test]
    fn test_expiry_is_strictly_after_ttl() {
        let start = Utc::now();
        let session = ConversationSession::new("s".into(), &TurnMetadata::default(), start);
        let ttl = Duration::hours(24);

        assert!(!session.is_expired(start + ttl, ttl));
        assert!(session.is_expired(start + ttl + Duration::milliseconds(1), ttl));
    }
}
