use serde::Serialize;
use std::sync::Arc;

use crate::services::conversation::{SessionStats, SessionStore};
use crate::services::response_cache::{CacheStats, ResponseCache};

/// Cache and session figures reported together
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedStats {
    pub cache: CacheStats,
    pub sessions: SessionStats,
    pub session_ttl_hours: i64,
    pub max_history: usize,
}

/// Read-only view over the two stores
#[derive(Clone)]
pub struct StatsCollector {
    cache: Arc<ResponseCache>,
    sessions: SessionStore,
}

impl StatsCollector {
    pub fn new(cache: Arc<ResponseCache>, sessions: SessionStore) -> Self {
        Self { cache, sessions }
    }

    pub fn snapshot(&self) -> CombinedStats {
        CombinedStats {
            cache: self.cache.stats(),
            sessions: self.sessions.stats(),
            session_ttl_hours: self.sessions.ttl().num_hours(),
            max_history: self.sessions.max_history(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use crate::services::conversation::TurnMetadata;
    use crate::services::response_cache::ResponseSource;
    use crate::utils::clock::ManualClock;
    use chrono::Duration;

    #[test]
    fn test_snapshot_reflects_both_stores() {
        let clock = Arc::new(ManualClock::default());
        let sessions = SessionStore::new(Duration::hours(24), 50, clock.clone());
        let cache = Arc::new(ResponseCache::new(
            500,
            Duration::hours(24),
            Duration::hours(1),
            clock,
        ));

        sessions.append("s1", Role::User, "hi", TurnMetadata::default());
        sessions.append("s1", Role::Assistant, "hello", TurnMetadata::default());
        cache.put("hi", None, "hello", ResponseSource::Generated);
        cache.get("hi", None);
        cache.get("bye", None);

        let stats = StatsCollector::new(cache, sessions).snapshot();
        assert_eq!(stats.sessions.active_sessions, 1);
        assert_eq!(stats.sessions.total_messages, 2);
        assert_eq!(stats.cache.size, 1);
        assert_eq!(stats.cache.hit_rate, 50.0);
        assert_eq!(stats.session_ttl_hours, 24);
        assert_eq!(stats.max_history, 50);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["cache"]["apiCallsSaved"], 1);
        assert_eq!(json["sessionTtlHours"], 24);
    }
}
