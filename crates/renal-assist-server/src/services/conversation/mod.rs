//! Conversation memory management module
//!
//! Provides in-memory session state with:
//! - Thread-safe storage (DashMap)
//! - Bounded history per session (sliding window)
//! - Idle-time expiry, checked lazily on read and by a periodic sweep

mod store;
pub mod types;

pub use store::{spawn_sweeper, SessionStore};
pub use types::{ConversationSession, ConversationTurn, SessionStats, TurnMetadata};
