pub mod ai_config;
pub mod chat;
pub mod conversation;
pub mod health;
pub mod stats;
