//! Answer caching keyed by normalised question text and risk bucket.

mod cache;
pub mod key;

pub use cache::{CacheStats, CachedResponse, QuotaStatus, ResponseCache, ResponseSource};
pub use key::{normalize, RiskBucket};
