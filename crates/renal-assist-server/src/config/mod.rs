pub mod settings;

pub use settings::{CacheConfig, GeneratorConfig, ServerConfig, SessionConfig, Settings};
