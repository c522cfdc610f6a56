pub mod conversation;
pub mod fallback;
pub mod gemini;
pub mod orchestrator;
pub mod response_cache;
pub mod stats;

pub use fallback::LocalResponder;
pub use gemini::GeminiService;
pub use orchestrator::{
    AiResponseOrchestrator, ChatReply, FallbackResponder, GenerationRequest, GenerativeResponder,
    GeneratorError, TurnRequest,
};
pub use stats::{CombinedStats, StatsCollector};
