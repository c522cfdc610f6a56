pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use router::build_router;
pub use state::AppState;
