pub mod cache;
pub mod confidence;
pub mod engine;
pub mod enhance;
pub mod prompt;

pub use cache::ResponseCache;
pub use engine::{EngineConfig, QueryEngine, QueryResult};
pub use enhance::enhance_query;
