// Oxidized Deck - multi-agent thinking loop for presentation generation

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;    // Web search providers (SerpAPI, Tavily, Brave)
pub mod thinking;  // Plan, draft, critique and refine loop
pub mod storage;
pub mod queue;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::{EnhancedPresentation, GenerationParams, QualityLevel};
pub use thinking::{ThinkingOrchestrator, ThinkingResult};
