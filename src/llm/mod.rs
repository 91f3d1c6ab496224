// LLM abstraction layer

pub mod provider;
pub mod openai;
pub mod anthropic;
pub mod openrouter;
pub mod groq;
pub mod structured;

#[cfg(test)]
pub(crate) mod testing;

pub use provider::*;
pub use structured::parse_or_default;
pub use crate::types::*;
