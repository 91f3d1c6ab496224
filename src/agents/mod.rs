//! Agent System
//!
//! The agents that drive one presentation through the thinking loop:
//!
//! - **Planning Agent**: turns the request into a presentation plan
//! - **Research Agent**: proposes web queries and condenses what they return
//! - **Generator Agent**: drafts the deck slide by slide and applies refinements
//! - **Critic Agent**: scores the draft on seven criteria and proposes fixes
//!
//! ## Pipeline Overview
//!
//! ```text
//! GenerationParams
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Planning   │  → PresentationPlan
//! │   Agent     │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Research   │  → ResearchFindings (optional, never fails)
//! │   Agent     │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐      ┌─────────────┐
//! │  Generator  │ ───▶ │   Critic    │  → ReflectionResult
//! │   Agent     │ ◀─── │   Agent     │
//! └─────────────┘      └─────────────┘
//!         refinements
//! ```
//!
//! Every agent makes its model calls one after the other through the shared
//! [`LLM`](crate::llm::LLM) gateway and reports the tokens it spent alongside
//! its result, so the orchestrator can keep its budget without any locking.

pub mod planning;
pub mod research;
pub mod narrative;
pub mod generator;
pub mod critic;

pub use critic::{CriterionScore, CriticAgent, Improvement, Priority, ReflectionResult};
pub use generator::GeneratorAgent;
pub use narrative::SlideRole;
pub use planning::PlanningAgent;
pub use research::{ResearchAgent, ResearchFindings};

use crate::llm::CompletionOptions;

/// An agent result together with the tokens spent producing it
#[derive(Debug, Clone)]
pub struct Metered<T> {
    pub value: T,
    pub tokens: u32,
}

impl<T> Metered<T> {
    pub fn new(value: T, tokens: u32) -> Self {
        Self { value, tokens }
    }
}

/// Model selection shared by all agents of one orchestrator
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }

    /// JSON-mode options with the given sampling temperature
    pub fn options(&self, temperature: f32, max_tokens: u32, system: &str) -> CompletionOptions {
        CompletionOptions::new(self.model.clone())
            .with_temperature(temperature)
            .with_max_tokens(max_tokens)
            .with_system(system)
    }
}
