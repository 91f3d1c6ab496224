// Session state for one thinking run. Owned by the orchestrator, returned to
// the caller as the audit trail once the run completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingPhase {
    Planning,
    Research,
    Generation,
    Reflection,
    Refinement,
    Complete,
}

impl ThinkingPhase {
    pub fn can_transition_to(&self, next: ThinkingPhase) -> bool {
        use ThinkingPhase::*;
        matches!(
            (self, next),
            (Planning, Research)
                | (Planning, Generation)
                | (Research, Generation)
                | (Generation, Reflection)
                | (Reflection, Refinement)
                | (Reflection, Complete)
                | (Refinement, Generation)
                | (Refinement, Complete)
        )
    }
}

impl std::fmt::Display for ThinkingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ThinkingPhase::Planning => "planning",
            ThinkingPhase::Research => "research",
            ThinkingPhase::Generation => "generation",
            ThinkingPhase::Reflection => "reflection",
            ThinkingPhase::Refinement => "refinement",
            ThinkingPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    NoRefinementNeeded,
    MaxIterations,
    Plateaued,
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingStep {
    /// Position within the current iteration
    pub step_number: u32,
    pub phase: ThinkingPhase,
    pub thought: String,
    pub action: String,
    pub observation: String,
    pub timestamp: DateTime<Utc>,
}

/// Iteration cap, quality target and token budget for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    pub max_iterations: u32,
    pub target_quality_score: f64,
    pub token_budget: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingState {
    pub session_id: String,
    pub phase: ThinkingPhase,
    pub steps: Vec<ThinkingStep>,
    pub iteration: u32,
    pub max_iterations: u32,
    pub quality_score: f64,
    pub target_quality_score: f64,
    pub tokens_used: u32,
    pub token_budget: u32,
    pub stop_reason: Option<StopReason>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    steps_in_iteration: u32,
}

impl ThinkingState {
    pub fn new(limits: RunLimits) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            phase: ThinkingPhase::Planning,
            steps: Vec::new(),
            iteration: 0,
            max_iterations: limits.max_iterations,
            quality_score: 0.0,
            target_quality_score: limits.target_quality_score,
            tokens_used: 0,
            token_budget: limits.token_budget,
            stop_reason: None,
            started_at: Utc::now(),
            ended_at: None,
            steps_in_iteration: 0,
        }
    }

    pub fn transition(&mut self, next: ThinkingPhase) -> AppResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "Illegal phase transition: {} -> {}",
                self.phase, next
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Start the next iteration. Going past the cap is a contract violation.
    pub fn begin_iteration(&mut self) -> AppResult<u32> {
        if self.iteration >= self.max_iterations {
            return Err(AppError::Internal(format!(
                "Iteration {} exceeds the cap of {}",
                self.iteration + 1,
                self.max_iterations
            )));
        }
        self.iteration += 1;
        self.steps_in_iteration = 0;
        Ok(self.iteration)
    }

    pub fn record_step(
        &mut self,
        thought: impl Into<String>,
        action: impl Into<String>,
        observation: impl Into<String>,
    ) -> &ThinkingStep {
        self.steps_in_iteration += 1;
        self.steps.push(ThinkingStep {
            step_number: self.steps_in_iteration,
            phase: self.phase,
            thought: thought.into(),
            action: action.into(),
            observation: observation.into(),
            timestamp: Utc::now(),
        });
        &self.steps[self.steps.len() - 1]
    }

    pub fn add_tokens(&mut self, tokens: u32) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    pub fn finish(&mut self, reason: StopReason) -> AppResult<()> {
        self.transition(ThinkingPhase::Complete)?;
        self.stop_reason = Some(reason);
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.phase == ThinkingPhase::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max_iterations: u32) -> ThinkingState {
        ThinkingState::new(RunLimits {
            max_iterations,
            target_quality_score: 7.5,
            token_budget: 1000,
        })
    }

    #[test]
    fn test_legal_path_through_the_loop() {
        let mut s = state(2);
        s.transition(ThinkingPhase::Research).unwrap();
        s.transition(ThinkingPhase::Generation).unwrap();
        s.transition(ThinkingPhase::Reflection).unwrap();
        s.transition(ThinkingPhase::Refinement).unwrap();
        s.transition(ThinkingPhase::Generation).unwrap();
        s.transition(ThinkingPhase::Reflection).unwrap();
        s.finish(StopReason::MaxIterations).unwrap();
        assert!(s.is_complete());
        assert!(s.ended_at.is_some());
    }

    #[test]
    fn test_illegal_transitions_are_internal_errors() {
        let mut s = state(1);
        assert!(matches!(s.transition(ThinkingPhase::Reflection), Err(AppError::Internal(_))));
        s.transition(ThinkingPhase::Generation).unwrap();
        assert!(matches!(s.transition(ThinkingPhase::Research), Err(AppError::Internal(_))));
        assert!(!ThinkingPhase::Complete.can_transition_to(ThinkingPhase::Planning));
        assert_eq!(s.phase, ThinkingPhase::Generation);
    }

    #[test]
    fn test_iteration_cap_is_enforced() {
        let mut s = state(1);
        assert_eq!(s.begin_iteration().unwrap(), 1);
        assert!(matches!(s.begin_iteration(), Err(AppError::Internal(_))));
        assert_eq!(s.iteration, 1);
    }

    #[test]
    fn test_step_numbers_restart_each_iteration() {
        let mut s = state(2);
        s.record_step("plan", "create_plan", "ok");
        s.begin_iteration().unwrap();
        s.record_step("draft", "generate", "ok");
        s.record_step("draft more", "generate", "ok");
        s.begin_iteration().unwrap();
        let step = s.record_step("again", "generate", "ok").clone();

        assert_eq!(s.steps.len(), 4);
        assert_eq!(s.steps[2].step_number, 2);
        assert_eq!(step.step_number, 1);
    }

    #[test]
    fn test_token_total_saturates() {
        let mut s = state(1);
        s.add_tokens(u32::MAX - 10);
        s.add_tokens(500);
        assert_eq!(s.tokens_used, u32::MAX);
    }
}
