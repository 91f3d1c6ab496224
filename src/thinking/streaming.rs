// Events pushed to a streaming caller while a run progresses

use serde::{Deserialize, Serialize};

use super::report::QualityReport;
use super::state::{StopReason, ThinkingPhase, ThinkingState, ThinkingStep};
use crate::models::EnhancedPresentation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ThinkingEvent {
    /// Phase change or score update
    #[serde(rename_all = "camelCase")]
    State {
        phase: ThinkingPhase,
        iteration: u32,
        quality_score: f64,
        tokens_used: u32,
        stop_reason: Option<StopReason>,
    },
    Step(ThinkingStep),
    /// A full or refined deck. The report is set on the finished one.
    #[serde(rename_all = "camelCase")]
    Presentation {
        presentation: Box<EnhancedPresentation>,
        quality_report: Option<QualityReport>,
    },
}

impl ThinkingEvent {
    pub fn state(state: &ThinkingState) -> Self {
        ThinkingEvent::State {
            phase: state.phase,
            iteration: state.iteration,
            quality_score: state.quality_score,
            tokens_used: state.tokens_used,
            stop_reason: state.stop_reason,
        }
    }
}
