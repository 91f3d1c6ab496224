// Stop conditions, checked after every reflection.
// Kept pure so the priority order can be tested without a model.

use super::state::StopReason;

/// Smallest score gain that still counts as progress
pub const PLATEAU_MIN_DELTA: f64 = 0.30;
/// Consecutive stalled iterations before the loop gives up
pub const PLATEAU_PATIENCE: u32 = 2;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopInputs {
    pub score: f64,
    pub target: f64,
    pub should_refine: bool,
    pub iteration: u32,
    pub max_iterations: u32,
    pub plateaued: bool,
    pub tokens_used: u32,
    pub token_budget: u32,
}

/// First matching condition wins: target, no refinement needed, iteration
/// cap, plateau, budget.
pub fn evaluate_stop(inputs: &StopInputs) -> Option<StopReason> {
    if inputs.score >= inputs.target {
        Some(StopReason::TargetReached)
    } else if !inputs.should_refine {
        Some(StopReason::NoRefinementNeeded)
    } else if inputs.iteration >= inputs.max_iterations {
        Some(StopReason::MaxIterations)
    } else if inputs.plateaued {
        Some(StopReason::Plateaued)
    } else if inputs.tokens_used >= inputs.token_budget {
        Some(StopReason::BudgetExhausted)
    } else {
        None
    }
}

/// Tracks score deltas between iterations
#[derive(Debug, Clone, Default)]
pub struct PlateauTracker {
    previous: Option<f64>,
    stalled: u32,
}

impl PlateauTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the score of `iteration`; returns true once the loop has stalled
    pub fn observe(&mut self, iteration: u32, score: f64) -> bool {
        if iteration >= 2 {
            if let Some(previous) = self.previous {
                if score - previous + EPSILON < PLATEAU_MIN_DELTA {
                    self.stalled += 1;
                } else {
                    self.stalled = 0;
                }
            }
        }
        self.previous = Some(score);
        self.stalled >= PLATEAU_PATIENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> StopInputs {
        StopInputs {
            score: 5.0,
            target: 7.5,
            should_refine: true,
            iteration: 1,
            max_iterations: 3,
            plateaued: false,
            tokens_used: 100,
            token_budget: 35_000,
        }
    }

    fn first_plateau(scores: &[f64]) -> Option<u32> {
        let mut tracker = PlateauTracker::new();
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| (i as u32 + 1, *s))
            .find(|(iteration, score)| tracker.observe(*iteration, *score))
            .map(|(iteration, _)| iteration)
    }

    #[test]
    fn test_continue_when_nothing_matches() {
        assert_eq!(evaluate_stop(&inputs()), None);
    }

    #[test]
    fn test_priority_order() {
        let everything = StopInputs {
            score: 8.0,
            should_refine: false,
            iteration: 3,
            plateaued: true,
            tokens_used: 40_000,
            ..inputs()
        };
        assert_eq!(evaluate_stop(&everything), Some(StopReason::TargetReached));

        let below_target = StopInputs { score: 7.4, ..everything };
        assert_eq!(evaluate_stop(&below_target), Some(StopReason::NoRefinementNeeded));

        let refining = StopInputs { should_refine: true, ..below_target };
        assert_eq!(evaluate_stop(&refining), Some(StopReason::MaxIterations));

        let early = StopInputs { iteration: 2, ..refining };
        assert_eq!(evaluate_stop(&early), Some(StopReason::Plateaued));

        let progressing = StopInputs { plateaued: false, ..early };
        assert_eq!(evaluate_stop(&progressing), Some(StopReason::BudgetExhausted));
    }

    #[test]
    fn test_target_is_inclusive() {
        let at_target = StopInputs { score: 7.5, ..inputs() };
        assert_eq!(evaluate_stop(&at_target), Some(StopReason::TargetReached));
    }

    #[test]
    fn test_plateau_detection() {
        assert_eq!(first_plateau(&[5.0, 5.2, 5.3]), Some(3));
        assert_eq!(first_plateau(&[5.0, 5.5, 6.0]), None);
        // a real gain resets the counter
        assert_eq!(first_plateau(&[5.0, 5.1, 5.6, 5.7]), None);
        // regressions count as stalls
        assert_eq!(first_plateau(&[6.0, 5.0, 4.5]), Some(3));
    }

    #[test]
    fn test_plateau_stops_loop_at_iteration_three() {
        let mut tracker = PlateauTracker::new();
        let mut stopped_at = None;
        for (i, score) in [5.0, 5.2, 5.3].into_iter().enumerate() {
            let iteration = i as u32 + 1;
            let plateaued = tracker.observe(iteration, score);
            let decision = evaluate_stop(&StopInputs {
                score,
                iteration,
                max_iterations: 5,
                plateaued,
                ..inputs()
            });
            if let Some(reason) = decision {
                stopped_at = Some((iteration, reason));
                break;
            }
        }
        assert_eq!(stopped_at, Some((3, StopReason::Plateaued)));
    }
}
