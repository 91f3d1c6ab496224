//! Thinking Orchestrator
//!
//! Drives one presentation through the quality-gated loop:
//!
//! ```text
//! Planning ─▶ Research? ─▶ Generation ─▶ Reflection ─┬─▶ Complete
//!                              ▲                      │
//!                              └──── Refinement ◀─────┘
//! ```
//!
//! The first iteration drafts the whole deck; later iterations work on the
//! same deck after its high and medium priority improvements have been
//! applied. After each reflection the stop conditions in [`stopping`] decide
//! whether to go round again.
//!
//! All model calls are awaited one after the other and the [`ThinkingState`]
//! is owned by the running call, so nothing here needs a lock. Only the
//! [`LLM`] gateway is shared between sessions.

pub mod report;
pub mod state;
pub mod stopping;
pub mod streaming;

pub use report::{QualityBreakdown, QualityReport};
pub use state::{RunLimits, StopReason, ThinkingPhase, ThinkingState, ThinkingStep};
pub use stopping::{evaluate_stop, PlateauTracker, StopInputs};
pub use streaming::ThinkingEvent;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agents::{
    AgentSettings, CriticAgent, GeneratorAgent, PlanningAgent, ReflectionResult, ResearchAgent,
};
use crate::config::Config;
use crate::llm::{LLMProviderConfig, LLM};
use crate::models::{EnhancedPresentation, GenerationParams, PresentationPlan};
use crate::search::{select_provider, SearchProvider};
use crate::types::{AppError, AppResult};

/// Hard ceiling on iterations whatever the quality tier asks for
pub const MAX_ITERATIONS_CAP: u32 = 3;
/// Hard ceiling on the target score
pub const TARGET_SCORE_CAP: f64 = 8.5;

/// Cooperative cancellation, checked at every phase boundary
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingResult {
    pub presentation: EnhancedPresentation,
    pub plan: PresentationPlan,
    pub reflection: ReflectionResult,
    pub quality_report: QualityReport,
    pub state: ThinkingState,
}

/// Quality tier settings, caller overrides, then the hard caps
pub fn run_limits(params: &GenerationParams) -> RunLimits {
    let settings = params.quality_level.settings();
    RunLimits {
        max_iterations: params
            .max_iterations
            .unwrap_or(settings.max_iterations)
            .clamp(1, MAX_ITERATIONS_CAP),
        target_quality_score: params
            .target_quality_score
            .unwrap_or(settings.target_score)
            .min(TARGET_SCORE_CAP),
        token_budget: settings.token_budget,
    }
}

/// Per-run bookkeeping: state, optional event channel, cancellation
struct Run<'a> {
    state: ThinkingState,
    events: Option<&'a mpsc::Sender<ThinkingEvent>>,
    cancel: &'a CancellationFlag,
}

impl<'a> Run<'a> {
    fn new(limits: RunLimits, events: Option<&'a mpsc::Sender<ThinkingEvent>>, cancel: &'a CancellationFlag) -> Self {
        Self {
            state: ThinkingState::new(limits),
            events,
            cancel,
        }
    }

    fn checkpoint(&self) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            warn!(session_id = %self.state.session_id, phase = %self.state.phase, "Run cancelled");
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    async fn emit(&self, event: ThinkingEvent) -> AppResult<()> {
        if let Some(tx) = self.events {
            tx.send(event).await.map_err(|_| {
                warn!(session_id = %self.state.session_id, "Event receiver closed, cancelling run");
                AppError::Cancelled
            })?;
        }
        Ok(())
    }

    async fn start(&self) -> AppResult<()> {
        self.checkpoint()?;
        self.emit(ThinkingEvent::state(&self.state)).await
    }

    async fn enter(&mut self, phase: ThinkingPhase) -> AppResult<()> {
        self.checkpoint()?;
        self.state.transition(phase)?;
        debug!(session_id = %self.state.session_id, phase = %phase, "Phase entered");
        self.emit(ThinkingEvent::state(&self.state)).await
    }

    async fn step(&mut self, thought: String, action: &str, observation: String) -> AppResult<()> {
        let step = self.state.record_step(thought, action, observation).clone();
        self.emit(ThinkingEvent::Step(step)).await
    }

    async fn finish(&mut self, reason: StopReason) -> AppResult<()> {
        self.state.finish(reason)?;
        info!(
            session_id = %self.state.session_id,
            reason = ?reason,
            iteration = self.state.iteration,
            score = self.state.quality_score,
            tokens = self.state.tokens_used,
            "Thinking loop stopped"
        );
        self.emit(ThinkingEvent::state(&self.state)).await
    }

    fn stop_decision(&self, should_refine: bool, plateaued: bool) -> Option<StopReason> {
        evaluate_stop(&StopInputs {
            score: self.state.quality_score,
            target: self.state.target_quality_score,
            should_refine,
            iteration: self.state.iteration,
            max_iterations: self.state.max_iterations,
            plateaued,
            tokens_used: self.state.tokens_used,
            token_budget: self.state.token_budget,
        })
    }
}

pub struct ThinkingOrchestrator {
    planner: PlanningAgent,
    researcher: ResearchAgent,
    generator: GeneratorAgent,
    critic: CriticAgent,
    research_enabled: bool,
    cancel: CancellationFlag,
}

impl ThinkingOrchestrator {
    pub fn new(llm: Arc<LLM>, settings: AgentSettings, search: Option<Arc<dyn SearchProvider>>) -> Self {
        Self {
            planner: PlanningAgent::new(llm.clone(), settings.clone()),
            researcher: ResearchAgent::new(llm.clone(), settings.clone(), search),
            generator: GeneratorAgent::new(llm.clone(), settings.clone()),
            critic: CriticAgent::new(llm, settings),
            research_enabled: true,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let llm = LLM::new(LLMProviderConfig::from_config(&config.llm)?)?;
        info!(provider = %llm.provider_name(), model = %config.llm.model, "Model gateway ready");

        Ok(Self::new(
            Arc::new(llm),
            AgentSettings::new(config.llm.model.clone()),
            select_provider(&config.search),
        )
        .with_research(config.thinking.enable_research))
    }

    /// Globally allow or forbid the research phase
    pub fn with_research(mut self, enabled: bool) -> Self {
        self.research_enabled = enabled;
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Full thinking loop
    pub async fn generate(&self, params: &GenerationParams) -> AppResult<ThinkingResult> {
        params.validated()?;

        let limits = run_limits(params);
        let mut run = Run::new(limits, None, &self.cancel);
        info!(
            session_id = %run.state.session_id,
            topic = %params.topic,
            quality = %params.quality_level,
            max_iterations = limits.max_iterations,
            target = limits.target_quality_score,
            budget = limits.token_budget,
            "Starting thinking loop"
        );
        run.start().await?;

        let (plan, research_context) = self.prepare(params, &mut run).await?;

        let mut presentation: Option<EnhancedPresentation> = None;
        let mut plateau = PlateauTracker::new();

        let reflection = loop {
            let iteration = run.state.begin_iteration()?;

            if let Some(sections) = presentation.as_ref().map(|p| p.sections.len()) {
                run.step(
                    format!("Iteration {} continues from the refined draft", iteration),
                    "reuse_presentation",
                    format!("{} sections", sections),
                )
                .await?;
            } else {
                presentation = Some(self.draft(&plan, params, research_context.as_deref(), &mut run).await?);
            }

            run.enter(ThinkingPhase::Reflection).await?;
            let current = presentation
                .as_ref()
                .ok_or_else(|| AppError::Internal("Reflection without a presentation".to_string()))?;
            let reflection = self.reflect(current, &plan, &mut run).await?;
            let plateaued = plateau.observe(iteration, reflection.overall_score);

            if let Some(reason) = run.stop_decision(reflection.should_refine, plateaued) {
                run.finish(reason).await?;
                break reflection;
            }

            run.enter(ThinkingPhase::Refinement).await?;
            let draft = presentation
                .as_mut()
                .ok_or_else(|| AppError::Internal("Refinement without a presentation".to_string()))?;
            self.refine(draft, &reflection, params, &mut run).await?;

            run.enter(ThinkingPhase::Generation).await?;
        };

        let presentation =
            presentation.ok_or_else(|| AppError::Internal("Completed without a presentation".to_string()))?;
        self.assemble(run, presentation, plan, reflection).await
    }

    /// Reports progress on `events` while it runs: one draft, one critique,
    /// then at most one refinement pass if the critic asks for it. A
    /// `presentation` event follows the draft and the finished deck. A closed
    /// receiver cancels the run.
    pub async fn generate_streaming(
        &self,
        params: &GenerationParams,
        events: mpsc::Sender<ThinkingEvent>,
    ) -> AppResult<ThinkingResult> {
        params.validated()?;

        let limits = RunLimits {
            max_iterations: 1,
            ..run_limits(params)
        };
        let mut run = Run::new(limits, Some(&events), &self.cancel);
        info!(session_id = %run.state.session_id, topic = %params.topic, "Starting streaming generation");
        run.start().await?;

        let (plan, research_context) = self.prepare(params, &mut run).await?;

        run.state.begin_iteration()?;
        let mut presentation = self.draft(&plan, params, research_context.as_deref(), &mut run).await?;
        run.emit(ThinkingEvent::Presentation {
            presentation: Box::new(presentation.clone()),
            quality_report: None,
        })
        .await?;

        run.enter(ThinkingPhase::Reflection).await?;
        let reflection = self.reflect(&presentation, &plan, &mut run).await?;

        let reason = if reflection.should_refine {
            run.enter(ThinkingPhase::Refinement).await?;
            self.refine(&mut presentation, &reflection, params, &mut run).await?;
            StopReason::MaxIterations
        } else if reflection.overall_score >= run.state.target_quality_score {
            StopReason::TargetReached
        } else {
            StopReason::NoRefinementNeeded
        };
        run.finish(reason).await?;

        self.assemble(run, presentation, plan, reflection).await
    }

    /// Baseline plan, one draft, one critique for the report
    pub async fn generate_quick(&self, params: &GenerationParams) -> AppResult<ThinkingResult> {
        params.validated()?;

        let limits = RunLimits {
            max_iterations: 1,
            ..run_limits(params)
        };
        let mut run = Run::new(limits, None, &self.cancel);
        info!(session_id = %run.state.session_id, topic = %params.topic, "Starting quick generation");
        run.start().await?;

        let plan = PresentationPlan::baseline(params);
        run.step(
            "Using the baseline plan".to_string(),
            "baseline_plan",
            format!("{} slides", plan.estimated_slides),
        )
        .await?;

        run.enter(ThinkingPhase::Generation).await?;
        run.state.begin_iteration()?;
        let presentation = self.draft(&plan, params, params.raw_data.as_deref(), &mut run).await?;

        run.enter(ThinkingPhase::Reflection).await?;
        let reflection = self.reflect(&presentation, &plan, &mut run).await?;

        let reason = run
            .stop_decision(reflection.should_refine, false)
            .unwrap_or(StopReason::MaxIterations);
        run.finish(reason).await?;

        self.assemble(run, presentation, plan, reflection).await
    }

    /// Planning, then research when it applies. Leaves the run in Generation.
    async fn prepare(
        &self,
        params: &GenerationParams,
        run: &mut Run<'_>,
    ) -> AppResult<(PresentationPlan, Option<String>)> {
        let plan = self.planner.create_plan(params).await?;
        run.state.add_tokens(plan.tokens);
        let plan = plan.value;
        run.step(
            format!("Worked out how to present \"{}\" to {}", params.topic, plan.target_audience.audience_type),
            "create_plan",
            format!(
                "{} slides, {} arc, {} key messages",
                plan.estimated_slides,
                plan.content_strategy.narrative_arc,
                plan.key_messages.len()
            ),
        )
        .await?;

        // only when no data was supplied
        let raw_data = params.raw_data.as_deref().filter(|d| !d.trim().is_empty());
        let mut research_context: Option<String> = None;
        if self.research_enabled && params.enable_research && raw_data.is_none() {
            run.enter(ThinkingPhase::Research).await?;
            let findings = self.researcher.research(&params.topic).await;
            run.state.add_tokens(findings.tokens);
            run.step(
                "Looked for current facts and figures".to_string(),
                "research",
                format!(
                    "{} queries, {} data points",
                    findings.value.queries.len(),
                    findings.value.data_points.len()
                ),
            )
            .await?;
            research_context = Some(findings.value.to_prompt_context());
        }

        run.enter(ThinkingPhase::Generation).await?;
        Ok((plan, research_context))
    }

    async fn draft(
        &self,
        plan: &PresentationPlan,
        params: &GenerationParams,
        context: Option<&str>,
        run: &mut Run<'_>,
    ) -> AppResult<EnhancedPresentation> {
        let draft = self.generator.generate_presentation(plan, params, context).await?;
        run.state.add_tokens(draft.tokens);
        run.step(
            "Drafted every slide in narrative order".to_string(),
            "generate_presentation",
            format!("\"{}\" with {} sections", draft.value.title, draft.value.sections.len()),
        )
        .await?;
        Ok(draft.value)
    }

    async fn reflect(
        &self,
        presentation: &EnhancedPresentation,
        plan: &PresentationPlan,
        run: &mut Run<'_>,
    ) -> AppResult<ReflectionResult> {
        let reflection = self
            .critic
            .evaluate(presentation, plan, run.state.target_quality_score)
            .await?;
        run.state.add_tokens(reflection.tokens);
        let reflection = reflection.value;

        run.state.quality_score = reflection.overall_score;
        run.step(
            format!("Scored iteration {}", run.state.iteration),
            "evaluate",
            format!(
                "score {:.1}/{:.1}, {} improvements",
                reflection.overall_score,
                run.state.target_quality_score,
                reflection.improvements.len()
            ),
        )
        .await?;
        Ok(reflection)
    }

    /// Applies the high and medium priority improvements in place
    async fn refine(
        &self,
        presentation: &mut EnhancedPresentation,
        reflection: &ReflectionResult,
        params: &GenerationParams,
        run: &mut Run<'_>,
    ) -> AppResult<()> {
        let actionable = reflection.actionable_improvements();
        let tokens = self.generator.apply_refinements(presentation, &actionable, params).await?;
        run.state.add_tokens(tokens);
        run.step(
            "Applied the critic's high and medium priority improvements".to_string(),
            "apply_refinements",
            format!("{} improvements", actionable.len()),
        )
        .await
    }

    async fn assemble(
        &self,
        run: Run<'_>,
        presentation: EnhancedPresentation,
        plan: PresentationPlan,
        reflection: ReflectionResult,
    ) -> AppResult<ThinkingResult> {
        let quality_report = QualityReport::from_reflection(&reflection, run.state.target_quality_score);

        run.emit(ThinkingEvent::Presentation {
            presentation: Box::new(presentation.clone()),
            quality_report: Some(quality_report.clone()),
        })
        .await?;

        info!(
            session_id = %run.state.session_id,
            sections = presentation.sections.len(),
            overall = quality_report.overall_score,
            passed = quality_report.passed,
            tokens = run.state.tokens_used,
            "Presentation complete"
        );

        Ok(ThinkingResult {
            presentation,
            plan,
            reflection,
            quality_report,
            state: run.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedAdapter;
    use crate::models::QualityLevel;

    const WEAK_SYNTHESIS: &str = r#"{"strengths": [], "weaknesses": ["The opening is flat"]}"#;
    const HOOK_FIX: &str = r#"{"improvements": [
        {"area": "hook", "suggestedChange": "Open with a story", "priority": "high", "affectedSections": [0]},
        {"area": "polish", "suggestedChange": "Trim adjectives", "priority": "low", "affectedSections": [1]}
    ]}"#;

    fn orchestrator(adapter: Arc<ScriptedAdapter>) -> ThinkingOrchestrator {
        ThinkingOrchestrator::new(
            Arc::new(LLM::from_adapter(adapter, "scripted")),
            AgentSettings::new("test-model"),
            None,
        )
    }

    fn scoring(score: u32) -> ScriptedAdapter {
        ScriptedAdapter::new().rule("Evaluate the", &format!(r#"{{"score": {}, "feedback": "ok"}}"#, score))
    }

    #[test]
    fn test_run_limits_apply_caps() {
        let premium = run_limits(&GenerationParams::new("t").with_quality(QualityLevel::Premium));
        assert_eq!(premium.max_iterations, 3);
        assert_eq!(premium.target_quality_score, 8.5);
        assert_eq!(premium.token_budget, 60_000);

        let standard = run_limits(&GenerationParams::new("t"));
        assert_eq!(standard.max_iterations, 1);
        assert_eq!(standard.target_quality_score, 6.0);

        let mut custom = GenerationParams::new("t");
        custom.max_iterations = Some(9);
        custom.target_quality_score = Some(9.5);
        let custom = run_limits(&custom);
        assert_eq!(custom.max_iterations, 3);
        assert_eq!(custom.target_quality_score, 8.5);
    }

    #[tokio::test]
    async fn test_end_to_end_standard_run() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Remote Work Productivity").with_length(5);

        let result = orchestrator(adapter.clone()).generate(&params).await.unwrap();

        assert_eq!(result.presentation.sections.len(), 5);
        assert_eq!(result.state.iteration, 1);
        assert_eq!(result.state.phase, ThinkingPhase::Complete);
        assert_eq!(result.state.stop_reason, Some(StopReason::MaxIterations));
        assert_eq!(adapter.count_matching("Create slide"), 5);
        assert_eq!(adapter.count_matching("Evaluate the CLARITY"), 1);
        assert_eq!(adapter.count_matching("Refine this slide"), 0);
        assert_eq!(adapter.count_matching("Propose web search queries"), 1);
        assert_eq!(result.state.tokens_used, adapter.requests().len() as u32 * 100);
        assert_eq!(result.reflection.overall_score, 5.0);
        assert_eq!(result.quality_report.overall_score, 50);
        assert!(!result.quality_report.passed);
        assert_eq!(result.presentation.metadata.category, "Business");
        assert!(result.state.ended_at.is_some());
        assert!(result.state.steps.iter().any(|s| s.phase == ThinkingPhase::Research));
    }

    #[tokio::test]
    async fn test_high_quality_refines_until_iteration_cap() {
        let adapter = Arc::new(
            scoring(6)
                .rule("List the strengths and weaknesses", WEAK_SYNTHESIS)
                .rule("Propose specific improvements", HOOK_FIX),
        );
        let params = GenerationParams::new("Team Rituals")
            .with_quality(QualityLevel::High)
            .without_research();

        let result = orchestrator(adapter.clone()).generate(&params).await.unwrap();

        assert_eq!(result.state.iteration, 3);
        assert_eq!(result.state.stop_reason, Some(StopReason::MaxIterations));
        // drafted once, critiqued every iteration
        assert_eq!(adapter.count_matching("Create slide"), 8);
        assert_eq!(adapter.count_matching("Evaluate the CLARITY"), 3);
        // only the high priority improvement is applied, once per refinement pass
        assert_eq!(adapter.count_matching("Refine this slide"), 2);
        assert_eq!(adapter.count_matching("Trim adjectives"), 0);
        assert_eq!(adapter.count_matching("Propose web search queries"), 0);
        assert!(result.state.steps.iter().any(|s| s.action == "reuse_presentation"));
        assert_eq!(result.quality_report.suggestions.len(), 2);
    }

    #[tokio::test]
    async fn test_stops_when_target_reached() {
        let adapter = Arc::new(scoring(9));
        let params = GenerationParams::new("Team Rituals").with_quality(QualityLevel::Premium);

        let result = orchestrator(adapter).generate(&params).await.unwrap();

        assert_eq!(result.state.iteration, 1);
        assert_eq!(result.state.stop_reason, Some(StopReason::TargetReached));
        assert!(result.quality_report.passed);
    }

    #[tokio::test]
    async fn test_stops_when_budget_exhausted() {
        let adapter = Arc::new(scoring(6).with_usage(20_000));
        let params = GenerationParams::new("Team Rituals")
            .with_quality(QualityLevel::High)
            .without_research();

        let result = orchestrator(adapter.clone()).generate(&params).await.unwrap();

        assert_eq!(result.state.iteration, 1);
        assert_eq!(result.state.stop_reason, Some(StopReason::BudgetExhausted));
        assert!(result.state.tokens_used >= 35_000);
        assert_eq!(adapter.count_matching("Refine this slide"), 0);
    }

    #[tokio::test]
    async fn test_raw_data_skips_research() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Quarterly Sales")
            .with_length(3)
            .with_raw_data("Q1 revenue 1.2M, Q2 revenue 1.5M");

        let result = orchestrator(adapter.clone()).generate(&params).await.unwrap();

        assert_eq!(adapter.count_matching("Propose web search queries"), 0);
        assert_eq!(adapter.count_matching("REFERENCE MATERIAL:\nQ1 revenue"), 3);
        assert!(result.state.steps.iter().all(|s| s.phase != ThinkingPhase::Research));
    }

    #[tokio::test]
    async fn test_research_can_be_disabled_globally() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Quarterly Sales").with_length(2);

        orchestrator(adapter.clone())
            .with_research(false)
            .generate(&params)
            .await
            .unwrap();

        assert_eq!(adapter.count_matching("Propose web search queries"), 0);
    }

    #[tokio::test]
    async fn test_quick_mode_skips_planning_and_research() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Quarterly Sales")
            .with_length(4)
            .with_quality(QualityLevel::High);

        let result = orchestrator(adapter.clone()).generate_quick(&params).await.unwrap();

        assert_eq!(adapter.count_matching("Create a detailed presentation plan"), 0);
        assert_eq!(adapter.count_matching("Propose web search queries"), 0);
        assert_eq!(adapter.count_matching("Evaluate the CLARITY"), 1);
        assert_eq!(result.presentation.sections.len(), 4);
        assert_eq!(result.plan, PresentationPlan::baseline(&params));
        assert_eq!(result.state.stop_reason, Some(StopReason::MaxIterations));
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_before_any_call() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let result = orchestrator(adapter.clone()).generate(&GenerationParams::new("  ")).await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert!(adapter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_planner_outage_fails_the_run() {
        let adapter = Arc::new(ScriptedAdapter::new().failing_on("Create a detailed presentation plan"));
        let result = orchestrator(adapter).generate(&GenerationParams::new("Tides")).await;
        assert!(matches!(result, Err(AppError::LLMApi(_))));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_at_phase_boundary() {
        let flag = CancellationFlag::new();
        let orchestrator = orchestrator(Arc::new(ScriptedAdapter::new())).with_cancellation(flag.clone());
        flag.cancel();

        let result = orchestrator.generate(&GenerationParams::new("Tides")).await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(orchestrator.cancellation_flag().is_cancelled());
    }

    async fn collect(mut rx: mpsc::Receiver<ThinkingEvent>) -> Vec<ThinkingEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn presentation_events(events: &[ThinkingEvent]) -> Vec<(&EnhancedPresentation, Option<&QualityReport>)> {
        events
            .iter()
            .filter_map(|e| match e {
                ThinkingEvent::Presentation { presentation, quality_report } => {
                    Some((presentation.as_ref(), quality_report.as_ref()))
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_streaming_drafts_critiques_once_and_refines_once() {
        let adapter = Arc::new(
            scoring(5)
                .rule("List the strengths and weaknesses", WEAK_SYNTHESIS)
                .rule("Propose specific improvements", HOOK_FIX)
                .rule("Refine this slide", r#"{"heading": "A Better Hook"}"#),
        );
        let params = GenerationParams::new("Tides").with_length(3).without_research();
        let (tx, rx) = mpsc::channel(256);

        let result = orchestrator(adapter.clone())
            .generate_streaming(&params, tx)
            .await
            .unwrap();
        let events = collect(rx).await;

        assert_eq!(result.state.iteration, 1);
        assert_eq!(result.state.stop_reason, Some(StopReason::MaxIterations));
        assert_eq!(adapter.count_matching("Evaluate the CLARITY"), 1);
        assert_eq!(adapter.count_matching("Refine this slide"), 1);

        // the draft, then the refined deck with the report
        let decks = presentation_events(&events);
        assert_eq!(decks.len(), 2);
        assert!(decks[0].1.is_none());
        assert_ne!(decks[0].0.sections[0].heading, "A Better Hook");
        assert_eq!(decks[1].0.sections[0].heading, "A Better Hook");
        assert_eq!(decks[1].1, Some(&result.quality_report));
        assert_eq!(result.presentation.sections[0].heading, "A Better Hook");

        assert!(matches!(
            events.first(),
            Some(ThinkingEvent::State { phase: ThinkingPhase::Planning, .. })
        ));
        assert!(matches!(events.last(), Some(ThinkingEvent::Presentation { .. })));
        let steps = events.iter().filter(|e| matches!(e, ThinkingEvent::Step(_))).count();
        assert_eq!(steps, result.state.steps.len());
        assert!(events.iter().any(|e| matches!(
            e,
            ThinkingEvent::State { phase: ThinkingPhase::Refinement, .. }
        )));
    }

    #[tokio::test]
    async fn test_streaming_skips_refinement_when_critic_is_satisfied() {
        let adapter = Arc::new(scoring(9));
        let params = GenerationParams::new("Tides")
            .with_length(2)
            .with_quality(QualityLevel::High)
            .without_research();
        let (tx, rx) = mpsc::channel(256);

        let result = orchestrator(adapter.clone())
            .generate_streaming(&params, tx)
            .await
            .unwrap();
        let events = collect(rx).await;

        assert_eq!(result.state.stop_reason, Some(StopReason::TargetReached));
        assert_eq!(adapter.count_matching("Evaluate the CLARITY"), 1);
        assert_eq!(adapter.count_matching("Refine this slide"), 0);
        assert!(events.iter().all(|e| !matches!(
            e,
            ThinkingEvent::State { phase: ThinkingPhase::Refinement, .. }
        )));
        let decks = presentation_events(&events);
        assert_eq!(decks.len(), 2);
        assert!(decks[1].1.is_some_and(|r| r.passed));
    }

    #[tokio::test]
    async fn test_closed_receiver_cancels_streaming_run() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let result = orchestrator(adapter.clone())
            .generate_streaming(&GenerationParams::new("Tides"), tx)
            .await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(adapter.requests().is_empty());
    }
}
