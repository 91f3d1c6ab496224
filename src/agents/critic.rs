//! Critic Agent
//!
//! Scores a draft on seven weighted criteria, one model call each, then asks
//! for a strengths/weaknesses synthesis and, when there are weaknesses,
//! concrete improvements tied to section indices.
//!
//! Scores the model returns are clamped to `[1, 10]`; a missing or
//! non-numeric score counts as 5 so one bad reply cannot sink or inflate the
//! overall score.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::{AgentSettings, Metered};
use crate::llm::structured::{lenient_f64, lenient_index_list, lenient_string, lenient_string_list};
use crate::llm::{parse_or_default, LLM};
use crate::models::{EnhancedPresentation, PresentationPlan};
use crate::types::{AppError, AppResult};
use crate::utils::text::{bullet_list, truncate_chars};

const CRITIC_SYSTEM: &str = "You are a demanding presentation coach. Judge honestly, justify every score briefly and respond with JSON only.";

pub const FALLBACK_SCORE: f64 = 5.0;
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

/// Criterion scores at or above this count as strengths
pub const STRENGTH_THRESHOLD: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Clarity,
    Relevance,
    Engagement,
    Structure,
    VisualAppeal,
    Completeness,
    AudienceAlignment,
}

impl Criterion {
    pub const ALL: [Criterion; 7] = [
        Criterion::Clarity,
        Criterion::Relevance,
        Criterion::Engagement,
        Criterion::Structure,
        Criterion::VisualAppeal,
        Criterion::Completeness,
        Criterion::AudienceAlignment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Clarity => "clarity",
            Criterion::Relevance => "relevance",
            Criterion::Engagement => "engagement",
            Criterion::Structure => "structure",
            Criterion::VisualAppeal => "visual appeal",
            Criterion::Completeness => "completeness",
            Criterion::AudienceAlignment => "audience alignment",
        }
    }

    /// Weight in percent; the seven weights sum to 100
    pub fn weight_percent(&self) -> u32 {
        match self {
            Criterion::VisualAppeal => 10,
            _ => 15,
        }
    }

    fn question(&self) -> &'static str {
        match self {
            Criterion::Clarity => "Is every slide easy to follow? Are headings specific and is the language plain and precise?",
            Criterion::Relevance => "Does every slide serve the main objective and matter to this audience?",
            Criterion::Engagement => "Would this hold attention? Consider the hook, stories, questions, variety and pacing.",
            Criterion::Structure => "Does the flow follow the planned narrative arc, with a real hook, a coherent middle and the planned conclusion?",
            Criterion::VisualAppeal => "Is the visual treatment varied, purposeful and consistent with the visual strategy?",
            Criterion::Completeness => "Are all key messages covered with enough depth, and does the slide count match the plan?",
            Criterion::AudienceAlignment => "Do depth, vocabulary and examples fit the audience's knowledge level and interests?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    pub score: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Unknown or missing tags read as medium
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_lowercase()).as_deref() {
            Some("high") | Some("critical") => Priority::High,
            Some("low") => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    pub area: String,
    pub current_state: String,
    pub suggested_change: String,
    pub priority: Priority,
    /// Zero-based section indices
    pub affected_sections: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionResult {
    pub clarity: CriterionScore,
    pub relevance: CriterionScore,
    pub engagement: CriterionScore,
    pub structure: CriterionScore,
    pub visual_appeal: CriterionScore,
    pub completeness: CriterionScore,
    pub audience_alignment: CriterionScore,
    pub overall_score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvements: Vec<Improvement>,
    pub should_refine: bool,
}

impl ReflectionResult {
    pub fn criterion(&self, criterion: Criterion) -> &CriterionScore {
        match criterion {
            Criterion::Clarity => &self.clarity,
            Criterion::Relevance => &self.relevance,
            Criterion::Engagement => &self.engagement,
            Criterion::Structure => &self.structure,
            Criterion::VisualAppeal => &self.visual_appeal,
            Criterion::Completeness => &self.completeness,
            Criterion::AudienceAlignment => &self.audience_alignment,
        }
    }

    /// Improvements worth a refinement pass (high and medium priority)
    pub fn actionable_improvements(&self) -> Vec<Improvement> {
        self.improvements
            .iter()
            .filter(|i| i.priority != Priority::Low)
            .cloned()
            .collect()
    }
}

/// Clamp a model score into range; absent scores count as the midpoint
pub fn clamp_score(raw: Option<f64>) -> f64 {
    raw.map(|s| s.clamp(MIN_SCORE, MAX_SCORE)).unwrap_or(FALLBACK_SCORE)
}

/// Weighted mean of the seven scores in [`Criterion::ALL`] order, one decimal
pub fn aggregate_score(scores: &[f64; 7]) -> f64 {
    let weighted: f64 = Criterion::ALL
        .iter()
        .zip(scores.iter())
        .map(|(criterion, score)| score * criterion.weight_percent() as f64)
        .sum();
    // weighted is score * 100; one decimal means rounding at score * 10
    (weighted / 10.0).round() / 10.0
}

pub fn should_refine(overall_score: f64, target: f64, improvements: &[Improvement]) -> bool {
    overall_score < target || improvements.iter().any(|i| i.priority == Priority::High)
}

/// Key messages found (case-insensitive) in any heading or block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMessageCoverage {
    pub covered: Vec<String>,
    pub missing: Vec<String>,
}

pub fn key_message_coverage(presentation: &EnhancedPresentation, key_messages: &[String]) -> KeyMessageCoverage {
    let corpus = presentation
        .sections
        .iter()
        .map(|s| s.searchable_text())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    let (covered, missing): (Vec<String>, Vec<String>) = key_messages
        .iter()
        .cloned()
        .partition(|message| corpus.contains(&message.to_lowercase()));
    KeyMessageCoverage { covered, missing }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCriterion {
    #[serde(deserialize_with = "lenient_f64")]
    score: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    feedback: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSynthesis {
    #[serde(deserialize_with = "lenient_string_list")]
    strengths: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    weaknesses: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImprovements {
    improvements: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawImprovement {
    #[serde(deserialize_with = "lenient_string")]
    area: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    current_state: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    suggested_change: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    priority: Option<String>,
    #[serde(deserialize_with = "lenient_index_list")]
    affected_sections: Vec<usize>,
}

impl From<RawImprovement> for Improvement {
    fn from(raw: RawImprovement) -> Self {
        Improvement {
            area: raw.area.unwrap_or_else(|| "General".to_string()),
            current_state: raw.current_state.unwrap_or_default(),
            suggested_change: raw.suggested_change.unwrap_or_default(),
            priority: Priority::from_tag(raw.priority.as_deref()),
            affected_sections: raw.affected_sections,
        }
    }
}

pub struct CriticAgent {
    llm: Arc<LLM>,
    settings: AgentSettings,
}

impl CriticAgent {
    pub fn new(llm: Arc<LLM>, settings: AgentSettings) -> Self {
        Self { llm, settings }
    }

    /// Full reflection pass over `presentation`. Gateway failures propagate.
    pub async fn evaluate(
        &self,
        presentation: &EnhancedPresentation,
        plan: &PresentationPlan,
        target: f64,
    ) -> AppResult<Metered<ReflectionResult>> {
        info!(
            title = %presentation.title,
            sections = presentation.sections.len(),
            target,
            "Evaluating presentation"
        );

        let mut tokens = 0u32;
        let overview = Self::presentation_overview(presentation);

        let mut scores = Vec::with_capacity(Criterion::ALL.len());
        for criterion in Criterion::ALL {
            let prompt = match criterion {
                Criterion::Clarity | Criterion::Relevance | Criterion::Engagement => {
                    Self::create_generic_prompt(criterion, &overview, plan)
                }
                Criterion::Structure => Self::create_structure_prompt(presentation, plan),
                Criterion::VisualAppeal => Self::create_visual_prompt(presentation, plan),
                Criterion::Completeness => Self::create_completeness_prompt(presentation, plan, &overview),
                Criterion::AudienceAlignment => Self::create_audience_prompt(presentation, plan),
            };
            let score = self.score_criterion(criterion, &prompt, &mut tokens).await?;
            debug!(criterion = criterion.name(), score = score.score, "Criterion scored");
            scores.push(score);
        }

        let numeric: Vec<f64> = scores.iter().map(|s| s.score).collect();
        let numeric: [f64; 7] = numeric
            .try_into()
            .map_err(|_| AppError::Internal("criterion count mismatch".to_string()))?;
        let overall_score = aggregate_score(&numeric);

        let [clarity, relevance, engagement, structure, visual_appeal, completeness, audience_alignment]: [CriterionScore; 7] =
            scores
                .try_into()
                .map_err(|_| AppError::Internal("criterion count mismatch".to_string()))?;

        let mut result = ReflectionResult {
            clarity,
            relevance,
            engagement,
            structure,
            visual_appeal,
            completeness,
            audience_alignment,
            overall_score,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            improvements: Vec::new(),
            should_refine: false,
        };

        let synthesis = self.synthesize(&result, &mut tokens).await?;
        result.strengths = synthesis.strengths;
        result.weaknesses = synthesis.weaknesses;

        if !result.weaknesses.is_empty() {
            result.improvements = self.propose_improvements(presentation, &result, &mut tokens).await?;
        }

        result.should_refine = should_refine(result.overall_score, target, &result.improvements);

        info!(
            overall_score = result.overall_score,
            weaknesses = result.weaknesses.len(),
            improvements = result.improvements.len(),
            should_refine = result.should_refine,
            tokens,
            "Reflection complete"
        );

        Ok(Metered::new(result, tokens))
    }

    async fn score_criterion(&self, criterion: Criterion, prompt: &str, tokens: &mut u32) -> AppResult<CriterionScore> {
        let options = self.settings.options(0.3, 512, CRITIC_SYSTEM);
        let completion = self.llm.complete(prompt, &options).await?;
        *tokens = tokens.saturating_add(completion.tokens_used);

        let raw = parse_or_default(&completion.text, RawCriterion::default());
        Ok(CriterionScore {
            score: clamp_score(raw.score),
            feedback: raw
                .feedback
                .unwrap_or_else(|| format!("Unable to evaluate {}", criterion.name())),
        })
    }

    async fn synthesize(&self, result: &ReflectionResult, tokens: &mut u32) -> AppResult<RawSynthesis> {
        let scored = Criterion::ALL
            .iter()
            .map(|c| {
                let s = result.criterion(*c);
                format!("- {}: {:.1}/10. {}", c.name(), s.score, s.feedback)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(r#"List the strengths and weaknesses of a presentation from its criterion scores.

SCORES:
{scored}

Overall: {overall:.1}/10

Criteria scoring {threshold:.0} or more are strengths; criteria below {threshold:.0} are weaknesses.
Phrase each item as one concrete sentence.

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "strengths": ["..."],
  "weaknesses": ["..."]
}}"#,
            scored = scored,
            overall = result.overall_score,
            threshold = STRENGTH_THRESHOLD,
        );

        let options = self.settings.options(0.3, 768, CRITIC_SYSTEM);
        let completion = self.llm.complete(&prompt, &options).await?;
        *tokens = tokens.saturating_add(completion.tokens_used);
        Ok(parse_or_default(&completion.text, RawSynthesis::default()))
    }

    async fn propose_improvements(
        &self,
        presentation: &EnhancedPresentation,
        result: &ReflectionResult,
        tokens: &mut u32,
    ) -> AppResult<Vec<Improvement>> {
        let slides = presentation
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| format!("[{}] {} ({})", i, s.heading, s.layout.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let low_scoring: Vec<String> = Criterion::ALL
            .iter()
            .filter_map(|c| {
                let s = result.criterion(*c);
                (s.score < STRENGTH_THRESHOLD).then(|| format!("- {}: {:.1}/10. {}", c.name(), s.score, s.feedback))
            })
            .collect();

        let prompt = format!(r#"Propose specific improvements that fix the weaknesses of this presentation.

SLIDES (zero-based index):
{slides}

WEAKNESSES:
{weaknesses}

LOW-SCORING CRITERIA:
{low_scoring}

For each improvement name the area, describe the current state, the exact change, a priority
(high, medium or low) and the indices of the slides it touches.

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "improvements": [
    {{
      "area": "engagement",
      "currentState": "...",
      "suggestedChange": "...",
      "priority": "high",
      "affectedSections": [0, 2]
    }}
  ]
}}"#,
            slides = slides,
            weaknesses = bullet_list(&result.weaknesses, "- none"),
            low_scoring = if low_scoring.is_empty() { "- none".to_string() } else { low_scoring.join("\n") },
        );

        let options = self.settings.options(0.4, 1024, CRITIC_SYSTEM);
        let completion = self.llm.complete(&prompt, &options).await?;
        *tokens = tokens.saturating_add(completion.tokens_used);

        let raw = parse_or_default(&completion.text, RawImprovements::default());
        Ok(raw
            .improvements
            .into_iter()
            .filter_map(|item| serde_json::from_value::<RawImprovement>(item).ok())
            .map(Improvement::from)
            .collect())
    }

    fn presentation_overview(presentation: &EnhancedPresentation) -> String {
        let mut output = format!("Title: {}\nSubtitle: {}\n", presentation.title, presentation.subtitle);
        for (i, section) in presentation.sections.iter().enumerate() {
            output.push_str(&format!("\nSlide {}: {} [{}]\n", i + 1, section.heading, section.layout.as_str()));
            for block in &section.blocks {
                output.push_str(&format!("  - {}\n", truncate_chars(&block.content.to_display_string(), 200)));
            }
        }
        output
    }

    fn output_format() -> &'static str {
        r#"OUTPUT FORMAT (respond with ONLY valid JSON):
{
  "score": 7,
  "feedback": "One or two sentences justifying the score"
}"#
    }

    fn create_generic_prompt(criterion: Criterion, overview: &str, plan: &PresentationPlan) -> String {
        format!(
            "Evaluate the {label} of this presentation on a scale from 1 to 10.\n\n{question}\n\n\
             Objective: {objective}\nAudience: {audience}\n\nPRESENTATION:\n{overview}\n{format}",
            label = criterion.name().to_uppercase(),
            question = criterion.question(),
            objective = plan.main_objective,
            audience = plan.target_audience.audience_type,
            overview = overview,
            format = Self::output_format(),
        )
    }

    fn create_structure_prompt(presentation: &EnhancedPresentation, plan: &PresentationPlan) -> String {
        let strategy = &plan.content_strategy;
        let structure = &plan.structure_plan;
        let flow = presentation
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {} [{}]", i + 1, s.heading, s.layout.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Evaluate the STRUCTURE of this presentation on a scale from 1 to 10.\n\n{question}\n\n\
             PLANNED STRUCTURE:\n- Narrative arc: {arc}\n- Hook: {hook}\n- Conclusion: {conclusion}\n\
             - Slide mix: {opening} opening, {content} content, {data} data, {closing} closing\n\
             - Transition points:\n{transitions}\n\nACTUAL FLOW:\n{flow}\n\n{format}",
            question = Criterion::Structure.question(),
            arc = strategy.narrative_arc,
            hook = strategy.hook_type,
            conclusion = strategy.conclusion_style,
            opening = structure.opening_slides,
            content = structure.content_slides,
            data = structure.data_slides,
            closing = structure.closing_slides,
            transitions = bullet_list(&structure.transition_points, "- none planned"),
            flow = flow,
            format = Self::output_format(),
        )
    }

    fn create_visual_prompt(presentation: &EnhancedPresentation, plan: &PresentationPlan) -> String {
        let total = presentation.sections.len();
        let mut layouts: Vec<&str> = presentation.sections.iter().map(|s| s.layout.as_str()).collect();
        layouts.sort_unstable();
        layouts.dedup();
        let with_images = presentation.sections.iter().filter(|s| s.suggested_image.is_some()).count();
        let with_notes = presentation.sections.iter().filter(|s| s.speaker_notes.is_some()).count();
        let charts = presentation
            .sections
            .iter()
            .flat_map(|s| s.blocks.iter())
            .filter(|b| b.chart_data.is_some())
            .count();
        let visual = &plan.visual_strategy;

        format!(
            "Evaluate the VISUAL APPEAL of this presentation on a scale from 1 to 10.\n\n{question}\n\n\
             VISUAL STRATEGY:\n- Color mood: {mood}\n- Image style: {image_style}\n- Chart preference: {charts_pref}\n\
             - Desired layout variety: {variety}\n\nOBSERVED:\n- Distinct layouts: {distinct} across {total} slides ({layouts})\n\
             - Slides with image suggestions: {with_images}/{total}\n- Slides with speaker notes: {with_notes}/{total}\n\
             - Chart blocks: {charts}\n\n{format}",
            question = Criterion::VisualAppeal.question(),
            mood = visual.color_mood,
            image_style = visual.image_style,
            charts_pref = visual.chart_preference,
            variety = visual.layout_variety.join(", "),
            distinct = layouts.len(),
            total = total,
            layouts = layouts.join(", "),
            with_images = with_images,
            with_notes = with_notes,
            charts = charts,
            format = Self::output_format(),
        )
    }

    fn create_completeness_prompt(
        presentation: &EnhancedPresentation,
        plan: &PresentationPlan,
        overview: &str,
    ) -> String {
        let coverage = key_message_coverage(presentation, &plan.key_messages);
        format!(
            "Evaluate the COMPLETENESS of this presentation on a scale from 1 to 10.\n\n{question}\n\n\
             Key messages covered ({covered_count} of {total_messages}):\n{covered}\n\
             Key messages missing:\n{missing}\n\
             Planned slides: {planned}, actual slides: {actual}\n\nPRESENTATION:\n{overview}\n{format}",
            question = Criterion::Completeness.question(),
            covered_count = coverage.covered.len(),
            total_messages = plan.key_messages.len(),
            covered = bullet_list(&coverage.covered, "- none"),
            missing = bullet_list(&coverage.missing, "- none"),
            planned = plan.estimated_slides,
            actual = presentation.sections.len(),
            overview = overview,
            format = Self::output_format(),
        )
    }

    fn create_audience_prompt(presentation: &EnhancedPresentation, plan: &PresentationPlan) -> String {
        let audience = &plan.target_audience;
        let flattened = presentation
            .sections
            .iter()
            .map(|s| {
                let blocks = s
                    .blocks
                    .iter()
                    .map(|b| truncate_chars(&b.content.to_display_string(), 100))
                    .collect::<Vec<_>>()
                    .join(" | ");
                format!("{}: {}", s.heading, blocks)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Evaluate the AUDIENCE ALIGNMENT of this presentation on a scale from 1 to 10.\n\n{question}\n\n\
             AUDIENCE:\n- Type: {kind}\n- Knowledge level: {level}\n- Interests: {interests}\n\
             - Pain points: {pains}\n- Expected outcome: {outcome}\n\nCONTENT:\n{flattened}\n\n{format}",
            question = Criterion::AudienceAlignment.question(),
            kind = audience.audience_type,
            level = audience.knowledge_level,
            interests = audience.interests.join(", "),
            pains = audience.pain_points.join(", "),
            outcome = audience.expected_outcome,
            flattened = flattened,
            format = Self::output_format(),
        )
    }
}
