//! Planning Agent
//!
//! One chain-of-thought call that turns the request into a
//! [`PresentationPlan`]. Whatever the model leaves out is filled from
//! [`PresentationPlan::baseline`], so a useless reply still yields a plan the
//! generator can work from.

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{AgentSettings, Metered};
use crate::llm::structured::{lenient_string, lenient_string_list, lenient_u32};
use crate::llm::{parse_or_default, LLM};
use crate::models::{
    AudienceProfile, ContentStrategy, GenerationParams, PresentationPlan, StructurePlan, VisualStrategy,
};
use crate::types::AppResult;

/// Bounds applied when the caller did not ask for a slide count
pub const MIN_PLANNED_SLIDES: u32 = 3;
pub const MAX_PLANNED_SLIDES: u32 = 20;

const PLANNER_SYSTEM: &str = "You are an expert presentation strategist. You think step by step about audience, narrative and evidence before committing to a plan. Respond with JSON only.";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPlan {
    #[serde(deserialize_with = "lenient_string")]
    main_objective: Option<String>,
    target_audience: RawAudience,
    content_strategy: RawContentStrategy,
    structure_plan: RawStructurePlan,
    visual_strategy: RawVisualStrategy,
    #[serde(deserialize_with = "lenient_u32")]
    estimated_slides: Option<u32>,
    #[serde(deserialize_with = "lenient_string_list")]
    key_messages: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    potential_challenges: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAudience {
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    audience_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    knowledge_level: Option<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    interests: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pain_points: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    expected_outcome: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawContentStrategy {
    #[serde(deserialize_with = "lenient_string")]
    narrative_arc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    hook_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    conclusion_style: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    data_usage: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    storytelling_approach: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawStructurePlan {
    #[serde(deserialize_with = "lenient_u32")]
    opening_slides: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    content_slides: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    data_slides: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    closing_slides: Option<u32>,
    #[serde(deserialize_with = "lenient_string_list")]
    transition_points: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawVisualStrategy {
    #[serde(deserialize_with = "lenient_string")]
    color_mood: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    image_style: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    chart_preference: Option<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    layout_variety: Vec<String>,
}

fn or_list(list: Vec<String>, base: Vec<String>) -> Vec<String> {
    if list.is_empty() {
        base
    } else {
        list
    }
}

impl RawPlan {
    /// Merge over the baseline and apply slide-count rules
    fn into_plan(self, params: &GenerationParams) -> PresentationPlan {
        let base = PresentationPlan::baseline(params);

        let estimated_slides = match params.length {
            Some(requested) => requested.max(1),
            None => self
                .estimated_slides
                .unwrap_or(base.estimated_slides)
                .clamp(MIN_PLANNED_SLIDES, MAX_PLANNED_SLIDES),
        };

        let mut key_messages: Vec<String> = self
            .key_messages
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if key_messages.is_empty() {
            key_messages = vec![params.topic.clone()];
        }

        let audience = self.target_audience;
        let strategy = self.content_strategy;
        let structure = self.structure_plan;
        let visual = self.visual_strategy;

        PresentationPlan {
            main_objective: self.main_objective.unwrap_or(base.main_objective),
            target_audience: AudienceProfile {
                audience_type: audience.audience_type.unwrap_or(base.target_audience.audience_type),
                knowledge_level: audience
                    .knowledge_level
                    .unwrap_or(base.target_audience.knowledge_level),
                interests: or_list(audience.interests, base.target_audience.interests),
                pain_points: or_list(audience.pain_points, base.target_audience.pain_points),
                expected_outcome: audience
                    .expected_outcome
                    .unwrap_or(base.target_audience.expected_outcome),
            },
            content_strategy: ContentStrategy {
                narrative_arc: strategy.narrative_arc.unwrap_or(base.content_strategy.narrative_arc),
                hook_type: strategy.hook_type.unwrap_or(base.content_strategy.hook_type),
                conclusion_style: strategy
                    .conclusion_style
                    .unwrap_or(base.content_strategy.conclusion_style),
                data_usage: strategy.data_usage.unwrap_or(base.content_strategy.data_usage),
                storytelling_approach: strategy
                    .storytelling_approach
                    .unwrap_or(base.content_strategy.storytelling_approach),
            },
            structure_plan: StructurePlan {
                opening_slides: structure.opening_slides.unwrap_or(base.structure_plan.opening_slides),
                content_slides: structure.content_slides.unwrap_or(base.structure_plan.content_slides),
                data_slides: structure.data_slides.unwrap_or(base.structure_plan.data_slides),
                closing_slides: structure.closing_slides.unwrap_or(base.structure_plan.closing_slides),
                transition_points: or_list(structure.transition_points, base.structure_plan.transition_points),
            },
            visual_strategy: VisualStrategy {
                color_mood: visual.color_mood.unwrap_or(base.visual_strategy.color_mood),
                image_style: visual.image_style.unwrap_or(base.visual_strategy.image_style),
                chart_preference: visual
                    .chart_preference
                    .unwrap_or(base.visual_strategy.chart_preference),
                layout_variety: or_list(visual.layout_variety, base.visual_strategy.layout_variety),
            },
            estimated_slides,
            key_messages,
            potential_challenges: or_list(self.potential_challenges, base.potential_challenges),
        }
    }
}

pub struct PlanningAgent {
    llm: Arc<LLM>,
    settings: AgentSettings,
}

impl PlanningAgent {
    pub fn new(llm: Arc<LLM>, settings: AgentSettings) -> Self {
        Self { llm, settings }
    }

    /// Produce the plan for one session. Gateway failures propagate;
    /// unusable replies fall back to the baseline plan.
    pub async fn create_plan(&self, params: &GenerationParams) -> AppResult<Metered<PresentationPlan>> {
        info!(topic = %params.topic, requested_slides = ?params.length, "Creating presentation plan");

        let prompt = Self::create_planning_prompt(params);
        let options = self.settings.options(0.7, 2048, PLANNER_SYSTEM);
        let completion = self.llm.complete(&prompt, &options).await?;

        let raw: RawPlan = parse_or_default(&completion.text, RawPlan::default());
        let plan = raw.into_plan(params);

        info!(
            slides = plan.estimated_slides,
            key_messages = plan.key_messages.len(),
            arc = %plan.content_strategy.narrative_arc,
            "Presentation plan ready"
        );

        Ok(Metered::new(plan, completion.tokens_used))
    }

    fn create_planning_prompt(params: &GenerationParams) -> String {
        let length = params
            .length
            .map(|n| n.to_string())
            .unwrap_or_else(|| "choose between 3 and 20".to_string());
        let brand = params.brand_guidelines.as_deref().unwrap_or("none");

        format!(r#"Create a detailed presentation plan for the request below.

Think step by step:
1. Who is the audience, what do they already know, what do they need?
2. Which narrative arc carries the topic best, and how should it open and close?
3. Which key messages must every listener remember?
4. Where does data help, and what should the slides look like?

REQUEST:
- Topic: {topic}
- Tone: {tone}
- Audience: {audience}
- Number of slides: {length}
- Content type: {content_type}
- Style: {style}
- Brand guidelines: {brand}

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "mainObjective": "What the presentation must achieve",
  "targetAudience": {{
    "type": "audience type",
    "knowledgeLevel": "beginner | intermediate | expert",
    "interests": ["..."],
    "painPoints": ["..."],
    "expectedOutcome": "..."
  }},
  "contentStrategy": {{
    "narrativeArc": "problem-solution | chronological | hero-journey | ...",
    "hookType": "question | statistic | story | quote | statement",
    "conclusionStyle": "call-to-action | summary | question | vision",
    "dataUsage": "light | moderate | heavy",
    "storytellingApproach": "..."
  }},
  "structurePlan": {{
    "openingSlides": 1,
    "contentSlides": 4,
    "dataSlides": 2,
    "closingSlides": 1,
    "transitionPoints": ["..."]
  }},
  "visualStrategy": {{
    "colorMood": "...",
    "imageStyle": "...",
    "chartPreference": "bar | line | pie | ...",
    "layoutVariety": ["hero", "two-column", "stats-grid"]
  }},
  "estimatedSlides": 8,
  "keyMessages": ["..."],
  "potentialChallenges": ["..."]
}}"#,
            topic = params.topic,
            tone = params.tone(),
            audience = params.audience(),
            length = length,
            content_type = params.content_type(),
            style = params.style(),
            brand = brand,
        )
    }
}
