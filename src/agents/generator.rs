//! Generator Agent
//!
//! Drafts the deck one slide at a time: a title call, then one call per
//! planned slide carrying its narrative role, suggested layout, key message
//! and the headings of the two slides before it. Refinement replaces single
//! sections in place, keeping their ids.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::critic::Improvement;
use super::narrative::{self, SlideRole};
use super::{AgentSettings, Metered};
use crate::llm::structured::{lenient_string, lenient_u32};
use crate::llm::{parse_or_default, LLM};
use crate::models::{
    BlockContent, BlockType, ChartData, EnhancedBlock, EnhancedPresentation, EnhancedSection, GenerationParams,
    PresentationPlan, SectionLayout, SuggestedImage, DEFAULT_SECTION_DURATION_SECS, DEFAULT_TRANSITION,
};
use crate::types::AppResult;
use crate::utils::text::truncate_chars;

/// Research or raw data passed into each slide prompt is cut to this size
pub const MAX_CONTEXT_CHARS: usize = 1500;

/// Longest a single slide may claim to run, in seconds
pub const MAX_SECTION_DURATION_SECS: u32 = 3600;

const GENERATOR_SYSTEM: &str = "You are a senior presentation writer and designer. Every slide has one job, concrete content and a layout that serves it. Respond with JSON only.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTitle {
    #[serde(deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    subtitle: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSection {
    #[serde(deserialize_with = "lenient_string")]
    heading: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    subheading: Option<String>,
    blocks: Vec<Value>,
    #[serde(deserialize_with = "lenient_string")]
    layout: Option<String>,
    suggested_image: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    speaker_notes: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    transition: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    duration: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImage {
    #[serde(deserialize_with = "lenient_string")]
    prompt: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    style: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    placement: Option<String>,
}

/// Zero means "not given"; anything longer than an hour is capped
fn section_duration(seconds: Option<u32>) -> Option<u32> {
    seconds.filter(|d| *d > 0).map(|d| d.min(MAX_SECTION_DURATION_SECS))
}

fn parse_image(value: Option<Value>, default_style: &str) -> Option<SuggestedImage> {
    let raw: RawImage = match value? {
        Value::String(prompt) => RawImage {
            prompt: Some(prompt),
            ..RawImage::default()
        },
        other => serde_json::from_value(other).ok()?,
    };
    Some(SuggestedImage {
        prompt: raw.prompt.filter(|p| !p.trim().is_empty())?,
        style: raw.style.unwrap_or_else(|| default_style.to_string()),
        placement: raw.placement.unwrap_or_else(|| "right".to_string()),
    })
}

/// One block from whatever shape the model produced; empty blocks are dropped
fn parse_block(value: Value) -> Option<EnhancedBlock> {
    let block = match value {
        Value::Object(map) => {
            let block_type = map
                .get("type")
                .and_then(Value::as_str)
                .and_then(BlockType::from_tag)
                .unwrap_or_default();
            let content = map.get("content").cloned().map(BlockContent::from).unwrap_or_default();
            let mut block = EnhancedBlock::new(block_type, content);
            block.formatting = map
                .get("formatting")
                .and_then(|f| serde_json::from_value(f.clone()).ok());
            block.chart_data = map
                .get("chartData")
                .or_else(|| map.get("chart_data"))
                .and_then(|c| serde_json::from_value::<ChartData>(c.clone()).ok());
            block
        }
        Value::String(text) => EnhancedBlock::new(BlockType::Paragraph, BlockContent::Text(text)),
        Value::Array(items) => EnhancedBlock::new(BlockType::BulletList, BlockContent::Items(items)),
        _ => return None,
    };

    if block.content.to_display_string().trim().is_empty() && block.chart_data.is_none() {
        return None;
    }
    Some(block)
}

/// Where the slide sits in the deck and what it is for
struct SlideBrief<'a> {
    index: usize,
    total: usize,
    role: SlideRole,
    key_message: &'a str,
    previous_headings: Vec<&'a str>,
}

pub struct GeneratorAgent {
    llm: Arc<LLM>,
    settings: AgentSettings,
}

impl GeneratorAgent {
    pub fn new(llm: Arc<LLM>, settings: AgentSettings) -> Self {
        Self { llm, settings }
    }

    /// Draft a full presentation; slides are produced strictly in order
    pub async fn generate_presentation(
        &self,
        plan: &PresentationPlan,
        params: &GenerationParams,
        research_context: Option<&str>,
    ) -> AppResult<Metered<EnhancedPresentation>> {
        let total = plan.estimated_slides.max(1) as usize;
        info!(topic = %params.topic, slides = total, "Generating presentation");

        let mut tokens = 0u32;
        let (title, subtitle) = self.generate_title(plan, params, &mut tokens).await?;
        let context = Self::prompt_context(params, research_context);

        let mut sections: Vec<EnhancedSection> = Vec::with_capacity(total);
        for index in 0..total {
            let role = narrative::classify_role(
                index,
                total,
                &plan.content_strategy.hook_type,
                &plan.content_strategy.conclusion_style,
            );
            let key_message = plan.key_message_for(index).unwrap_or(params.topic.as_str());
            let previous_headings = sections
                .iter()
                .rev()
                .take(2)
                .rev()
                .map(|s| s.heading.as_str())
                .collect();
            let brief = SlideBrief {
                index,
                total,
                role,
                key_message,
                previous_headings,
            };

            let prompt = Self::create_section_prompt(&brief, plan, params, context.as_deref());
            let options = self.settings.options(0.7, 1536, GENERATOR_SYSTEM);
            let completion = self.llm.complete(&prompt, &options).await?;
            tokens = tokens.saturating_add(completion.tokens_used);

            let raw = parse_or_default(&completion.text, RawSection::default());
            let section = Self::build_section(raw, &brief, plan, params);
            debug!(index, role = %role, layout = section.layout.as_str(), "Section generated");
            sections.push(section);
        }

        let metadata = narrative::build_metadata(plan, &params.topic, &sections);
        info!(sections = sections.len(), tokens, "Presentation draft complete");

        Ok(Metered::new(
            EnhancedPresentation {
                title,
                subtitle,
                sections,
                metadata,
            },
            tokens,
        ))
    }

    async fn generate_title(
        &self,
        plan: &PresentationPlan,
        params: &GenerationParams,
        tokens: &mut u32,
    ) -> AppResult<(String, String)> {
        let prompt = format!(r#"Create a compelling title and subtitle for a presentation.

Topic: {topic}
Objective: {objective}
Audience: {audience}
Tone: {tone}

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "title": "Short, memorable title",
  "subtitle": "One line that states the promise of the talk"
}}"#,
            topic = params.topic,
            objective = plan.main_objective,
            audience = plan.target_audience.audience_type,
            tone = params.tone(),
        );

        let options = self.settings.options(0.8, 256, GENERATOR_SYSTEM);
        let completion = self.llm.complete(&prompt, &options).await?;
        *tokens = tokens.saturating_add(completion.tokens_used);

        let raw = parse_or_default(&completion.text, RawTitle::default());
        Ok((
            raw.title.unwrap_or_else(|| params.topic.clone()),
            raw.subtitle.unwrap_or_default(),
        ))
    }

    /// Raw data wins over research; either is cut to [`MAX_CONTEXT_CHARS`]
    fn prompt_context(params: &GenerationParams, research_context: Option<&str>) -> Option<String> {
        params
            .raw_data
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or(research_context)
            .map(|c| truncate_chars(c, MAX_CONTEXT_CHARS))
    }

    fn build_section(
        raw: RawSection,
        brief: &SlideBrief<'_>,
        plan: &PresentationPlan,
        params: &GenerationParams,
    ) -> EnhancedSection {
        let mut blocks: Vec<EnhancedBlock> = raw.blocks.into_iter().filter_map(parse_block).collect();
        if blocks.is_empty() {
            blocks.push(EnhancedBlock::new(
                BlockType::Paragraph,
                BlockContent::text(brief.key_message),
            ));
        }

        let suggested_image = if params.include_images {
            parse_image(raw.suggested_image, &plan.visual_strategy.image_style)
        } else {
            None
        };

        EnhancedSection {
            id: uuid::Uuid::new_v4().to_string(),
            heading: raw
                .heading
                .unwrap_or_else(|| Self::fallback_heading(brief)),
            subheading: raw.subheading,
            blocks,
            layout: raw
                .layout
                .as_deref()
                .and_then(SectionLayout::from_tag)
                .unwrap_or_default(),
            suggested_image,
            speaker_notes: raw.speaker_notes,
            transition: raw.transition.unwrap_or_else(|| DEFAULT_TRANSITION.to_string()),
            duration: section_duration(raw.duration).unwrap_or(DEFAULT_SECTION_DURATION_SECS),
        }
    }

    fn fallback_heading(brief: &SlideBrief<'_>) -> String {
        if brief.index == 0 {
            brief.key_message.to_string()
        } else {
            format!("{} {}", brief.key_message, brief.index + 1)
        }
    }

    fn create_section_prompt(
        brief: &SlideBrief<'_>,
        plan: &PresentationPlan,
        params: &GenerationParams,
        context: Option<&str>,
    ) -> String {
        let audience = &plan.target_audience;
        let previous = if brief.previous_headings.is_empty() {
            "none (this is the opening slide)".to_string()
        } else {
            brief.previous_headings.join(" → ")
        };
        let images = if params.include_images {
            "Include a suggestedImage with a detailed prompt."
        } else {
            "Do not include a suggestedImage."
        };

        format!(r#"Create slide {number} of {total} for a presentation about "{topic}".

SLIDE ROLE: {role} ({purpose})
KEY MESSAGE: {key_message}
PREVIOUS SLIDES: {previous}
SUGGESTED LAYOUT: {layout}

AUDIENCE: {audience_type}, {knowledge} level. Interests: {interests}. Pain points: {pains}.
NARRATIVE ARC: {arc}
TONE: {tone}
STYLE: {style}
BRAND GUIDELINES: {brand}

REFERENCE MATERIAL:
{context}

Block types: heading, paragraph, bullet-list, chart, quote, statistic, image, callout.
Layouts: title-content, hero, two-column, stats-grid, chart-focus, quote-highlight, image-focus, timeline, comparison, bullet-list.
{images}

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "heading": "Slide heading",
  "subheading": "Optional subheading",
  "blocks": [
    {{"type": "paragraph", "content": "Text"}},
    {{"type": "bullet-list", "content": ["Point one", "Point two"]}},
    {{"type": "chart", "content": "Chart caption", "chartData": {{"chartType": "bar", "labels": ["A", "B"], "datasets": [{{"label": "Series", "data": [1, 2]}}]}}}}
  ],
  "layout": "{layout}",
  "suggestedImage": {{"prompt": "...", "style": "...", "placement": "right"}},
  "speakerNotes": "What the presenter says",
  "transition": "fade",
  "duration": 60
}}"#,
            number = brief.index + 1,
            total = brief.total,
            topic = params.topic,
            role = brief.role,
            purpose = brief.role.purpose(),
            key_message = brief.key_message,
            previous = previous,
            layout = brief.role.suggested_layout().as_str(),
            audience_type = audience.audience_type,
            knowledge = audience.knowledge_level,
            interests = audience.interests.join(", "),
            pains = audience.pain_points.join(", "),
            arc = plan.content_strategy.narrative_arc,
            tone = params.tone(),
            style = params.style(),
            brand = params.brand_guidelines.as_deref().unwrap_or("none"),
            context = context.unwrap_or("none"),
            images = images,
        )
    }

    /// Apply improvements section by section, highest priority first.
    ///
    /// Out-of-range section indices are skipped and an unusable reply keeps
    /// the section as it was. Returns the tokens spent.
    pub async fn apply_refinements(
        &self,
        presentation: &mut EnhancedPresentation,
        improvements: &[Improvement],
        params: &GenerationParams,
    ) -> AppResult<u32> {
        let mut ordered: Vec<&Improvement> = improvements.iter().collect();
        ordered.sort_by_key(|i| i.priority);

        info!(improvements = ordered.len(), "Applying refinements");

        let mut tokens = 0u32;
        let mut refined = 0usize;
        for improvement in ordered {
            for &index in &improvement.affected_sections {
                let Some(current) = presentation.sections.get(index) else {
                    warn!(index, sections = presentation.sections.len(), "Improvement targets a missing section, skipping");
                    continue;
                };

                let prompt = Self::create_refinement_prompt(current, improvement, params);
                let options = self.settings.options(0.6, 1536, GENERATOR_SYSTEM);
                let completion = self.llm.complete(&prompt, &options).await?;
                tokens = tokens.saturating_add(completion.tokens_used);

                match parse_or_default::<Option<RawSection>>(&completion.text, None) {
                    Some(raw) => {
                        let updated = Self::merge_section(current, raw, params);
                        presentation.sections[index] = updated;
                        refined += 1;
                    }
                    None => warn!(index, area = %improvement.area, "Refinement reply unusable, keeping section"),
                }
            }
        }

        if refined > 0 {
            presentation.metadata.estimated_duration = narrative::estimated_minutes(&presentation.sections);
        }
        info!(refined, tokens, "Refinements applied");
        Ok(tokens)
    }

    /// Replace a section with the model's revision, keeping its id and any
    /// field the revision left out
    fn merge_section(current: &EnhancedSection, raw: RawSection, params: &GenerationParams) -> EnhancedSection {
        let blocks: Vec<EnhancedBlock> = raw.blocks.into_iter().filter_map(parse_block).collect();
        let style = current
            .suggested_image
            .as_ref()
            .map(|i| i.style.clone())
            .unwrap_or_else(|| params.style().to_string());

        EnhancedSection {
            id: current.id.clone(),
            heading: raw.heading.unwrap_or_else(|| current.heading.clone()),
            subheading: raw.subheading.or_else(|| current.subheading.clone()),
            blocks: if blocks.is_empty() { current.blocks.clone() } else { blocks },
            layout: raw
                .layout
                .as_deref()
                .and_then(SectionLayout::from_tag)
                .unwrap_or(current.layout),
            suggested_image: if params.include_images {
                parse_image(raw.suggested_image, &style).or_else(|| current.suggested_image.clone())
            } else {
                None
            },
            speaker_notes: raw.speaker_notes.or_else(|| current.speaker_notes.clone()),
            transition: raw.transition.unwrap_or_else(|| current.transition.clone()),
            duration: section_duration(raw.duration).unwrap_or(current.duration),
        }
    }

    fn create_refinement_prompt(section: &EnhancedSection, improvement: &Improvement, params: &GenerationParams) -> String {
        let current = serde_json::to_string_pretty(section).unwrap_or_else(|_| section.heading.clone());
        let change = serde_json::json!({
            "area": improvement.area,
            "currentState": improvement.current_state,
            "suggestedChange": improvement.suggested_change,
        });

        format!(r#"Refine this slide of a presentation about "{topic}" by applying the requested change.
Keep everything that already works; change only what the improvement asks for.

CURRENT SLIDE:
{current}

IMPROVEMENT:
{change}

TONE: {tone}

Respond with ONLY the revised slide as valid JSON with the same fields as the current slide
(heading, subheading, blocks, layout, suggestedImage, speakerNotes, transition, duration)."#,
            topic = params.topic,
            current = current,
            change = change,
            tone = params.tone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::critic::Priority;
    use crate::llm::testing::ScriptedAdapter;
    use crate::types::AppError;
    use serde_json::json;

    fn agent(adapter: Arc<ScriptedAdapter>) -> GeneratorAgent {
        GeneratorAgent::new(
            Arc::new(LLM::from_adapter(adapter, "scripted")),
            AgentSettings::new("m"),
        )
    }

    fn improvement(priority: Priority, sections: Vec<usize>, change: &str) -> Improvement {
        Improvement {
            area: "engagement".to_string(),
            current_state: "flat".to_string(),
            suggested_change: change.to_string(),
            priority,
            affected_sections: sections,
        }
    }

    async fn draft(adapter: Arc<ScriptedAdapter>, params: &GenerationParams) -> EnhancedPresentation {
        let plan = PresentationPlan::baseline(params);
        agent(adapter)
            .generate_presentation(&plan, params, None)
            .await
            .unwrap()
            .value
    }

    #[test]
    fn test_parse_block_shapes() {
        let block = parse_block(json!({"type": "stat", "content": {"text": "58%"}})).unwrap();
        assert_eq!(block.block_type, BlockType::Statistic);
        assert_eq!(block.content, BlockContent::Text("58%".to_string()));

        let unknown = parse_block(json!({"type": "marquee", "content": "Hi"})).unwrap();
        assert_eq!(unknown.block_type, BlockType::Paragraph);

        let chart = parse_block(json!({
            "type": "chart",
            "chartData": {"chartType": "bar", "labels": ["a"], "datasets": [{"label": "s", "data": [1.0]}]}
        }))
        .unwrap();
        assert_eq!(chart.chart_data.unwrap().labels, vec!["a".to_string()]);

        assert!(parse_block(json!({"type": "paragraph", "content": ""})).is_none());
        assert!(parse_block(json!(42)).is_none());
        assert_eq!(parse_block(json!(["x", "y"])).unwrap().block_type, BlockType::BulletList);
    }

    #[tokio::test]
    async fn test_generates_one_section_per_planned_slide() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .rule("compelling title", r#"{"title": "Work From Anywhere", "subtitle": "What the data says"}"#)
                .rule(
                    "Create slide 2 of 4",
                    r#"{"heading": "The Commute Problem", "layout": "two_column",
                        "blocks": [{"type": "bullets", "content": ["2 hours a day", "Burnout"]}],
                        "suggestedImage": {"prompt": "Crowded train"}, "duration": "90"}"#,
                ),
        );
        let params = GenerationParams::new("Remote Work").with_length(4);

        let presentation = draft(adapter.clone(), &params).await;

        assert_eq!(presentation.title, "Work From Anywhere");
        assert_eq!(presentation.sections.len(), 4);
        let second = &presentation.sections[1];
        assert_eq!(second.heading, "The Commute Problem");
        assert_eq!(second.layout, SectionLayout::TwoColumn);
        assert_eq!(second.blocks[0].block_type, BlockType::BulletList);
        assert_eq!(second.duration, 90);
        // images were not requested
        assert!(second.suggested_image.is_none());

        // defaults for slides the model answered with nothing usable
        let third = &presentation.sections[2];
        assert_eq!(third.layout, SectionLayout::TitleContent);
        assert_eq!(third.duration, DEFAULT_SECTION_DURATION_SECS);
        assert_eq!(third.transition, DEFAULT_TRANSITION);
        assert_eq!(third.blocks[0].content.to_display_string(), "Remote Work");

        // roles drive the suggested layout in the prompt
        let prompts = adapter.requests();
        let first_slide = &prompts[1].messages[0].content;
        assert!(first_slide.contains("SLIDE ROLE: hook-question"));
        assert!(first_slide.contains("SUGGESTED LAYOUT: hero"));
        let third_slide = &prompts[3].messages[0].content;
        assert!(third_slide.contains("PREVIOUS SLIDES: Remote Work → The Commute Problem"));

        assert_eq!(presentation.metadata.estimated_duration, 5);
        assert_eq!(presentation.metadata.category, "Business");

        let ids: std::collections::HashSet<&str> = presentation.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_oversized_durations_are_capped() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .rule("Create slide", r#"{"heading": "H", "duration": 4000000000}"#)
                .rule("Refine this slide", r#"{"duration": 4294967295}"#),
        );
        let params = GenerationParams::new("Tides").with_length(2);

        let mut presentation = draft(adapter.clone(), &params).await;

        assert!(presentation
            .sections
            .iter()
            .all(|s| s.duration == MAX_SECTION_DURATION_SECS));
        assert_eq!(presentation.metadata.estimated_duration, 120);

        agent(adapter)
            .apply_refinements(
                &mut presentation,
                &[improvement(Priority::High, vec![0], "Make it longer")],
                &params,
            )
            .await
            .unwrap();

        assert_eq!(presentation.sections[0].duration, MAX_SECTION_DURATION_SECS);
        assert_eq!(presentation.metadata.estimated_duration, 120);
    }

    #[tokio::test]
    async fn test_images_kept_when_requested() {
        let adapter = Arc::new(ScriptedAdapter::new().rule(
            "Create slide",
            r#"{"heading": "H", "suggestedImage": "A sunrise over a city"}"#,
        ));
        let mut params = GenerationParams::new("Cities").with_length(1);
        params.include_images = true;

        let presentation = draft(adapter, &params).await;

        let image = presentation.sections[0].suggested_image.as_ref().unwrap();
        assert_eq!(image.prompt, "A sunrise over a city");
        assert_eq!(image.style, "photographic");
    }

    #[tokio::test]
    async fn test_research_context_is_truncated() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Oceans").with_length(1);
        let plan = PresentationPlan::baseline(&params);
        let long = "x".repeat(5000);

        agent(adapter.clone())
            .generate_presentation(&plan, &params, Some(&long))
            .await
            .unwrap();

        let prompt = &adapter.requests()[1].messages[0].content;
        assert!(prompt.contains(&format!("{}...", "x".repeat(MAX_CONTEXT_CHARS))));
        assert!(!prompt.contains(&"x".repeat(MAX_CONTEXT_CHARS + 1)));
    }

    #[tokio::test]
    async fn test_empty_affected_sections_is_noop() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Rivers").with_length(3);
        let mut presentation = draft(adapter.clone(), &params).await;
        let before = serde_json::to_vec(&presentation).unwrap();
        let calls_before = adapter.requests().len();

        let tokens = agent(adapter.clone())
            .apply_refinements(&mut presentation, &[improvement(Priority::High, vec![], "anything")], &params)
            .await
            .unwrap();

        assert_eq!(tokens, 0);
        assert_eq!(serde_json::to_vec(&presentation).unwrap(), before);
        assert_eq!(adapter.requests().len(), calls_before);
    }

    #[tokio::test]
    async fn test_refinement_replaces_in_place_and_skips_out_of_range() {
        let adapter = Arc::new(ScriptedAdapter::new().rule(
            "Refine this slide",
            r#"{"heading": "Sharper Heading", "blocks": [{"type": "quote", "content": "Less is more"}]}"#,
        ));
        let params = GenerationParams::new("Rivers").with_length(3);
        let mut presentation = draft(adapter.clone(), &params).await;
        let original = presentation.sections[1].clone();

        let tokens = agent(adapter.clone())
            .apply_refinements(
                &mut presentation,
                &[improvement(Priority::Medium, vec![1, 7], "Add a quote")],
                &params,
            )
            .await
            .unwrap();

        assert_eq!(tokens, 100);
        let refined = &presentation.sections[1];
        assert_eq!(refined.id, original.id);
        assert_eq!(refined.heading, "Sharper Heading");
        assert_eq!(refined.blocks[0].block_type, BlockType::Quote);
        assert_eq!(refined.layout, original.layout);
        assert_eq!(refined.duration, original.duration);
        assert_eq!(presentation.sections.len(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_refinement_keeps_section() {
        let adapter = Arc::new(ScriptedAdapter::new().rule("Refine this slide", "Sorry, I cannot help."));
        let params = GenerationParams::new("Rivers").with_length(2);
        let mut presentation = draft(adapter.clone(), &params).await;
        let before = presentation.clone();

        agent(adapter)
            .apply_refinements(&mut presentation, &[improvement(Priority::Low, vec![0], "x")], &params)
            .await
            .unwrap();

        assert_eq!(presentation, before);
    }

    #[tokio::test]
    async fn test_refinements_run_highest_priority_first() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let params = GenerationParams::new("Rivers").with_length(2);
        let mut presentation = draft(adapter.clone(), &params).await;
        let offset = adapter.requests().len();

        agent(adapter.clone())
            .apply_refinements(
                &mut presentation,
                &[
                    improvement(Priority::Low, vec![0], "LOW-CHANGE"),
                    improvement(Priority::High, vec![1], "HIGH-CHANGE"),
                    improvement(Priority::Medium, vec![0], "MEDIUM-CHANGE"),
                ],
                &params,
            )
            .await
            .unwrap();

        let order: Vec<String> = adapter.requests()[offset..]
            .iter()
            .map(|r| r.messages[0].content.clone())
            .collect();
        assert!(order[0].contains("HIGH-CHANGE"));
        assert!(order[1].contains("MEDIUM-CHANGE"));
        assert!(order[2].contains("LOW-CHANGE"));
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let adapter = Arc::new(ScriptedAdapter::new().failing_on("Create slide 2"));
        let params = GenerationParams::new("Rivers").with_length(3);
        let plan = PresentationPlan::baseline(&params);

        let result = agent(adapter).generate_presentation(&plan, &params, None).await;
        assert!(matches!(result, Err(AppError::LLMApi(_))));
    }
}
