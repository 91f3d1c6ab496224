// Core presentation models shared by the agents and the thinking loop

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::types::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Generation parameters
// ---------------------------------------------------------------------------

/// Requested quality tier. Selects iteration cap, target score and token budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    #[default]
    Standard,
    High,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySettings {
    pub max_iterations: u32,
    pub target_score: f64,
    pub token_budget: u32,
}

impl QualityLevel {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "standard" => Some(QualityLevel::Standard),
            "high" => Some(QualityLevel::High),
            "premium" => Some(QualityLevel::Premium),
            _ => None,
        }
    }

    /// Nominal settings before the orchestrator applies its hard caps
    pub fn settings(&self) -> QualitySettings {
        match self {
            QualityLevel::Standard => QualitySettings {
                max_iterations: 1,
                target_score: 6.0,
                token_budget: 15_000,
            },
            QualityLevel::High => QualitySettings {
                max_iterations: 3,
                target_score: 7.5,
                token_budget: 35_000,
            },
            QualityLevel::Premium => QualitySettings {
                max_iterations: 5,
                target_score: 9.0,
                token_budget: 60_000,
            },
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityLevel::Standard => write!(f, "standard"),
            QualityLevel::High => write!(f, "high"),
            QualityLevel::Premium => write!(f, "premium"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Input record for one generation run
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[validate(length(min = 1, max = 500, message = "topic must be between 1 and 500 characters"))]
    pub topic: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// Requested slide count
    #[serde(default)]
    #[validate(range(min = 1, max = 30))]
    pub length: Option<u32>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub quality_level: QualityLevel,
    #[serde(default)]
    pub raw_data: Option<String>,
    #[serde(default)]
    pub brand_guidelines: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10))]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 1.0, max = 10.0))]
    pub target_quality_score: Option<f64>,
    #[serde(default = "default_true")]
    pub enable_research: bool,
}

impl GenerationParams {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            tone: None,
            audience: None,
            length: None,
            content_type: None,
            style: None,
            include_images: false,
            quality_level: QualityLevel::Standard,
            raw_data: None,
            brand_guidelines: None,
            max_iterations: None,
            target_quality_score: None,
            enable_research: true,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_quality(mut self, level: QualityLevel) -> Self {
        self.quality_level = level;
        self
    }

    pub fn with_raw_data(mut self, data: impl Into<String>) -> Self {
        self.raw_data = Some(data.into());
        self
    }

    pub fn without_research(mut self) -> Self {
        self.enable_research = false;
        self
    }

    /// Validate field constraints and reject blank topics
    pub fn validated(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        if self.topic.trim().is_empty() {
            return Err(AppError::InvalidRequest("topic must not be blank".to_string()));
        }
        Ok(())
    }

    pub fn tone(&self) -> &str {
        self.tone.as_deref().unwrap_or("professional")
    }

    pub fn audience(&self) -> &str {
        self.audience.as_deref().unwrap_or("general audience")
    }

    pub fn style(&self) -> &str {
        self.style.as_deref().unwrap_or("modern")
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("presentation")
    }
}

// ---------------------------------------------------------------------------
// Presentation plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceProfile {
    #[serde(rename = "type")]
    pub audience_type: String,
    pub knowledge_level: String,
    pub interests: Vec<String>,
    pub pain_points: Vec<String>,
    pub expected_outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStrategy {
    pub narrative_arc: String,
    pub hook_type: String,
    pub conclusion_style: String,
    pub data_usage: String,
    pub storytelling_approach: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructurePlan {
    pub opening_slides: u32,
    pub content_slides: u32,
    pub data_slides: u32,
    pub closing_slides: u32,
    pub transition_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualStrategy {
    pub color_mood: String,
    pub image_style: String,
    pub chart_preference: String,
    pub layout_variety: Vec<String>,
}

/// Output of the planning phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationPlan {
    pub main_objective: String,
    pub target_audience: AudienceProfile,
    pub content_strategy: ContentStrategy,
    pub structure_plan: StructurePlan,
    pub visual_strategy: VisualStrategy,
    pub estimated_slides: u32,
    pub key_messages: Vec<String>,
    pub potential_challenges: Vec<String>,
}

pub const DEFAULT_SLIDE_COUNT: u32 = 8;

impl PresentationPlan {
    /// Minimal plan derived only from the request. Used as the planner's
    /// parse fallback and as the quick-mode plan.
    pub fn baseline(params: &GenerationParams) -> Self {
        let slides = params.length.unwrap_or(DEFAULT_SLIDE_COUNT).max(1);
        let data_slides = slides / 4;
        let closing_slides = if slides > 1 { 1 } else { 0 };
        let content_slides = slides.saturating_sub(1 + closing_slides + data_slides);

        Self {
            main_objective: format!(
                "Deliver a clear and engaging {} about {}",
                params.content_type(),
                params.topic
            ),
            target_audience: AudienceProfile {
                audience_type: params.audience().to_string(),
                knowledge_level: "intermediate".to_string(),
                interests: vec![params.topic.clone()],
                pain_points: Vec::new(),
                expected_outcome: format!("Understand the essentials of {}", params.topic),
            },
            content_strategy: ContentStrategy {
                narrative_arc: "problem-solution".to_string(),
                hook_type: "question".to_string(),
                conclusion_style: "call-to-action".to_string(),
                data_usage: "moderate".to_string(),
                storytelling_approach: "informative".to_string(),
            },
            structure_plan: StructurePlan {
                opening_slides: 1,
                content_slides,
                data_slides,
                closing_slides,
                transition_points: Vec::new(),
            },
            visual_strategy: VisualStrategy {
                color_mood: "professional".to_string(),
                image_style: "photographic".to_string(),
                chart_preference: "bar".to_string(),
                layout_variety: vec![
                    SectionLayout::TitleContent.as_str().to_string(),
                    SectionLayout::TwoColumn.as_str().to_string(),
                ],
            },
            estimated_slides: slides,
            key_messages: vec![params.topic.clone()],
            potential_challenges: Vec::new(),
        }
    }

    /// Key message for a slide position, cycling through the list
    pub fn key_message_for(&self, index: usize) -> Option<&str> {
        if self.key_messages.is_empty() {
            return None;
        }
        Some(self.key_messages[index % self.key_messages.len()].as_str())
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Named slide layouts understood by the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionLayout {
    #[default]
    TitleContent,
    Hero,
    TwoColumn,
    StatsGrid,
    ChartFocus,
    QuoteHighlight,
    ImageFocus,
    Timeline,
    Comparison,
    BulletList,
}

impl SectionLayout {
    pub const ALL: [SectionLayout; 10] = [
        SectionLayout::TitleContent,
        SectionLayout::Hero,
        SectionLayout::TwoColumn,
        SectionLayout::StatsGrid,
        SectionLayout::ChartFocus,
        SectionLayout::QuoteHighlight,
        SectionLayout::ImageFocus,
        SectionLayout::Timeline,
        SectionLayout::Comparison,
        SectionLayout::BulletList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLayout::TitleContent => "title-content",
            SectionLayout::Hero => "hero",
            SectionLayout::TwoColumn => "two-column",
            SectionLayout::StatsGrid => "stats-grid",
            SectionLayout::ChartFocus => "chart-focus",
            SectionLayout::QuoteHighlight => "quote-highlight",
            SectionLayout::ImageFocus => "image-focus",
            SectionLayout::Timeline => "timeline",
            SectionLayout::Comparison => "comparison",
            SectionLayout::BulletList => "bullet-list",
        }
    }

    /// Parse a layout tag as the model tends to write it
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_lowercase().replace(|c: char| c == '_' || c == ' ', "-");
        Self::ALL.into_iter().find(|layout| layout.as_str() == normalized)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Heading,
    #[default]
    Paragraph,
    BulletList,
    Chart,
    Quote,
    Statistic,
    Image,
    Callout,
}

impl BlockType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().replace(|c: char| c == '_' || c == ' ', "-").as_str() {
            "heading" | "title" | "subheading" => Some(BlockType::Heading),
            "paragraph" | "text" | "body" => Some(BlockType::Paragraph),
            "bullet-list" | "bullets" | "list" | "bullet" => Some(BlockType::BulletList),
            "chart" | "graph" => Some(BlockType::Chart),
            "quote" => Some(BlockType::Quote),
            "statistic" | "stat" | "stats" | "metric" => Some(BlockType::Statistic),
            "image" => Some(BlockType::Image),
            "callout" | "highlight" => Some(BlockType::Callout),
            _ => None,
        }
    }
}

/// Block payload. The model may send a string, a list, or one of several
/// object shapes; everything is folded into this closed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum BlockContent {
    Text(String),
    Items(Vec<Value>),
    Url(String),
    Alt(String),
    Raw(Value),
}

const UNSERIALIZABLE_PLACEHOLDER: &str = "[unserializable object]";

impl BlockContent {
    pub fn text(s: impl Into<String>) -> Self {
        BlockContent::Text(s.into())
    }

    /// Render the content as a single display string. Total by construction.
    pub fn to_display_string(&self) -> String {
        match self {
            BlockContent::Text(text) => text.clone(),
            BlockContent::Url(url) => url.clone(),
            BlockContent::Alt(alt) => alt.clone(),
            BlockContent::Items(items) => items
                .iter()
                .map(|item| BlockContent::from(item.clone()).to_display_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            BlockContent::Raw(value) => serde_json::to_string(value)
                .unwrap_or_else(|_| UNSERIALIZABLE_PLACEHOLDER.to_string()),
        }
    }
}

impl Default for BlockContent {
    fn default() -> Self {
        BlockContent::Text(String::new())
    }
}

impl From<Value> for BlockContent {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => BlockContent::Text(String::new()),
            Value::String(s) => BlockContent::Text(s),
            Value::Bool(b) => BlockContent::Text(b.to_string()),
            Value::Number(n) => BlockContent::Text(n.to_string()),
            Value::Array(items) => BlockContent::Items(items),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    BlockContent::Text(text.clone())
                } else if let Some(Value::Array(items)) = map.get("items") {
                    BlockContent::Items(items.clone())
                } else if let Some(Value::String(url)) = map.get("url") {
                    BlockContent::Url(url.clone())
                } else if let Some(Value::String(alt)) = map.get("alt") {
                    BlockContent::Alt(alt.clone())
                } else {
                    BlockContent::Raw(Value::Object(map))
                }
            }
        }
    }
}

impl From<BlockContent> for Value {
    fn from(content: BlockContent) -> Self {
        match content {
            BlockContent::Text(text) => Value::String(text),
            BlockContent::Items(items) => Value::Array(items),
            BlockContent::Url(url) => serde_json::json!({ "url": url }),
            BlockContent::Alt(alt) => serde_json::json!({ "alt": alt }),
            BlockContent::Raw(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockFormatting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub chart_type: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: BlockContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatting: Option<BlockFormatting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartData>,
}

impl EnhancedBlock {
    pub fn new(block_type: BlockType, content: BlockContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            block_type,
            content,
            formatting: None,
            chart_data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedImage {
    pub prompt: String,
    pub style: String,
    pub placement: String,
}

pub const DEFAULT_SECTION_DURATION_SECS: u32 = 60;
pub const DEFAULT_TRANSITION: &str = "fade";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSection {
    pub id: String,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subheading: Option<String>,
    pub blocks: Vec<EnhancedBlock>,
    pub layout: SectionLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_image: Option<SuggestedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_notes: Option<String>,
    pub transition: String,
    /// Seconds
    pub duration: u32,
}

impl EnhancedSection {
    /// Heading plus every block rendered as display text
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![self.heading.clone()];
        if let Some(sub) = &self.subheading {
            parts.push(sub.clone());
        }
        parts.extend(self.blocks.iter().map(|b| b.content.to_display_string()));
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationMetadata {
    /// Minutes
    pub estimated_duration: u32,
    pub keywords: Vec<String>,
    pub summary: String,
    pub difficulty: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedPresentation {
    pub title: String,
    pub subtitle: String,
    pub sections: Vec<EnhancedSection>,
    pub metadata: PresentationMetadata,
}
