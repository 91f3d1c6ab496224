// Narrative helpers: slide roles, layout table and deck metadata.
// Everything here is pure so the generator and the critic agree on it.

use serde::{Deserialize, Serialize};

use crate::models::{EnhancedSection, PresentationMetadata, PresentationPlan, SectionLayout};

/// Narrative job of a slide, derived from its position in the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideRole {
    HookQuestion,
    HookStatistic,
    HookStory,
    HookQuote,
    HookStatement,
    ProblemSetup,
    SolutionReveal,
    EvidenceData,
    BenefitsOutcomes,
    Implementation,
    CtaConclusion,
    SummaryConclusion,
    QuestionConclusion,
    VisionConclusion,
}

impl SlideRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideRole::HookQuestion => "hook-question",
            SlideRole::HookStatistic => "hook-statistic",
            SlideRole::HookStory => "hook-story",
            SlideRole::HookQuote => "hook-quote",
            SlideRole::HookStatement => "hook-statement",
            SlideRole::ProblemSetup => "problem-setup",
            SlideRole::SolutionReveal => "solution-reveal",
            SlideRole::EvidenceData => "evidence-data",
            SlideRole::BenefitsOutcomes => "benefits-outcomes",
            SlideRole::Implementation => "implementation",
            SlideRole::CtaConclusion => "cta-conclusion",
            SlideRole::SummaryConclusion => "summary-conclusion",
            SlideRole::QuestionConclusion => "question-conclusion",
            SlideRole::VisionConclusion => "vision-conclusion",
        }
    }

    /// What the slide should accomplish, for the slide prompt
    pub fn purpose(&self) -> &'static str {
        match self {
            SlideRole::HookQuestion => "Open with a thought-provoking question that makes the audience lean in",
            SlideRole::HookStatistic => "Open with one striking statistic that frames the problem",
            SlideRole::HookStory => "Open with a short, concrete story the audience can picture",
            SlideRole::HookQuote => "Open with a memorable quote that sets the theme",
            SlideRole::HookStatement => "Open with a bold statement of why this topic matters now",
            SlideRole::ProblemSetup => "Describe the problem or opportunity and why it matters to this audience",
            SlideRole::SolutionReveal => "Reveal the core idea or solution",
            SlideRole::EvidenceData => "Back the argument with data, examples or research",
            SlideRole::BenefitsOutcomes => "Show the benefits and outcomes the audience can expect",
            SlideRole::Implementation => "Lay out practical next steps and how to get started",
            SlideRole::CtaConclusion => "Close with a clear call to action",
            SlideRole::SummaryConclusion => "Close by summarising the key takeaways",
            SlideRole::QuestionConclusion => "Close with a question that leaves the audience thinking",
            SlideRole::VisionConclusion => "Close with an inspiring picture of the future",
        }
    }

    pub fn suggested_layout(&self) -> SectionLayout {
        match self {
            SlideRole::HookQuestion => SectionLayout::Hero,
            SlideRole::HookStatistic => SectionLayout::StatsGrid,
            SlideRole::HookStory => SectionLayout::ImageFocus,
            SlideRole::HookQuote => SectionLayout::QuoteHighlight,
            SlideRole::HookStatement => SectionLayout::Hero,
            SlideRole::ProblemSetup => SectionLayout::TwoColumn,
            SlideRole::SolutionReveal => SectionLayout::TitleContent,
            SlideRole::EvidenceData => SectionLayout::ChartFocus,
            SlideRole::BenefitsOutcomes => SectionLayout::Comparison,
            SlideRole::Implementation => SectionLayout::Timeline,
            SlideRole::CtaConclusion => SectionLayout::Hero,
            SlideRole::SummaryConclusion => SectionLayout::BulletList,
            SlideRole::QuestionConclusion => SectionLayout::Hero,
            SlideRole::VisionConclusion => SectionLayout::ImageFocus,
        }
    }
}

impl std::fmt::Display for SlideRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of slide `index` in a deck of `total` slides.
///
/// The first slide is always a hook and the last a conclusion; the middle is
/// banded by position (`index / total`): below 30% problem setup, below 50%
/// solution reveal, below 70% evidence, below 85% benefits, then
/// implementation.
pub fn classify_role(index: usize, total: usize, hook_type: &str, conclusion_style: &str) -> SlideRole {
    if index == 0 {
        return hook_role(hook_type);
    }
    if index + 1 >= total {
        return conclusion_role(conclusion_style);
    }

    // integer percent comparison keeps the band edges exact
    let position = index * 100;
    if position < 30 * total {
        SlideRole::ProblemSetup
    } else if position < 50 * total {
        SlideRole::SolutionReveal
    } else if position < 70 * total {
        SlideRole::EvidenceData
    } else if position < 85 * total {
        SlideRole::BenefitsOutcomes
    } else {
        SlideRole::Implementation
    }
}

fn hook_role(hook_type: &str) -> SlideRole {
    let hook = hook_type.to_lowercase();
    if hook.contains("question") {
        SlideRole::HookQuestion
    } else if hook.contains("statistic") || hook.trim() == "stat" {
        SlideRole::HookStatistic
    } else if hook.contains("story") || hook.contains("anecdote") {
        SlideRole::HookStory
    } else if hook.contains("quote") {
        SlideRole::HookQuote
    } else {
        SlideRole::HookStatement
    }
}

fn conclusion_role(conclusion_style: &str) -> SlideRole {
    let style = conclusion_style.to_lowercase().replace(|c: char| c == '_' || c == ' ', "-");
    if style.contains("call-to-action") || style == "cta" || style.contains("action") {
        SlideRole::CtaConclusion
    } else if style.contains("question") {
        SlideRole::QuestionConclusion
    } else if style.contains("vision") || style.contains("future") {
        SlideRole::VisionConclusion
    } else {
        SlideRole::SummaryConclusion
    }
}

const CATEGORY_KEYWORDS: [(&str, &[&str]); 5] = [
    (
        "Business",
        &[
            "business", "marketing", "sales", "strategy", "finance", "management", "startup", "revenue", "work",
            "productivity",
        ],
    ),
    (
        "Technology",
        &[
            "technology", "software", "ai", "artificial", "intelligence", "data", "cloud", "computing", "digital",
            "programming", "cybersecurity", "blockchain", "automation",
        ],
    ),
    (
        "Education",
        &["education", "learning", "teaching", "school", "students", "training", "course", "university"],
    ),
    (
        "Design",
        &["design", "ux", "ui", "creative", "branding", "visual", "typography", "art"],
    ),
    (
        "Science",
        &[
            "science", "research", "biology", "chemistry", "physics", "climate", "health", "medicine", "space",
            "energy",
        ],
    ),
];

fn topic_words(topic: &str) -> Vec<String> {
    topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// First category with a keyword among the topic's words, else "General"
pub fn categorize(topic: &str) -> &'static str {
    let words = topic_words(topic);
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| keywords.contains(&w.as_str())))
        .map(|(category, _)| *category)
        .unwrap_or("General")
}

pub fn difficulty_for(knowledge_level: &str) -> &'static str {
    match knowledge_level.trim().to_lowercase().as_str() {
        "beginner" => "beginner",
        "intermediate" => "intermediate",
        "expert" | "advanced" => "advanced",
        _ => "intermediate",
    }
}

/// Whole minutes, rounded up
pub fn estimated_minutes(sections: &[EnhancedSection]) -> u32 {
    let seconds: u64 = sections.iter().map(|s| u64::from(s.duration)).sum();
    u32::try_from(seconds.div_ceil(60)).unwrap_or(u32::MAX)
}

const MAX_KEYWORDS: usize = 10;

fn keywords_for(topic: &str, key_messages: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let candidates = topic_words(topic)
        .into_iter()
        .filter(|w| w.chars().count() > 3)
        .chain(key_messages.iter().map(|m| m.trim().to_lowercase()));

    for candidate in candidates {
        if !candidate.is_empty() && !keywords.contains(&candidate) {
            keywords.push(candidate);
        }
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
    }
    keywords
}

pub fn build_metadata(plan: &PresentationPlan, topic: &str, sections: &[EnhancedSection]) -> PresentationMetadata {
    PresentationMetadata {
        estimated_duration: estimated_minutes(sections),
        keywords: keywords_for(topic, &plan.key_messages),
        summary: plan.main_objective.clone(),
        difficulty: difficulty_for(&plan.target_audience.knowledge_level).to_string(),
        category: categorize(topic).to_string(),
    }
}
