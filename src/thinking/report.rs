// Quality report derived from the last reflection

use serde::{Deserialize, Serialize};

use crate::agents::critic::{Criterion, ReflectionResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityBreakdown {
    pub content: u32,
    pub structure: u32,
    pub engagement: u32,
    pub visual: u32,
    pub audience: u32,
    pub originality: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// 0-100
    pub overall_score: u32,
    pub breakdown: QualityBreakdown,
    pub suggestions: Vec<String>,
    /// Percent of the target reached
    pub comparison_to_target: u32,
    pub passed: bool,
}

fn percent(scores: &[f64]) -> u32 {
    if scores.is_empty() {
        return 0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round().clamp(0.0, 100.0) as u32
}

impl QualityReport {
    pub fn from_reflection(reflection: &ReflectionResult, target: f64) -> Self {
        let score = |c: Criterion| reflection.criterion(c).score;

        let breakdown = QualityBreakdown {
            content: percent(&[
                score(Criterion::Clarity),
                score(Criterion::Relevance),
                score(Criterion::Completeness),
            ]),
            structure: percent(&[score(Criterion::Structure)]),
            engagement: percent(&[score(Criterion::Engagement)]),
            visual: percent(&[score(Criterion::VisualAppeal)]),
            audience: percent(&[score(Criterion::AudienceAlignment)]),
            originality: percent(&[score(Criterion::Engagement), score(Criterion::Relevance)]),
        };

        let comparison_to_target = if target > 0.0 {
            (reflection.overall_score / target * 100.0).round().max(0.0) as u32
        } else {
            100
        };

        Self {
            overall_score: percent(&[reflection.overall_score]),
            breakdown,
            suggestions: reflection
                .improvements
                .iter()
                .map(|i| format!("{}: {}", i.area, i.suggested_change))
                .collect(),
            comparison_to_target,
            passed: reflection.overall_score >= target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::critic::{CriterionScore, Improvement, Priority};

    fn score(value: f64) -> CriterionScore {
        CriterionScore {
            score: value,
            feedback: String::new(),
        }
    }

    #[test]
    fn test_report_mapping() {
        let reflection = ReflectionResult {
            clarity: score(8.0),
            relevance: score(7.0),
            engagement: score(6.0),
            structure: score(9.0),
            visual_appeal: score(5.0),
            completeness: score(6.0),
            audience_alignment: score(7.5),
            overall_score: 6.9,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            improvements: vec![Improvement {
                area: "visual".to_string(),
                current_state: String::new(),
                suggested_change: "Add a chart".to_string(),
                priority: Priority::High,
                affected_sections: vec![2],
            }],
            should_refine: true,
        };

        let report = QualityReport::from_reflection(&reflection, 7.5);

        assert_eq!(report.overall_score, 69);
        assert_eq!(report.breakdown.content, 70);
        assert_eq!(report.breakdown.structure, 90);
        assert_eq!(report.breakdown.visual, 50);
        assert_eq!(report.breakdown.audience, 75);
        assert_eq!(report.breakdown.originality, 65);
        assert_eq!(report.comparison_to_target, 92);
        assert!(!report.passed);
        assert_eq!(report.suggestions, vec!["visual: Add a chart".to_string()]);
    }
}
