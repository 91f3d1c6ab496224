// Job definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::GenerationParams;
use crate::storage::ProjectOptions;
use crate::thinking::ThinkingResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Full plan, critique and refine loop
    #[default]
    Thinking,
    /// Baseline plan, single draft
    Quick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: String,
    pub params: GenerationParams,
    pub mode: GenerationMode,
    /// Persist the deck as a project once it is done
    pub create_project: bool,
    pub project_options: ProjectOptions,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    pub fn new(params: GenerationParams, mode: GenerationMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            params,
            mode,
            create_project: false,
            project_options: ProjectOptions::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_project(mut self, options: ProjectOptions) -> Self {
        self.create_project = true;
        self.project_options = options;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum JobOutcome {
    Presentation(Box<ThinkingResult>),
    #[serde(rename_all = "camelCase")]
    PresentationWithProject {
        result: Box<ThinkingResult>,
        project_id: String,
    },
}

impl JobOutcome {
    pub fn result(&self) -> &ThinkingResult {
        match self {
            JobOutcome::Presentation(result) => result,
            JobOutcome::PresentationWithProject { result, .. } => result,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            JobOutcome::Presentation(_) => None,
            JobOutcome::PresentationWithProject { project_id, .. } => Some(project_id),
        }
    }
}
