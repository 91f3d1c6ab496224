// Persistence boundary for finished decks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::StorageConfig;
use crate::models::EnhancedPresentation;
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOptions {
    /// Defaults to the presentation title
    pub name: Option<String>,
    pub owner: Option<String>,
    pub tags: Vec<String>,
}

/// Where a finished presentation becomes a project. Returns the project id.
#[async_trait]
pub trait PresentationSink: Send + Sync {
    async fn create_project(
        &self,
        presentation: &EnhancedPresentation,
        options: &ProjectOptions,
    ) -> AppResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord<'a> {
    id: &'a str,
    name: &'a str,
    owner: Option<&'a str>,
    tags: &'a [String],
    created_at: chrono::DateTime<chrono::Utc>,
    presentation: &'a EnhancedPresentation,
}

/// Writes each project to `<dir>/<project-id>.json`
#[derive(Debug, Clone)]
pub struct LocalJsonSink {
    dir: PathBuf,
}

impl LocalJsonSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.projects_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PresentationSink for LocalJsonSink {
    async fn create_project(
        &self,
        presentation: &EnhancedPresentation,
        options: &ProjectOptions,
    ) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let record = ProjectRecord {
            id: &id,
            name: options.name.as_deref().unwrap_or(&presentation.title),
            owner: options.owner.as_deref(),
            tags: &options.tags,
            created_at: chrono::Utc::now(),
            presentation,
        };
        let body = serde_json::to_vec_pretty(&record)
            .map_err(|e| AppError::Storage(format!("Failed to serialize project: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", self.dir.display(), e)))?;

        let path = self.dir.join(format!("{}.json", id));
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(project_id = %id, path = %path.display(), "Project saved");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PresentationMetadata;

    fn presentation() -> EnhancedPresentation {
        EnhancedPresentation {
            title: "Tidal Energy".to_string(),
            subtitle: "Power from the moon".to_string(),
            sections: Vec::new(),
            metadata: PresentationMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_local_sink_writes_project_file() {
        let dir = std::env::temp_dir().join(format!("oxidized-deck-{}", uuid::Uuid::new_v4()));
        let sink = LocalJsonSink::new(&dir);
        let options = ProjectOptions {
            tags: vec!["energy".to_string()],
            ..Default::default()
        };

        let id = sink.create_project(&presentation(), &options).await.unwrap();

        let saved = tokio::fs::read_to_string(dir.join(format!("{}.json", id))).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(value["id"], id.as_str());
        assert_eq!(value["name"], "Tidal Energy");
        assert_eq!(value["tags"][0], "energy");
        assert_eq!(value["presentation"]["subtitle"], "Power from the moon");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_a_storage_error() {
        let file = std::env::temp_dir().join(format!("oxidized-deck-file-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&file, b"not a dir").await.unwrap();

        let result = LocalJsonSink::new(&file)
            .create_project(&presentation(), &ProjectOptions::default())
            .await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        tokio::fs::remove_file(&file).await.unwrap();
    }
}
