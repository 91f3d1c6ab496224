// Worker that runs generation jobs end to end

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Config;
use crate::queue::jobs::{GenerationJob, GenerationMode, JobOutcome};
use crate::storage::{LocalJsonSink, PresentationSink};
use crate::thinking::{ThinkingEvent, ThinkingOrchestrator, ThinkingResult};
use crate::types::{AppError, AppResult};
use crate::utils::retry::with_retry_when;

const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

pub struct Worker {
    orchestrator: Arc<ThinkingOrchestrator>,
    sink: Option<Arc<dyn PresentationSink>>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Worker {
    pub fn new(orchestrator: Arc<ThinkingOrchestrator>, max_attempts: u32) -> Self {
        Self {
            orchestrator,
            sink: None,
            max_attempts: max_attempts.max(1),
            retry_delay: RETRY_BASE_DELAY,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let orchestrator = ThinkingOrchestrator::from_config(config)?;
        Ok(Self::new(Arc::new(orchestrator), config.thinking.job_max_attempts)
            .with_sink(Arc::new(LocalJsonSink::from_config(&config.storage))))
    }

    pub fn with_sink(mut self, sink: Arc<dyn PresentationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn orchestrator(&self) -> &ThinkingOrchestrator {
        &self.orchestrator
    }

    /// Run a job, retrying transient failures with backoff
    pub async fn process_job(&self, job: &GenerationJob) -> AppResult<JobOutcome> {
        job.params.validated()?;
        info!(job_id = %job.id, mode = ?job.mode, topic = %job.params.topic, "Processing generation job");

        let outcome = with_retry_when(
            |attempt| async move {
                if attempt > 1 {
                    info!(job_id = %job.id, attempt, "Retrying generation job");
                }
                let result = match job.mode {
                    GenerationMode::Thinking => self.orchestrator.generate(&job.params).await?,
                    GenerationMode::Quick => self.orchestrator.generate_quick(&job.params).await?,
                };
                self.finish(job, result).await
            },
            AppError::is_retryable,
            self.max_attempts,
            self.retry_delay,
        )
        .await;

        if let Err(e) = &outcome {
            error!(job_id = %job.id, error = %e, "Generation job failed");
        }
        outcome
    }

    /// Run a thinking job once, forwarding progress to `events`
    pub async fn process_streaming(
        &self,
        job: &GenerationJob,
        events: mpsc::Sender<ThinkingEvent>,
    ) -> AppResult<JobOutcome> {
        job.params.validated()?;
        info!(job_id = %job.id, topic = %job.params.topic, "Processing streaming generation job");

        let result = self.orchestrator.generate_streaming(&job.params, events).await?;
        self.finish(job, result).await
    }

    async fn finish(&self, job: &GenerationJob, result: ThinkingResult) -> AppResult<JobOutcome> {
        if !job.create_project {
            return Ok(JobOutcome::Presentation(Box::new(result)));
        }

        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| AppError::Config("Project requested but no storage is configured".to_string()))?;
        let project_id = sink.create_project(&result.presentation, &job.project_options).await?;
        info!(job_id = %job.id, project_id = %project_id, "Project created");

        Ok(JobOutcome::PresentationWithProject {
            result: Box::new(result),
            project_id,
        })
    }
}
