//! Client for the external workflow engine that builds the reports.
//!
//! Two calls are made against it:
//! - the job trigger, `POST <webhook_url>` with the subject URL, report id and
//!   contact address
//! - an optional status check, `GET <results_url>?report_id=<id>`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::WorkflowSettings;

/// HTTP connect timeout for workflow calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP total timeout for workflow calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors talking to the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("workflow responded with HTTP {0}")]
    Status(u16),
}

/// Payload that starts a report job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobTriggerRequest {
    pub linkedin_url: String,
    pub user_email: String,
    pub report_id: Uuid,
}

/// Job state as reported by the workflow's status endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalJobStatus {
    pub status: String,
    #[serde(default)]
    pub google_sheet_url: Option<String>,
}

impl ExternalJobStatus {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// Starts report jobs.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    async fn trigger(&self, request: &JobTriggerRequest) -> Result<(), WorkflowError>;
}

/// Out-of-band job status check used while tracking.
#[async_trait]
pub trait JobStatusProbe: Send + Sync {
    /// `Ok(None)` when the workflow has nothing to say about the report yet.
    async fn check_status(&self, report_id: Uuid) -> Result<Option<ExternalJobStatus>, WorkflowError>;
}

/// Webhook-based workflow client.
#[derive(Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    webhook_url: String,
    results_url: Option<String>,
}

impl WorkflowClient {
    pub fn new(settings: &WorkflowSettings) -> Result<Self, WorkflowError> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;

        info!(
            "Workflow client initialized (webhook_url={}, results_url={:?})",
            settings.webhook_url, settings.results_url
        );

        Ok(Self {
            http,
            webhook_url: settings.webhook_url.clone(),
            results_url: settings.results_url.clone(),
        })
    }

    /// Whether a status endpoint is configured.
    pub fn has_status_endpoint(&self) -> bool {
        self.results_url.is_some()
    }

    fn status_url(results_url: &str, report_id: Uuid) -> String {
        let separator = if results_url.contains('?') { '&' } else { '?' };
        format!("{}{}report_id={}", results_url, separator, report_id)
    }
}

#[async_trait]
impl JobTrigger for WorkflowClient {
    async fn trigger(&self, request: &JobTriggerRequest) -> Result<(), WorkflowError> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::Status(status.as_u16()));
        }

        debug!(report_id = %request.report_id, "Workflow accepted job trigger");
        Ok(())
    }
}

#[async_trait]
impl JobStatusProbe for WorkflowClient {
    async fn check_status(&self, report_id: Uuid) -> Result<Option<ExternalJobStatus>, WorkflowError> {
        let Some(ref results_url) = self.results_url else {
            return Ok(None);
        };

        let response = self
            .http
            .get(Self::status_url(results_url, report_id))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(WorkflowError::Status(status.as_u16()));
        }

        Ok(Some(response.json::<ExternalJobStatus>().await?))
    }
}
