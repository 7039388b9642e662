//! Report submission: validate, record, then hand the job to the workflow.

use std::sync::Arc;

use tracing::{error, info};

use crate::db::{ProfileStore, ReportStore};
use crate::error::{AppError, AppResult};
use crate::models::{NewReport, Report, ReportPatch, validate_linkedin_url};

use super::workflow::{JobTrigger, JobTriggerRequest};

/// The authenticated user submitting a report.
#[derive(Debug, Clone)]
pub struct Requester {
    pub owner_id: String,
    /// Email claim from the session, used when no profile exists yet.
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct ReportSubmitter {
    reports: Arc<dyn ReportStore>,
    profiles: Arc<dyn ProfileStore>,
    trigger: Arc<dyn JobTrigger>,
}

impl ReportSubmitter {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        profiles: Arc<dyn ProfileStore>,
        trigger: Arc<dyn JobTrigger>,
    ) -> Self {
        Self {
            reports,
            profiles,
            trigger,
        }
    }

    /// Create a report for `linkedin_url` and start its job.
    ///
    /// If the trigger fails the report is moved to `error` before
    /// [`AppError::TriggerFailed`] is returned.
    pub async fn submit(&self, requester: &Requester, linkedin_url: &str) -> AppResult<Report> {
        if !validate_linkedin_url(linkedin_url) {
            return Err(AppError::InvalidInput(
                "Please enter a valid LinkedIn profile URL (https://www.linkedin.com/in/<name>)"
                    .to_string(),
            ));
        }

        let user_email = self.contact_email(requester).await?;

        let report = self
            .reports
            .create(NewReport {
                owner_id: requester.owner_id.clone(),
                linkedin_url: linkedin_url.to_string(),
            })
            .await?;

        let request = JobTriggerRequest {
            linkedin_url: report.linkedin_url.clone(),
            user_email,
            report_id: report.id,
        };

        if let Err(e) = self.trigger.trigger(&request).await {
            if let Err(write_err) = self.reports.update(report.id, ReportPatch::error()).await {
                error!(
                    report_id = %report.id,
                    "Failed to mark report as error after trigger failure: {}", write_err
                );
            }
            return Err(AppError::TriggerFailed(format!(
                "report {}: {}",
                report.id, e
            )));
        }

        info!(
            report_id = %report.id,
            owner_id = %report.owner_id,
            "Report submitted"
        );
        Ok(report)
    }

    async fn contact_email(&self, requester: &Requester) -> AppResult<String> {
        if let Some(profile) = self.profiles.get_profile(&requester.owner_id).await? {
            return Ok(profile.email);
        }

        match requester.email.as_deref() {
            Some(email) if !email.trim().is_empty() => {
                let profile = self
                    .profiles
                    .get_or_create_profile(&requester.owner_id, email.trim())
                    .await?;
                Ok(profile.email)
            }
            _ => Err(AppError::InvalidInput(
                "No contact email is associated with this account".to_string(),
            )),
        }
    }
}
