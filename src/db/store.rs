//! Storage ports shared by the PostgreSQL and in-memory backends.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ListReportsQuery, NewReport, Profile, ProfilePatch, Report, ReportPatch, ReportStatus,
};

/// Keyed access to report records.
///
/// `update` only applies while the stored report is `processing`; a terminal
/// record is never rewritten and yields [`AppError::Conflict`].
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Look up a report. `Ok(None)` means the id is unknown.
    async fn get(&self, id: Uuid) -> AppResult<Option<Report>>;

    /// Insert a new report with status `processing`.
    async fn create(&self, report: NewReport) -> AppResult<Report>;

    /// Move a processing report to a terminal state.
    async fn update(&self, id: Uuid, patch: ReportPatch) -> AppResult<Report>;

    /// List a user's reports, newest first, with the total count.
    async fn list_for_owner(
        &self,
        owner_id: &str,
        query: &ListReportsQuery,
    ) -> AppResult<(Vec<Report>, u64)>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> AppResult<()>;
}

/// Profile records keyed by session subject.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>>;

    /// Return the profile, creating it with `email` on first access.
    async fn get_or_create_profile(&self, id: &str, email: &str) -> AppResult<Profile>;

    async fn update_profile(&self, id: &str, patch: ProfilePatch) -> AppResult<Profile>;
}

/// Reject patches that cannot describe a terminal transition.
pub(crate) fn check_patch(patch: &ReportPatch) -> AppResult<()> {
    match patch.status {
        ReportStatus::Processing => Err(AppError::InvalidInput(
            "reports can only be moved to completed or error".to_string(),
        )),
        ReportStatus::Completed
            if patch
                .google_sheet_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty()) =>
        {
            Err(AppError::InvalidInput(
                "google_sheet_url is required for completed reports".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

pub(crate) fn terminal_conflict(id: Uuid, status: ReportStatus) -> AppError {
    AppError::Conflict(format!("Report {} is already {}", id, status))
}
