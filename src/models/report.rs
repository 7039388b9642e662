//! Report domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Report status enum.
///
/// `Processing` is the only non-terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Processing,
    Completed,
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored competitor report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: Uuid,
    /// Session subject of the user who requested the report.
    pub owner_id: String,
    /// Competitor profile being analyzed.
    pub linkedin_url: String,
    /// Generated spreadsheet, set together with `Completed`.
    pub google_sheet_url: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// The result URL, if the record is a fully written completion.
    ///
    /// A `completed` row whose URL is missing or blank is treated as still
    /// being written.
    pub fn completed_result_url(&self) -> Option<&str> {
        match (self.status, self.google_sheet_url.as_deref()) {
            (ReportStatus::Completed, Some(url)) if !url.trim().is_empty() => Some(url),
            _ => None,
        }
    }
}

/// Data needed to create a report record.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub owner_id: String,
    pub linkedin_url: String,
}

/// Change applied to a report while it is still processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPatch {
    pub status: ReportStatus,
    pub google_sheet_url: Option<String>,
}

impl ReportPatch {
    pub fn completed(google_sheet_url: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Completed,
            google_sheet_url: Some(google_sheet_url.into()),
        }
    }

    pub fn error() -> Self {
        Self {
            status: ReportStatus::Error,
            google_sheet_url: None,
        }
    }
}

/// Check that a URL points at a public LinkedIn profile.
///
/// Accepts `https://` with an optional `www.` host prefix, the `/in/<handle>`
/// path, ASCII alphanumerics and hyphens in the handle, and an optional
/// trailing slash. Nothing else (no query, fragment or extra segments).
pub fn validate_linkedin_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let Some(handle) = rest.strip_prefix("linkedin.com/in/") else {
        return false;
    };
    let handle = handle.strip_suffix('/').unwrap_or(handle);

    !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Request to generate a report.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitReportRequest {
    /// Competitor's public LinkedIn profile URL.
    pub linkedin_url: String,
}

/// Report as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub linkedin_url: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_sheet_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            linkedin_url: r.linkedin_url,
            status: r.status,
            google_sheet_url: r.google_sheet_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Report list response with pagination.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportListResponse {
    pub reports: Vec<ReportResponse>,
    /// Total number of reports owned by the caller.
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Query parameters for listing reports.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListReportsQuery {
    /// Maximum results to return (1-100).
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Offset for pagination.
    #[serde(default)]
    pub offset: u64,
}

impl Default for ListReportsQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ListReportsQuery {
    pub fn clamped_limit(&self) -> u64 {
        self.limit.clamp(1, 100)
    }
}

fn default_limit() -> u64 {
    20
}

/// Outcome posted by the workflow engine when a job finishes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReportCallbackRequest {
    /// `completed` or `error`.
    pub status: ReportStatus,
    /// Spreadsheet URL, required when `status` is `completed`.
    #[serde(default)]
    pub google_sheet_url: Option<String>,
}
