//! Domain models for the competitor report server.

pub mod lifecycle;
pub mod profile;
pub mod report;

// Re-export commonly used types
pub use lifecycle::{LifecycleEvent, PresentationState, TrackEventMessage};
pub use profile::{Profile, ProfilePatch, ProfileResponse, UpdateProfileRequest};
pub use report::{
    ListReportsQuery, NewReport, Report, ReportCallbackRequest, ReportListResponse, ReportPatch,
    ReportResponse, ReportStatus, SubmitReportRequest, validate_linkedin_url,
};
