//! Business logic services.

pub mod submission;
pub mod tracker;
pub mod workflow;

pub use submission::{ReportSubmitter, Requester};
pub use tracker::{ReportTracker, Tracking};
pub use workflow::{JobStatusProbe, JobTrigger, WorkflowClient, WorkflowError};
