//! Lifecycle events produced by the report tracker and the views they map to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message shown when the tracker gave up waiting.
pub const TIMED_OUT_MESSAGE: &str =
    "Sorry, something went wrong while generating your competitor analysis. Please try again.";

/// Message shown when the workflow reported a failure.
pub const FAILED_MESSAGE: &str = "We encountered an error while processing your request.";

/// One observation of a tracked report.
///
/// Serialized with the same `status` values the store uses, so clients see
/// `{"status":"completed","google_sheet_url":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Processing,
    Completed {
        #[serde(rename = "google_sheet_url")]
        result_url: String,
    },
    Error {
        /// True when the local deadline fired rather than the workflow failing.
        timed_out: bool,
    },
}

impl LifecycleEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// The three mutually exclusive views a client can render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PresentationState {
    InProgress,
    Success {
        result_url: String,
    },
    Failure {
        message: String,
        timed_out: bool,
        retryable: bool,
    },
}

impl From<&LifecycleEvent> for PresentationState {
    fn from(event: &LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::Processing => Self::InProgress,
            LifecycleEvent::Completed { result_url } => Self::Success {
                result_url: result_url.clone(),
            },
            LifecycleEvent::Error { timed_out } => Self::Failure {
                message: if *timed_out {
                    TIMED_OUT_MESSAGE
                } else {
                    FAILED_MESSAGE
                }
                .to_string(),
                timed_out: *timed_out,
                retryable: true,
            },
        }
    }
}

/// Frame sent to a client following a report over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEventMessage {
    #[serde(flatten)]
    pub event: LifecycleEvent,
    pub view: PresentationState,
    pub timestamp: DateTime<Utc>,
}

impl TrackEventMessage {
    /// Wrap an event with its view and the current timestamp.
    pub fn new(event: LifecycleEvent) -> Self {
        let view = PresentationState::from(&event);
        Self {
            event,
            view,
            timestamp: Utc::now(),
        }
    }
}
