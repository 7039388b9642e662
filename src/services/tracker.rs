//! Report lifecycle tracker.
//!
//! Follows one report from `processing` to a terminal outcome. Each tracking
//! session runs as its own task with three event sources composed in a single
//! `select!` loop:
//!
//! - a poll interval that reads the store (and optionally probes the workflow)
//! - a fixed deadline after which the report is declared timed out
//! - a cancellation token owned by the [`Tracking`] handle
//!
//! Exactly one terminal event is emitted per session, after which the session
//! stops and the event stream ends.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures_util::Stream;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TrackerSettings;
use crate::db::ReportStore;
use crate::error::{AppError, AppResult};
use crate::models::{LifecycleEvent, Report, ReportPatch, ReportStatus};

use super::workflow::JobStatusProbe;

/// Starts tracking sessions against a report store.
#[derive(Clone)]
pub struct ReportTracker {
    store: Arc<dyn ReportStore>,
    probe: Option<Arc<dyn JobStatusProbe>>,
    settings: TrackerSettings,
}

impl ReportTracker {
    pub fn new(store: Arc<dyn ReportStore>, settings: TrackerSettings) -> Self {
        Self {
            store,
            probe: None,
            settings,
        }
    }

    /// Also consult the workflow's status endpoint on every tick.
    pub fn with_probe(mut self, probe: Arc<dyn JobStatusProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Start tracking `report_id`.
    ///
    /// The returned handle already holds a `Processing` event. Dropping the
    /// handle stops the session.
    pub fn track(&self, report_id: Uuid) -> AppResult<Tracking> {
        if report_id.is_nil() {
            return Err(AppError::InvalidInput(
                "report id must not be empty".to_string(),
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let session = Session {
            report_id,
            store: self.store.clone(),
            probe: self.probe.clone(),
            settings: self.settings,
            events: events_tx,
            cancel: cancel.clone(),
            terminated: AtomicBool::new(false),
            started: Instant::now(),
        };
        session.emit(LifecycleEvent::Processing);

        debug!(
            report_id = %report_id,
            interval_secs = self.settings.poll_interval.as_secs_f64(),
            deadline_secs = self.settings.deadline.as_secs_f64(),
            "Tracking report"
        );
        tokio::spawn(session.run());

        Ok(Tracking {
            report_id,
            events: events_rx,
            cancel,
        })
    }
}

/// Handle to a running tracking session.
///
/// Yields lifecycle events in order and ends after the terminal one.
pub struct Tracking {
    report_id: Uuid,
    events: mpsc::UnboundedReceiver<LifecycleEvent>,
    cancel: CancellationToken,
}

impl Tracking {
    pub fn report_id(&self) -> Uuid {
        self.report_id
    }

    /// Wait for the next event. `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        self.events.recv().await
    }

    /// Take an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<LifecycleEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the session. No reads, writes or events happen afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for Tracking {
    type Item = LifecycleEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Tracking {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Result of one read cycle.
#[derive(Debug)]
enum Observation {
    /// Nothing conclusive this tick.
    Pending,
    /// The store holds a terminal record.
    Terminal(LifecycleEvent),
    /// The workflow reported a failure the store does not know about yet.
    WorkflowFailed,
}

/// A store read or the error write-back that follows a workflow failure.
type ReadFuture = Pin<Box<dyn Future<Output = Observation> + Send>>;

struct Session {
    report_id: Uuid,
    store: Arc<dyn ReportStore>,
    probe: Option<Arc<dyn JobStatusProbe>>,
    settings: TrackerSettings,
    events: mpsc::UnboundedSender<LifecycleEvent>,
    cancel: CancellationToken,
    terminated: AtomicBool,
    started: Instant,
}

impl Session {
    async fn run(self) {
        let deadline = tokio::time::sleep_until(self.started + self.settings.deadline);
        tokio::pin!(deadline);

        // First tick completes immediately
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reads: FuturesUnordered<ReadFuture> = FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!(report_id = %self.report_id, "Tracking cancelled");
                    break;
                }

                _ = &mut deadline => {
                    warn!(
                        report_id = %self.report_id,
                        "Report did not finish within {}s, giving up",
                        self.settings.deadline.as_secs()
                    );
                    self.finish(LifecycleEvent::Error { timed_out: true });
                    break;
                }

                Some(observation) = reads.next(), if !reads.is_empty() => {
                    match observation {
                        Observation::Pending => {}
                        Observation::Terminal(event) => {
                            self.finish(event);
                            break;
                        }
                        // Queued like a read so cancellation and the deadline still win
                        Observation::WorkflowFailed => reads.push(self.record_workflow_failure()),
                    }
                }

                _ = ticker.tick() => {
                    if reads.is_empty() {
                        reads.push(self.read());
                    } else {
                        debug!(report_id = %self.report_id, "Previous read still in flight, skipping tick");
                    }
                }
            }
        }
    }

    fn read(&self) -> ReadFuture {
        let report_id = self.report_id;
        let store = self.store.clone();
        let probe = self.probe.clone();

        Box::pin(async move {
            match store.get(report_id).await {
                Ok(Some(report)) => {
                    if let Some(event) = terminal_event(&report) {
                        return Observation::Terminal(event);
                    }
                }
                Ok(None) => {
                    debug!(report_id = %report_id, "Report not found yet, treating as processing");
                }
                Err(e) => {
                    warn!(report_id = %report_id, "Failed to read report status: {}", e);
                }
            }

            let Some(probe) = probe else {
                return Observation::Pending;
            };

            match probe.check_status(report_id).await {
                Ok(Some(status)) if status.is_error() => Observation::WorkflowFailed,
                Ok(_) => Observation::Pending,
                Err(e) => {
                    warn!(report_id = %report_id, "Workflow status check failed: {}", e);
                    Observation::Pending
                }
            }
        })
    }

    /// Best-effort write of `error` after the workflow reported a failure.
    ///
    /// Resolves to the event to finish with, or `Pending` if the store still
    /// reads as processing. Dropped unfinished when the session ends.
    fn record_workflow_failure(&self) -> ReadFuture {
        let report_id = self.report_id;
        let store = self.store.clone();
        let cancel = self.cancel.clone();

        Box::pin(async move {
            match store.update(report_id, ReportPatch::error()).await {
                Ok(_) => {
                    info!(report_id = %report_id, "Workflow reported failure, report marked as error");
                    Observation::Terminal(LifecycleEvent::Error { timed_out: false })
                }
                // Someone else reached a terminal state first; report what they wrote
                Err(AppError::Conflict(_)) => {
                    if cancel.is_cancelled() {
                        return Observation::Pending;
                    }
                    match store.get(report_id).await {
                        Ok(Some(report)) => terminal_event(&report)
                            .map_or(Observation::Pending, Observation::Terminal),
                        _ => Observation::Terminal(LifecycleEvent::Error { timed_out: false }),
                    }
                }
                Err(e) => {
                    warn!(
                        report_id = %report_id,
                        "Failed to mark report as error after workflow failure: {}", e
                    );
                    Observation::Terminal(LifecycleEvent::Error { timed_out: false })
                }
            }
        })
    }

    /// Emit a terminal event, at most once per session.
    fn finish(&self, event: LifecycleEvent) {
        if self
            .terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!(report_id = %self.report_id, outcome = ?event, "Tracking finished");
            self.emit(event);
            self.cancel.cancel();
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        // Receiver gone means the handle was dropped
        let _ = self.events.send(event);
    }
}

/// Map a stored record to a terminal event, if it is one.
fn terminal_event(report: &Report) -> Option<LifecycleEvent> {
    match report.status {
        ReportStatus::Completed => report.completed_result_url().map(|url| {
            LifecycleEvent::Completed {
                result_url: url.to_string(),
            }
        }),
        ReportStatus::Error => Some(LifecycleEvent::Error { timed_out: false }),
        ReportStatus::Processing => None,
    }
}
