//! WebSocket endpoint that follows one report until it finishes.
//!
//! After the upgrade the server sends one JSON frame per lifecycle event
//! (`processing` first, then exactly one of `completed` / `error`) and closes
//! the socket once the terminal frame is out. A client that disconnects early
//! stops the tracking session.
//!
//! # Authentication
//! The session token is checked before upgrading, from
//! `Authorization: Bearer <token>` or the `access_token` query parameter.

use std::time::{Duration, Instant};

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::{CloseCode, CloseReason, Message};
use futures_util::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::SessionAuth;
use crate::db::ReportStore;
use crate::error::AppError;
use crate::models::TrackEventMessage;
use crate::services::{ReportTracker, Tracking};

/// Ping interval for keeping connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for receiving pong response.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticate, check ownership, start tracking, then upgrade.
pub async fn track_report(
    req: HttpRequest,
    stream: web::Payload,
    auth: SessionAuth,
    path: web::Path<Uuid>,
    store: web::Data<dyn ReportStore>,
    tracker: web::Data<ReportTracker>,
) -> Result<HttpResponse, actix_web::Error> {
    let report_id = path.into_inner();

    // Unknown ids are tracked (they may not be written yet); foreign ones are hidden
    if let Some(report) = store.get(report_id).await?
        && report.owner_id != auth.user.id
    {
        return Err(AppError::NotFound(format!("Report {}", report_id)).into());
    }

    let tracking = tracker.track(report_id)?;

    let client_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string());

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    info!(
        client = %client_addr,
        user_id = %auth.user.id,
        report_id = %report_id,
        "Tracking connection established"
    );

    actix_web::rt::spawn(handle_tracking_connection(
        session,
        msg_stream,
        tracking,
        client_addr,
    ));

    Ok(response)
}

async fn handle_tracking_connection(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut tracking: Tracking,
    client_addr: String,
) {
    let report_id = tracking.report_id();
    let mut last_pong = Instant::now();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    let mut close_reason = None;

    loop {
        tokio::select! {
            event = tracking.recv() => {
                let Some(event) = event else {
                    close_reason = Some(CloseReason {
                        code: CloseCode::Normal,
                        description: Some("tracking finished".to_string()),
                    });
                    break;
                };

                match serde_json::to_string(&TrackEventMessage::new(event)) {
                    Ok(json) => {
                        if session.text(json).await.is_err() {
                            warn!(client = %client_addr, report_id = %report_id, "Failed to send event, closing connection");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize lifecycle event"),
                }
            }

            msg = msg_stream.next() => {
                let Some(msg_result) = msg else {
                    info!(client = %client_addr, report_id = %report_id, "Client disconnected from tracking connection");
                    break;
                };

                match msg_result {
                    Ok(Message::Ping(bytes)) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Pong(_)) => {
                        last_pong = Instant::now();
                    }
                    Ok(Message::Close(reason)) => {
                        info!(client = %client_addr, report_id = %report_id, reason = ?reason, "Client closed tracking connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(client = %client_addr, error = %e, "WebSocket message error");
                        break;
                    }
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PING_INTERVAL + PONG_TIMEOUT {
                    warn!(client = %client_addr, report_id = %report_id, "Pong timeout, closing connection");
                    break;
                }
                if session.ping(b"").await.is_err() {
                    break;
                }
            }
        }
    }

    // Stops the session if it is still running
    drop(tracking);

    let _ = session.close(close_reason).await;
    debug!(client = %client_addr, report_id = %report_id, "Tracking connection closed");
}

/// Configure WebSocket routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/reports/{report_id}/track").route(web::get().to(track_report)),
    );
}
