//! Tracking a submitted report through the HTTP surface.

use std::time::Duration;

use actix_web::test;
use competitor_report_lib::db::ReportStore;
use competitor_report_lib::models::{LifecycleEvent, NewReport, ReportStatus};
use competitor_report_lib::services::Tracking;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;

use super::test_helpers::*;

async fn next_event(tracking: &mut Tracking) -> Option<LifecycleEvent> {
    tokio::time::timeout(Duration::from_secs(5), tracking.recv())
        .await
        .expect("tracker produced no event in time")
}

#[actix_rt::test]
async fn test_callback_completion_reaches_tracker() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let (_, created) = submit_report(
        &app,
        &user_token("alice"),
        "https://www.linkedin.com/in/acme-corp",
    )
    .await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let mut tracking = ctx.tracker.track(id).unwrap();
    assert_eq!(tracking.try_recv(), Some(LifecycleEvent::Processing));

    let (status, _) = post_callback(
        &app,
        &id.to_string(),
        Some(TEST_WEBHOOK_SECRET),
        json!({"status": "completed", "google_sheet_url": "https://docs.google.com/spreadsheets/d/abc"}),
    )
    .await;
    assert_eq!(status, 200);

    assert_eq!(
        next_event(&mut tracking).await,
        Some(LifecycleEvent::Completed {
            result_url: "https://docs.google.com/spreadsheets/d/abc".to_string()
        })
    );
    assert_eq!(next_event(&mut tracking).await, None);
}

#[actix_rt::test]
async fn test_workflow_reported_failure_is_written_back() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let (_, created) = submit_report(
        &app,
        &user_token("alice"),
        "https://www.linkedin.com/in/acme-corp",
    )
    .await;
    let id_str = created["id"].as_str().unwrap();
    let id: Uuid = id_str.parse().unwrap();
    ctx.workflow.set_status(id_str, json!({"status": "error"}));

    let mut tracking = ctx.tracker.track(id).unwrap();
    assert_eq!(next_event(&mut tracking).await, Some(LifecycleEvent::Processing));
    assert_eq!(
        next_event(&mut tracking).await,
        Some(LifecycleEvent::Error { timed_out: false })
    );

    let stored = ctx.store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReportStatus::Error);
}

#[actix_rt::test]
async fn test_unresolved_report_times_out() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let (_, created) = submit_report(
        &app,
        &user_token("alice"),
        "https://www.linkedin.com/in/acme-corp",
    )
    .await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let mut tracking = ctx.tracker.track(id).unwrap();
    assert_eq!(next_event(&mut tracking).await, Some(LifecycleEvent::Processing));
    assert_eq!(
        next_event(&mut tracking).await,
        Some(LifecycleEvent::Error { timed_out: true })
    );
    assert_eq!(next_event(&mut tracking).await, None);

    // The timeout is local; the stored report is left alone
    let stored = ctx.store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReportStatus::Processing);
}

fn websocket_request(uri: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("upgrade", "websocket"))
        .insert_header(("connection", "Upgrade"))
        .insert_header(("sec-websocket-version", "13"))
        .insert_header(("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ=="))
}

#[actix_rt::test]
async fn test_track_socket_checks_session_and_owner() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let (_, created) = submit_report(
        &app,
        &user_token("alice"),
        "https://www.linkedin.com/in/acme-corp",
    )
    .await;
    let uri = format!("/api/v1/reports/{}/track", created["id"].as_str().unwrap());

    let resp = test::call_service(&app, websocket_request(&uri).to_request()).await;
    assert_eq!(resp.status().as_u16(), 401);

    let foreign = format!("{}?access_token={}", uri, user_token("bob"));
    let resp = test::call_service(&app, websocket_request(&foreign).to_request()).await;
    assert_eq!(resp.status().as_u16(), 404);

    let owned = format!("{}?access_token={}", uri, user_token("alice"));
    let resp = test::call_service(&app, websocket_request(&owned).to_request()).await;
    assert_eq!(resp.status().as_u16(), 101);
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[actix_rt::test]
async fn test_client_disconnect_stops_tracking() {
    let ctx = TestContext::new().await;
    let addr = start_test_server(&ctx);

    let report = ctx
        .store
        .create(NewReport {
            owner_id: "alice".to_string(),
            linkedin_url: "https://www.linkedin.com/in/acme-corp".to_string(),
        })
        .await
        .unwrap();

    let mut socket = TcpStream::connect(addr).await.unwrap();
    let handshake = format!(
        "GET /api/v1/reports/{}/track?access_token={} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        report.id,
        user_token("alice"),
        addr
    );
    socket.write_all(handshake.as_bytes()).await.unwrap();

    let mut buf = [0u8; 1024];
    let n = socket.read(&mut buf).await.unwrap();
    assert!(
        String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 101"),
        "unexpected handshake response: {}",
        String::from_utf8_lossy(&buf[..n])
    );

    wait_until(|| ctx.workflow.status_checks() > 0).await;

    // Hang up without a close frame
    drop(socket);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let checks_after_disconnect = ctx.workflow.status_checks();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(ctx.workflow.status_checks(), checks_after_disconnect);
}
