//! Report submission, lookup and listing.

use actix_web::test;
use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_submit_creates_processing_report_and_triggers_workflow() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = submit_report(
        &app,
        &user_token("jane"),
        "https://www.linkedin.com/in/acme-corp",
    )
    .await;

    assert_eq!(status, 201, "submit should succeed: {:?}", body);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["linkedin_url"], "https://www.linkedin.com/in/acme-corp");
    assert!(body.get("google_sheet_url").is_none());

    let triggers = ctx.workflow.triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(
        triggers[0],
        json!({
            "linkedin_url": "https://www.linkedin.com/in/acme-corp",
            "user_email": "jane@example.com",
            "report_id": body["id"],
        })
    );
}

#[actix_rt::test]
async fn test_invalid_url_is_rejected_before_any_side_effect() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;
    let token = user_token("jane");

    for url in [
        "https://www.linkedin.com/company/acme",
        "http://www.linkedin.com/in/acme",
        "https://www.linkedin.com/in/acme/posts",
        "",
    ] {
        let (status, body) = submit_report(&app, &token, url).await;
        assert_eq!(status, 400, "{} should be rejected: {:?}", url, body);
        assert_eq!(body["error"], "INVALID_INPUT");
    }

    assert!(ctx.workflow.triggers().is_empty());
    let (_, list) = get_json(&app, "/api/v1/reports", &token).await;
    assert_eq!(list["total"], 0);
}

#[actix_rt::test]
async fn test_trigger_failure_returns_502_and_stores_error() {
    let ctx = TestContext::new().await;
    ctx.workflow.fail_triggers();
    let app = create_test_app(&ctx).await;
    let token = user_token("jane");

    let (status, body) = submit_report(&app, &token, "https://linkedin.com/in/acme-corp").await;

    assert_eq!(status, 502, "{:?}", body);
    assert_eq!(body["error"], "TRIGGER_FAILED");
    assert_eq!(body["message"], "Failed to generate report. Please try again.");

    let (_, list) = get_json(&app, "/api/v1/reports", &token).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["reports"][0]["status"], "error");
}

#[actix_rt::test]
async fn test_requests_without_session_are_rejected() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get().uri("/api/v1/reports").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let (status, body) = get_json(&app, "/api/v1/reports", "not-a-jwt").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[actix_rt::test]
async fn test_reports_are_private_to_their_owner() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let (_, created) = submit_report(
        &app,
        &user_token("alice"),
        "https://www.linkedin.com/in/acme-corp",
    )
    .await;
    let uri = format!("/api/v1/reports/{}", created["id"].as_str().unwrap());

    let (status, body) = get_json(&app, &uri, &user_token("alice")).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], created["id"]);

    let (status, _) = get_json(&app, &uri, &user_token("bob")).await;
    assert_eq!(status, 404);

    let (_, list) = get_json(&app, "/api/v1/reports", &user_token("bob")).await;
    assert_eq!(list["total"], 0);
    assert_eq!(list["reports"], json!([]));
}

#[actix_rt::test]
async fn test_unknown_report_is_404() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;

    let uri = format!("/api/v1/reports/{}", uuid::Uuid::now_v7());
    let (status, body) = get_json(&app, &uri, &user_token("alice")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_list_is_newest_first_and_paginated() {
    let ctx = TestContext::new().await;
    let app = create_test_app(&ctx).await;
    let token = user_token("alice");

    for handle in ["first", "second", "third"] {
        let (status, _) = submit_report(
            &app,
            &token,
            &format!("https://www.linkedin.com/in/{}", handle),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (status, page) = get_json(&app, "/api/v1/reports?limit=2&offset=0", &token).await;
    assert_eq!(status, 200);
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["reports"].as_array().unwrap().len(), 2);
    assert_eq!(
        page["reports"][0]["linkedin_url"],
        "https://www.linkedin.com/in/third"
    );

    let (_, rest) = get_json(&app, "/api/v1/reports?limit=2&offset=2", &token).await;
    assert_eq!(rest["reports"].as_array().unwrap().len(), 1);
    assert_eq!(
        rest["reports"][0]["linkedin_url"],
        "https://www.linkedin.com/in/first"
    );

    let (_, clamped) = get_json(&app, "/api/v1/reports?limit=1000", &token).await;
    assert_eq!(clamped["limit"], 100);
}
