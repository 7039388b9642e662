//! Shared helpers for the API test suite.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, dev::ServiceResponse, test, web};
use chrono::Utc;
use competitor_report_lib::auth::{SessionVerifier, WebhookSecret};
use competitor_report_lib::config::{SessionSettings, TrackerSettings, WorkflowSettings};
use competitor_report_lib::db::{MemoryStore, ProfileStore, ReportStore};
use competitor_report_lib::services::{ReportSubmitter, ReportTracker, WorkflowClient};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::SecretString;
use serde_json::{Value, json};

use super::mock_workflow::MockWorkflow;

pub const TEST_SESSION_SECRET: &str = "test-session-secret-for-api-tests";
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret-for-api-tests";
pub const TEST_AUDIENCE: &str = "authenticated";

/// Everything a test app is built from.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub workflow: MockWorkflow,
    pub tracker: ReportTracker,
    submitter: ReportSubmitter,
}

impl TestContext {
    /// Memory store, mock workflow, and a fast tracker.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let workflow = MockWorkflow::start().await;

        let client = Arc::new(
            WorkflowClient::new(&WorkflowSettings {
                webhook_url: workflow.webhook_url(),
                results_url: Some(workflow.results_url()),
                callback_secret: SecretString::from(TEST_WEBHOOK_SECRET),
            })
            .expect("failed to build workflow client"),
        );

        let tracker = ReportTracker::new(
            store.clone(),
            TrackerSettings {
                poll_interval: Duration::from_millis(50),
                deadline: Duration::from_secs(3),
            },
        )
        .with_probe(client.clone());
        let submitter = ReportSubmitter::new(store.clone(), store.clone(), client);

        Self {
            store,
            workflow,
            tracker,
            submitter,
        }
    }
}

/// App wiring shared by in-process and socket-level tests.
fn app_config(ctx: &TestContext) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
    let reports: Arc<dyn ReportStore> = ctx.store.clone();
    let profiles: Arc<dyn ProfileStore> = ctx.store.clone();
    let reports = web::Data::from(reports);
    let profiles = web::Data::from(profiles);
    let tracker = web::Data::new(ctx.tracker.clone());
    let submitter = web::Data::new(ctx.submitter.clone());
    let verifier = web::Data::new(SessionVerifier::new(&SessionSettings {
        secret: SecretString::from(TEST_SESSION_SECRET),
        audience: TEST_AUDIENCE.to_string(),
    }));
    let webhook_secret = web::Data::new(WebhookSecret::new(SecretString::from(
        TEST_WEBHOOK_SECRET,
    )));

    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(reports.clone())
            .app_data(profiles.clone())
            .app_data(tracker.clone())
            .app_data(submitter.clone())
            .app_data(verifier.clone())
            .app_data(webhook_secret.clone())
            .service(
                web::scope("/api/v1").configure(competitor_report_lib::api::configure_api_routes),
            );
    }
}

/// Create a test app wired like the server binary.
pub async fn create_test_app(
    ctx: &TestContext,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    test::init_service(App::new().configure(app_config(ctx))).await
}

/// Serve the test app on an ephemeral port and return its address.
pub fn start_test_server(ctx: &TestContext) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let addr = listener.local_addr().unwrap();

    let config = app_config(ctx);
    let server = HttpServer::new(move || App::new().configure(config.clone()))
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

    tokio::spawn(server);
    addr
}

/// Mint a session token for `user_id`.
pub fn session_token(user_id: &str, email: Option<&str>) -> String {
    let mut claims = json!({
        "sub": user_id,
        "aud": TEST_AUDIENCE,
        "exp": Utc::now().timestamp() + 3600,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SESSION_SECRET.as_bytes()),
    )
    .expect("failed to encode JWT")
}

/// Token for a user with an email claim derived from the id.
pub fn user_token(user_id: &str) -> String {
    session_token(user_id, Some(&format!("{}@example.com", user_id)))
}

async fn send<S>(app: &S, req: actix_http::Request) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get_json<S>(app: &S, uri: &str, token: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    send(app, req).await
}

pub async fn send_json<S>(
    app: &S,
    req: test::TestRequest,
    token: &str,
    body: Value,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = req
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(body)
        .to_request();
    send(app, req).await
}

/// Submit a report for `linkedin_url`.
pub async fn submit_report<S>(app: &S, token: &str, linkedin_url: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    send_json(
        app,
        test::TestRequest::post().uri("/api/v1/reports"),
        token,
        json!({ "linkedin_url": linkedin_url }),
    )
    .await
}

/// Post a workflow callback with the given secret header.
pub async fn post_callback<S>(
    app: &S,
    report_id: &str,
    secret: Option<&str>,
    body: Value,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::post().uri(&format!("/api/v1/reports/{}/callback", report_id));
    if let Some(secret) = secret {
        req = req.insert_header(("X-Webhook-Secret", secret));
    }
    send(app, req.set_json(body).to_request()).await
}
