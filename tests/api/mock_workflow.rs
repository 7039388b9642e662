//! Mock workflow engine for API tests.
//!
//! Starts an in-process HTTP server that records job triggers and answers
//! status checks with whatever the test scripted.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::{App, HttpResponse, HttpServer, get, post, web};
use serde_json::Value;

#[derive(Default)]
pub struct MockWorkflowState {
    pub triggers: Vec<Value>,
    pub fail_triggers: bool,
    /// Status bodies keyed by report id.
    pub statuses: HashMap<String, Value>,
    pub status_checks: usize,
}

type SharedState = Arc<Mutex<MockWorkflowState>>;

#[post("/webhook")]
async fn webhook(state: web::Data<SharedState>, body: web::Json<Value>) -> HttpResponse {
    let mut state = state.lock().unwrap();
    state.triggers.push(body.into_inner());
    if state.fail_triggers {
        HttpResponse::InternalServerError().body("workflow unavailable")
    } else {
        HttpResponse::Ok().json(serde_json::json!({"message": "Workflow was started"}))
    }
}

#[get("/results")]
async fn results(
    state: web::Data<SharedState>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let mut state = state.lock().unwrap();
    state.status_checks += 1;
    match query.get("report_id").and_then(|id| state.statuses.get(id)) {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().finish(),
    }
}

pub struct MockWorkflow {
    pub base_url: String,
    pub state: SharedState,
}

impl MockWorkflow {
    /// Start the mock on an ephemeral port.
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(MockWorkflowState::default()));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();

        let state_data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state_data.clone()))
                .service(webhook)
                .service(results)
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        tokio::spawn(server);

        MockWorkflow {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.base_url)
    }

    pub fn results_url(&self) -> String {
        format!("{}/results", self.base_url)
    }

    pub fn fail_triggers(&self) {
        self.state.lock().unwrap().fail_triggers = true;
    }

    pub fn triggers(&self) -> Vec<Value> {
        self.state.lock().unwrap().triggers.clone()
    }

    pub fn set_status(&self, report_id: &str, status: Value) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(report_id.to_string(), status);
    }

    pub fn status_checks(&self) -> usize {
        self.state.lock().unwrap().status_checks
    }
}
