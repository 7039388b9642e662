//! Competitor report server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, http::header, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use competitor_report_lib::api::{self, ApiDoc};
use competitor_report_lib::auth::{SessionVerifier, WebhookSecret};
use competitor_report_lib::config::Config;
use competitor_report_lib::db::Stores;
use competitor_report_lib::middleware::RequestLogger;
use competitor_report_lib::services::{ReportSubmitter, ReportTracker, WorkflowClient};

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let static_dir = req
        .app_data::<web::Data<PathBuf>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Static files not configured"))?;
    Ok(NamedFile::open(static_dir.join("index.html"))?)
}

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,sea_orm=warn"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, CRS_SESSION_SECRET, CRS_WEBHOOK_URL and CRS_WEBHOOK_SECRET must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Competitor Report Server");
    info!("  Environment: {}", config.environment);
    info!("  Store: {}", config.database.backend);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let stores = match Stores::open(&config).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("Failed to open report store: {}", e);
            std::process::exit(1);
        }
    };

    let workflow = match WorkflowClient::new(&config.workflow) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build workflow client: {}", e);
            std::process::exit(1);
        }
    };

    let mut tracker = ReportTracker::new(stores.reports.clone(), config.tracker);
    if workflow.has_status_endpoint() {
        tracker = tracker.with_probe(workflow.clone());
    }
    info!(
        "Report tracking: poll every {}s, give up after {}s",
        config.tracker.poll_interval.as_secs(),
        config.tracker.deadline.as_secs()
    );

    let submitter = ReportSubmitter::new(stores.reports.clone(), stores.profiles.clone(), workflow);

    // Shared state
    let report_store = web::Data::from(stores.reports.clone());
    let profile_store = web::Data::from(stores.profiles.clone());
    let tracker = web::Data::new(tracker);
    let submitter = web::Data::new(submitter);
    let verifier = web::Data::new(SessionVerifier::new(&config.session));
    let webhook_secret = web::Data::new(WebhookSecret::new(
        config.workflow.callback_secret.clone(),
    ));

    let bind_address = config.bind_address();
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();

    if static_dir.is_some() {
        info!("Static file serving enabled from {:?}", static_dir);
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let server = HttpServer::new(move || {
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        } else {
            // Same-origin only in production
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        };

        let mut app = App::new()
            // Last wrap is outermost, so the logger also sees CORS rejections
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(report_store.clone())
            .app_data(profile_store.clone())
            .app_data(tracker.clone())
            .app_data(submitter.clone())
            .app_data(verifier.clone())
            .app_data(webhook_secret.clone())
            .service(web::scope("/api/v1").configure(api::configure_api_routes))
            .service(
                SwaggerUi::new("/api/docs/{_:.*}")
                    .url("/api/docs/openapi.json", ApiDoc::openapi()),
            );

        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(dir.clone()))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .service(Files::new("/favicon", dir.clone()).index_file("favicon.ico"))
                // SPA fallback - serve index.html for all other routes
                .default_service(web::route().to(spa_fallback));
        }

        app
    });

    server.workers(worker_count).bind(&bind_address)?.run().await
}
