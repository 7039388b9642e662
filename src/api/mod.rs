//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod profile;
pub mod reports;
pub mod websocket;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use profile::configure_routes as configure_profile_routes;
pub use reports::configure_routes as configure_report_routes;
pub use websocket::configure_routes as configure_websocket_routes;

use actix_web::web;

/// Register every `/api/v1` route.
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_report_routes)
        .configure(configure_websocket_routes)
        .configure(configure_profile_routes);
}
