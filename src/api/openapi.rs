//! OpenAPI documentation configuration.

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

use crate::config::WEBHOOK_SECRET_HEADER;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Competitor Report Server",
        version = "0.1.0",
        description = "Request competitor LinkedIn engagement reports and follow them until the spreadsheet is ready"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Report endpoints
        api::reports::submit_report,
        api::reports::list_reports,
        api::reports::get_report,
        api::reports::report_callback,
        // Profile endpoints
        api::profile::get_profile,
        api::profile::update_profile,
        api::profile::complete_onboarding,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            models::ReportStatus,
            models::SubmitReportRequest,
            models::ReportResponse,
            models::ReportListResponse,
            models::ListReportsQuery,
            models::ReportCallbackRequest,
            models::ProfileResponse,
            models::UpdateProfileRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Reports", description = "Report submission and lookup"),
        (name = "Profile", description = "User profile and onboarding"),
        (name = "Workflow", description = "Callbacks from the report workflow")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Register the session bearer token and the webhook secret header.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "webhook_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(WEBHOOK_SECRET_HEADER))),
            );
        }
    }
}
