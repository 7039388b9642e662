//! Profile API handlers.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::{SessionAuth, SessionUser};
use crate::db::ProfileStore;
use crate::error::{AppError, AppResult};
use crate::models::{Profile, ProfilePatch, ProfileResponse, UpdateProfileRequest};

/// Load the caller's profile, creating it from the session on first access.
async fn load_profile(store: &dyn ProfileStore, user: &SessionUser) -> AppResult<Profile> {
    if let Some(profile) = store.get_profile(&user.id).await? {
        return Ok(profile);
    }

    let email = user.email.as_deref().ok_or_else(|| {
        AppError::NotFound("Profile (session has no email to create one)".to_string())
    })?;

    let profile = store.get_or_create_profile(&user.id, email).await?;
    info!(user_id = %user.id, "Profile created");
    Ok(profile)
}

/// Get the caller's profile.
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(
        ("session" = [])
    )
)]
pub async fn get_profile(
    auth: SessionAuth,
    store: web::Data<dyn ProfileStore>,
) -> AppResult<HttpResponse> {
    let profile = load_profile(store.get_ref(), &auth.user).await?;
    Ok(HttpResponse::Ok().json(ProfileResponse::from(profile)))
}

/// Update the caller's name.
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(
        ("session" = [])
    )
)]
pub async fn update_profile(
    auth: SessionAuth,
    store: web::Data<dyn ProfileStore>,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let profile = load_profile(store.get_ref(), &auth.user).await?;
    let updated = store
        .update_profile(&profile.id, ProfilePatch::from(body.into_inner()))
        .await?;

    Ok(HttpResponse::Ok().json(ProfileResponse::from(updated)))
}

/// Finish onboarding, optionally setting the caller's name.
#[utoipa::path(
    post,
    path = "/api/v1/profile/onboarding",
    tag = "Profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Onboarding completed", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(
        ("session" = [])
    )
)]
pub async fn complete_onboarding(
    auth: SessionAuth,
    store: web::Data<dyn ProfileStore>,
    body: Option<web::Json<UpdateProfileRequest>>,
) -> AppResult<HttpResponse> {
    let profile = load_profile(store.get_ref(), &auth.user).await?;

    let mut patch = body
        .map(|b| ProfilePatch::from(b.into_inner()))
        .unwrap_or_default();
    patch.has_completed_onboarding = Some(true);

    let updated = store.update_profile(&profile.id, patch).await?;
    info!(user_id = %updated.id, "Onboarding completed");

    Ok(HttpResponse::Ok().json(ProfileResponse::from(updated)))
}

/// Configure profile routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/profile")
            .route(web::get().to(get_profile))
            .route(web::put().to(update_profile)),
    )
    .service(web::resource("/profile/onboarding").route(web::post().to(complete_onboarding)));
}
