//! Actix-web extractors for session and webhook authentication.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use serde::Deserialize;

use super::{SessionUser, SessionVerifier, WebhookSecret};
use crate::config::WEBHOOK_SECRET_HEADER;
use crate::error::ErrorResponse;

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: String,
}

/// Session token from `Authorization: Bearer`, or from the `access_token`
/// query parameter for WebSocket upgrades where browsers cannot set headers.
fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        web::Query::<TokenQuery>::from_query(req.query_string())
            .ok()
            .map(|q| q.into_inner().access_token)
            .filter(|t| !t.is_empty())
    })
}

/// Extractor that requires a valid session.
///
/// ```ignore
/// async fn handler(auth: SessionAuth) -> impl Responder {
///     // auth.user.id is the session subject
/// }
/// ```
pub struct SessionAuth {
    pub user: SessionUser,
}

impl FromRequest for SessionAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(verifier) = req.app_data::<web::Data<SessionVerifier>>() else {
            return ready(Err(AuthError::new("Internal configuration error")));
        };

        let Some(token) = session_token(req) else {
            return ready(Err(AuthError::new(
                "Missing session token. Provide Authorization: Bearer <token>.",
            )));
        };

        ready(verifier.verify(&token).map(|user| SessionAuth { user }))
    }
}

/// Extractor that requires the workflow's callback secret in
/// `X-Webhook-Secret`.
pub struct WebhookAuth;

impl FromRequest for WebhookAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(secret) = req.app_data::<web::Data<WebhookSecret>>() else {
            return ready(Err(AuthError::new("Internal configuration error")));
        };

        let provided = req
            .headers()
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        match provided {
            Some(value) if secret.verify(value) => ready(Ok(WebhookAuth)),
            Some(_) => ready(Err(AuthError::new("Invalid webhook secret"))),
            None => ready(Err(AuthError::new(format!(
                "Missing webhook secret. Provide {} header.",
                WEBHOOK_SECRET_HEADER
            )))),
        }
    }
}
