//! Authentication: session tokens for users, a shared secret for the workflow.

mod extractor;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::config::SessionSettings;

pub use extractor::{AuthError, SessionAuth, WebhookAuth};

/// The signed-in user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// Session subject; owner id for reports and profile id.
    pub id: String,
    pub email: Option<String>,
}

/// Claims read from a session token.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies HS256 session tokens issued by the hosted auth provider.
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(settings: &SessionSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[settings.audience.as_str()]);

        Self {
            key: DecodingKey::from_secret(settings.secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Check signature, expiry and audience, returning the session user.
    pub fn verify(&self, token: &str) -> Result<SessionUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!("Session token rejected: {}", e);
            AuthError::new("Invalid or expired session token")
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::new("Session token has no subject"));
        }

        Ok(SessionUser {
            id: data.claims.sub,
            email: data.claims.email.filter(|e| !e.trim().is_empty()),
        })
    }
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionVerifier([REDACTED])")
    }
}

/// Shared secret the workflow presents on completion callbacks.
///
/// Compared in constant time; `Debug` never prints the value.
#[derive(Clone)]
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: SecretString) -> Self {
        Self(secret)
    }

    pub fn verify(&self, provided: &str) -> bool {
        let expected = self.0.expose_secret();
        if expected.is_empty() {
            return false;
        }
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookSecret([REDACTED])")
    }
}
