//! Bearer-token authentication for the management API.
//!
//! Tokens are HS256 JWTs signed with the configured secret. The `sub` claim
//! is the user ID every management operation is scoped to.

use crate::errors::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use lum_relay_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// The authenticated caller, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

/// Verifies bearer tokens
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not required
        validation.set_required_spec_claims(&["sub"]);
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode and check a token, returning the user it was issued to
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for any malformed, expired or
    /// wrongly signed token, or one whose subject is not a valid user ID.
    pub fn verify(&self, token: &str) -> Result<UserId, ApiError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            warn!(error = %e, "Token validation failed");
            ApiError::Unauthorized
        })?;

        UserId::new(data.claims.sub).map_err(|e| {
            warn!(error = %e, "Token subject is not a valid user ID");
            ApiError::Unauthorized
        })
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware for the management routes
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or_else(|| {
        debug!(path = %request.uri().path(), "Missing bearer token");
        ApiError::Unauthorized
    })?;

    let user_id = state.auth.verify(token)?;

    debug!(user_id = %user_id, "Authenticated request");
    request
        .extensions_mut()
        .insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
