//! Bearer-token authentication.
//!
//! # Responsibilities
//! - Skip verification for the configured allow-list (health, login,
//!   registration)
//! - Verify HS256 tokens against the shared secret
//! - Attach decoded claims to the request for downstream identity headers
//!
//! Token issuance lives in the user service; the gateway only verifies.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::http::response::error_response;
use crate::http::server::AppState;

/// Claims carried by a campus token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: String,
    /// Expiry, seconds since epoch.
    pub exp: u64,
    /// Issued-at, seconds since epoch.
    #[serde(default)]
    pub iat: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn extract_bearer<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Verify a token against the shared secret. Expiry is enforced by the
/// decoder; any decode failure collapses to `AuthInvalid`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, GatewayError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| GatewayError::AuthInvalid)
}

/// Middleware entry: authentication with a public-path allow-list.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth = &state.ctx.config.auth;
    if !auth.enabled {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if auth.public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return next.run(request).await;
    }

    let token = match extract_bearer(&request) {
        Some(token) => token,
        None => {
            tracing::debug!(path = %path, "request without bearer token");
            return error_response(&GatewayError::AuthMissing, None);
        }
    };

    match verify_token(token, &auth.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(path = %path, "token rejected");
            error_response(&err, None)
        }
    }
}
