//! Caller identity and bearer-token verification.
//!
//! Token issuance happens upstream; this service only verifies. A request
//! carries `Authorization: Bearer <jwt>`, the token's `sub` claim is the
//! caller's id, and every mutating operation receives that identity as an
//! explicit argument.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::AppState;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identity as a UUID string.
    pub sub: String,
    /// Expiry, seconds since the unix epoch.
    pub exp: usize,
}

/// Identity of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Decodes and validates access tokens against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and extract the caller identity from its `sub` claim.
    pub fn verify(&self, token: &str) -> Result<CallerId, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| ApiError::Unauthorized(format!("invalid bearer token: {e}")))?;
        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("token subject is not a valid id".to_string()))?;
        Ok(CallerId(id))
    }
}

/// Ownership gate for mutating operations.
///
/// Pure comparison; performs no I/O and never consults the stores.
pub fn authorize(caller: CallerId, owner_id: Uuid) -> Result<(), ApiError> {
    if caller.0 == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "caller does not own this book".to_string(),
        ))
    }
}

impl FromRequestParts<AppState> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("authorization header is not a bearer token".to_string())
        })?;
        state.verifier.verify(token.trim())
    }
}
