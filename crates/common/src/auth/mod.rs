//! Authentication utilities
//!
//! Provides:
//! - JWT token generation and validation
//! - Bearer token extraction
//! - Submitter context extraction for handlers

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated submitter
    pub user_id: Uuid,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    #[serde(alias = "userId")]
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user_id: Uuid) -> Result<String> {
        self.generate_token_with_lifetime(user_id, self.expiration_secs)
    }

    fn generate_token_with_lifetime(&self, user_id: Uuid, lifetime_secs: i64) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token. Expired, malformed and
    /// wrongly-signed tokens are all reported as `InvalidToken`.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::InvalidToken
            })
    }

    /// Resolve the submitter behind a token
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        self.validate_token(token)?.user_id()
    }
}

/// Extract the token from a `Bearer` Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the submitter from request headers
pub fn verify_bearer(headers: &HeaderMap, jwt: &JwtManager) -> Result<Uuid> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .ok_or_else(|| AppError::Unauthorized {
            message: "No token provided".to_string(),
        })?;

    jwt.verify(token)
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let jwt = Arc::<JwtManager>::from_ref(state);
        let user_id = verify_bearer(&parts.headers, &jwt)?;

        Ok(AuthContext { user_id, request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let user_id = Uuid::new_v4();

        let token = manager.generate_token(user_id).unwrap();
        assert_eq!(manager.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let manager = JwtManager::new("test_secret", 3600);
        let token = manager
            .generate_token_with_lifetime(Uuid::new_v4(), -3600)
            .unwrap();
        assert!(matches!(manager.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = JwtManager::new("one", 3600);
        let verifier = JwtManager::new("two", 3600);
        let token = issuer.generate_token(Uuid::new_v4()).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_missing_header() {
        let manager = JwtManager::new("s", 60);
        let err = verify_bearer(&HeaderMap::new(), &manager).unwrap_err();
        assert_eq!(err.to_string(), "No token provided");

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer garbage"));
        assert!(matches!(
            verify_bearer(&headers, &manager),
            Err(AppError::InvalidToken)
        ));
    }
}
