// ABOUTME: JWT-based caller authentication for the engine's HTTP surface
// ABOUTME: Issues and validates HS256 bearer tokens carrying the user identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Caller Authentication
//!
//! Every engine endpoint (except the provider callback and health check)
//! requires a verifiable caller identity: an HS256 JWT bearer token whose
//! `sub` claim is the user id. `/oauth/start` also accepts the token as a
//! `token` query parameter because browser redirects cannot carry headers.

use crate::errors::{EngineError, EngineResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default session lifetime
const SESSION_EXPIRY_HOURS: i64 = 24;

/// JWT claims for caller authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Issues and validates caller bearer tokens
#[derive(Clone)]
pub struct AuthManager {
    secret: Vec<u8>,
}

impl AuthManager {
    #[must_use]
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Issue a token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn generate_token(&self, user_id: Uuid, email: &str) -> EngineResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(SESSION_EXPIRY_HOURS)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| EngineError::Internal(format!("token generation: {e}")))
    }

    /// Validate a bearer token and return the caller's user id.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for expired, malformed, or badly signed
    /// tokens.
    pub fn validate_token(&self, token: &str) -> EngineResult<Uuid> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| EngineError::Unauthenticated(format!("invalid bearer token: {e}")))?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| EngineError::Unauthenticated("token subject is not a user id".to_owned()))
    }

    /// Authenticate from request headers (`Authorization: Bearer ...`).
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when the header is missing, malformed,
    /// or carries an invalid token.
    pub fn authenticate(&self, headers: &axum::http::HeaderMap) -> EngineResult<Uuid> {
        let header = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| EngineError::Unauthenticated("missing authorization header".to_owned()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            EngineError::Unauthenticated("authorization header is not a bearer token".to_owned())
        })?;

        self.validate_token(token)
    }

    /// Authenticate from headers, falling back to a `token` query
    /// parameter (the redirect-initiating endpoint).
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when neither credential is valid.
    pub fn authenticate_with_query(
        &self,
        headers: &axum::http::HeaderMap,
        token_param: Option<&str>,
    ) -> EngineResult<Uuid> {
        match self.authenticate(headers) {
            Ok(user_id) => Ok(user_id),
            Err(header_err) => match token_param {
                Some(token) => self.validate_token(token),
                None => Err(header_err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn manager() -> AuthManager {
        AuthManager::new(b"test-secret-key-for-unit-tests".to_vec())
    }

    #[test]
    fn issued_tokens_validate_back_to_the_user() {
        let auth = manager();
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id, "user@example.com").unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), user_id);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = manager()
            .generate_token(Uuid::new_v4(), "user@example.com")
            .unwrap();
        let other = AuthManager::new(b"a-different-secret".to_vec());
        assert!(matches!(
            other.validate_token(&token),
            Err(EngineError::Unauthenticated(_))
        ));
    }

    #[test]
    fn bearer_header_authenticates() {
        let auth = manager();
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id, "user@example.com").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        assert_eq!(auth.authenticate(&headers).unwrap(), user_id);
    }

    #[test]
    fn missing_header_falls_back_to_query_token() {
        let auth = manager();
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id, "user@example.com").unwrap();

        let headers = HeaderMap::new();
        assert!(auth.authenticate(&headers).is_err());
        assert_eq!(
            auth.authenticate_with_query(&headers, Some(&token)).unwrap(),
            user_id
        );
    }
}
