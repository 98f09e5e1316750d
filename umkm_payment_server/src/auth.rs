//! Access tokens.
//!
//! Tokens are issued elsewhere (by the marketplace's login service) and are HS256-signed JWTs carrying the user id in
//! `sub` and the user's role in `role`. This server only verifies them.
use std::{
    future::{ready, Ready},
    time::Duration,
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use umkm_payment_engine::db_types::Role;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: i64,
    pub role: Role,
    /// Expiry, as a unix timestamp
    pub exp: u64,
}

impl JwtClaims {
    pub fn new(user_id: i64, role: Role, valid_for: Duration) -> Self {
        let exp = chrono::Utc::now().timestamp().max(0) as u64 + valid_for.as_secs();
        Self { sub: user_id, role, exp }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Handlers take `JwtClaims` as an argument to get at the authenticated user. The claims are placed in the request
/// extensions by the JWT middleware, so the extractor fails for routes that are not behind it.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req
            .extensions()
            .get::<JwtClaims>()
            .cloned()
            .ok_or(ServerError::AuthenticationError(AuthError::MissingToken));
        ready(claims)
    }
}

/// Verifies access tokens against the configured HS256 secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { key, validation: Validation::new(Algorithm::HS256) }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("🔐️ Access token was rejected. {e}");
            AuthError::ValidationError(e.to_string())
        })?;
        Ok(data.claims)
    }
}

/// Signs access tokens. The server never hands these out; this exists for tooling and tests that need a valid token.
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
