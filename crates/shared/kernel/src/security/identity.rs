//! Bearer-token identity and the `CurrentUser` / `Authenticated` extractors.

use super::access::CurrentUser;
use crate::database::models::Id;
use crate::domain::config::JwtConfig;
use crate::server::{ApiError, ApiState};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[expdj_derive::expdj_error]
pub enum IdentityError {
    #[http(status = 401)]
    #[error("Invalid token{}: {source}", format_context(.context))]
    Token { source: jsonwebtoken::errors::Error, context: Option<Cow<'static, str>> },

    #[http(status = 401)]
    #[error("Invalid credentials{}: {message}", format_context(.context))]
    Credentials { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Registered claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    /// # Errors
    /// [`IdentityError::Credentials`] when `sub` is not a user id.
    pub fn user_id(&self) -> Result<Id, IdentityError> {
        self.sub.parse().map_err(|_| IdentityError::Credentials {
            message: format!("subject '{}' is not a user id", self.sub).into(),
            context: None,
        })
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct Identity {
    keys: Arc<Keys>,
    validation: Validation,
    issuer: String,
    ttl_seconds: u64,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl Identity {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = config.clock_skew_seconds;

        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            validation,
            issuer: config.issuer.clone(),
            ttl_seconds: config.ttl_seconds,
        }
    }

    /// # Errors
    /// [`IdentityError::Token`] if signing fails.
    pub fn issue(&self, user: Id) -> Result<String, IdentityError> {
        let iat = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: user.to_string(),
            iss: self.issuer.clone(),
            iat,
            exp: iat + self.ttl_seconds,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)?)
    }

    /// # Errors
    /// [`IdentityError::Token`] for a bad signature, wrong issuer, or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        Ok(decode::<Claims>(token, &self.keys.decoding, &self.validation)?.claims)
    }
}

/// Resolves the bearer token, if any, to a stored user.
///
/// No `Authorization` header yields an anonymous user. A malformed or invalid token,
/// or one naming an unknown user, is rejected with 401.
impl FromRequestParts<ApiState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self::anonymous());
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("expected a Bearer token"))?;

        let id = state.identity.verify(token.trim())?.user_id()?;
        let user = state
            .database
            .user(id)
            .await?
            .ok_or_else(|| ApiError::unauthorized(format!("unknown user {id}")))?;

        debug!(user = id, superuser = user.is_superuser, "Request authenticated");
        Ok(user.into())
    }
}

/// A logged-in user. Anonymous requests are rejected with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub CurrentUser);

impl FromRequestParts<ApiState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_anonymous() {
            return Err(ApiError::unauthorized("login required"));
        }
        Ok(Self(user))
    }
}
