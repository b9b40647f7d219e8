//! Signed session tokens and the extractors that read them.
//!
//! A session is an HS256 JWT carried either as `Authorization: Bearer <token>`
//! or in the `session` cookie. Handlers take [`Session`] when a caller must be
//! signed in and [`MaybeSession`] when guests are allowed.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use common::{CourierId, Role, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing session")]
    Missing,

    #[error("Session expired")]
    Expired,

    #[error("Invalid session")]
    Invalid,

    #[error("Failed to issue session: {0}")]
    Issue(jsonwebtoken::errors::Error),
}

/// JWT claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub name: String,
    pub role: Role,
    /// Issued at (Unix timestamp seconds)
    pub iat: i64,
    /// Expiration (Unix timestamp seconds)
    pub exp: i64,
}

/// The verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            name: name.into(),
            role,
        }
    }

    /// Fails with `Forbidden` unless the session holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<&Self, ApiError> {
        if allowed.contains(&self.role) {
            Ok(self)
        } else {
            tracing::debug!(user_id = %self.user_id, role = %self.role, "role not allowed");
            Err(ApiError::forbidden())
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The courier identity, for courier sessions.
    pub fn courier_id(&self) -> Option<CourierId> {
        (self.role == Role::Courier).then(|| CourierId::from(self.user_id))
    }
}

impl TryFrom<Claims> for Session {
    type Error = SessionError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id: i64 = claims.sub.parse().map_err(|_| SessionError::Invalid)?;
        Ok(Session::new(UserId::new(id), claims.name, claims.role))
    }
}

/// Signing and verification keys plus the lifetime of issued sessions.
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<KeysInner>,
}

struct KeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            inner: Arc::new(KeysInner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
                ttl,
            }),
        }
    }

    /// Signs a token for `session`.
    pub fn issue(&self, session: &Session) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: session.user_id.to_string(),
            name: session.name.clone(),
            role: session.role,
            iat: now.timestamp(),
            exp: (now + self.inner.ttl).timestamp(),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )
        .map_err(SessionError::Issue)
    }

    /// Verifies a token and returns the session it carries.
    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.inner.decoding,
            &self.inner.validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => {
                tracing::debug!("session validation failed: {e}");
                SessionError::Invalid
            }
        })?;

        Session::try_from(data.claims)
    }
}

/// Reads the token from the `Authorization` header, then the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

impl<S> FromRequestParts<S> for Session
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let token = token_from_headers(&parts.headers).ok_or(SessionError::Missing)?;
        let session = SessionKeys::from_ref(state).verify(token)?;
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

/// A session that may be absent. A present but invalid token still fails.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeSession
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if token_from_headers(&parts.headers).is_none() {
            return Ok(MaybeSession(None));
        }
        Session::from_request_parts(parts, state)
            .await
            .map(|session| MaybeSession(Some(session)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", Duration::hours(1))
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let session = Session::new(UserId::new(7), "Pedro Paz", Role::Courier);

        let token = keys.issue(&session).unwrap();
        let verified = keys.verify(&token).unwrap();

        assert_eq!(verified, session);
        assert_eq!(verified.courier_id(), Some(CourierId::new(7)));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = SessionKeys::new("another-secret", Duration::hours(1));
        let token = other
            .issue(&Session::new(UserId::new(1), "Ana", Role::Admin))
            .unwrap();

        assert!(matches!(keys().verify(&token), Err(SessionError::Invalid)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let stale = SessionKeys::new("test-secret", Duration::hours(-1));
        let token = stale
            .issue(&Session::new(UserId::new(1), "Ana", Role::Admin))
            .unwrap();

        assert!(matches!(keys().verify(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn require_role_checks_membership() {
        let session = Session::new(UserId::new(5), "Luisa", Role::Customer);
        assert!(session.require_role(&[Role::Customer]).is_ok());
        assert!(session.require_role(&[Role::Admin, Role::Courier]).is_err());
        assert_eq!(session.courier_id(), None);
    }

    #[test]
    fn token_read_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=abc.def"));
        assert_eq!(token_from_headers(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers), Some("xyz"));
    }
}
