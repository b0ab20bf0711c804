use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, session};
use crate::error::ApiError;

/// Verifies the session token on a request and yields the authenticated user
/// id. Every mutating and own-profile handler takes this extractor; routes
/// without it are public.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = session::token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Auth("no token provided".into()))?;

        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Auth("invalid or expired token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}
