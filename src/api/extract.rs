// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::auth;

use super::error::ApiError;

/// The authenticated user id, extracted from the `Authorization: Bearer`
/// header. Rejects the request with 401 when the token is missing or bad.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i32);

fn bearer_user_id(parts: &Parts) -> Result<i32, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization format".to_string()))?;

    auth::validate_token(token)
        .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_user_id(parts).map(AuthUser)
    }
}

/// Like [`AuthUser`] but never rejects; requests without a valid token
/// proceed as guests.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<i32>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(bearer_user_id(parts).ok()))
    }
}

/// The authorization predicate applied before every mutation of an owned
/// resource: only the owning user may proceed.
pub fn ensure_owner(owner_id: i32, user_id: i32, resource: &str) -> Result<(), ApiError> {
    if owner_id != user_id {
        return Err(ApiError::Forbidden(format!("Not your {}", resource)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_may_mutate() {
        assert!(ensure_owner(3, 3, "story").is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let err = ensure_owner(3, 4, "story").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
