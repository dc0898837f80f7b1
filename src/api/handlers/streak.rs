// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{json, Value};

use crate::api::{ApiError, AppState, AuthUser};
use crate::schema::profiles;
use crate::streak;

/// Register activity for the authenticated user and report the streak.
pub async fn update_streak(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let status = streak::update_streak(&mut conn, user_id)
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => ApiError::NotFound("Profile not found".to_string()),
            e => e.into(),
        })?;

    Ok(Json(json!({
        "streak_count": status.streak_count,
        "last_active": status.last_active,
        "rewarded": status.rewarded,
    })))
}

/// The authenticated user's current streak.
pub async fn get_streak(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let (streak_count, last_active, rewarded) = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select((
            profiles::streak_count,
            profiles::last_active_at,
            profiles::streak_rewarded,
        ))
        .first::<(i32, Option<chrono::NaiveDateTime>, bool)>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(json!({
        "streak_count": streak_count,
        "last_active": last_active,
        "rewarded": rewarded,
    })))
}

/// A user's streak by id. A missing profile reports a zero streak rather
/// than an error.
pub async fn get_user_streak(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let row = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select((
            profiles::streak_count,
            profiles::last_active_at,
            profiles::streak_rewarded,
        ))
        .first::<(i32, Option<chrono::NaiveDateTime>, bool)>(&mut conn)
        .await
        .optional()?;

    match row {
        Some((streak_count, last_active, rewarded)) => Ok(Json(json!({
            "streak_count": streak_count,
            "last_active": last_active,
            "rewarded": rewarded,
        }))),
        None => Ok(Json(json!({ "streak_count": 0 }))),
    }
}
