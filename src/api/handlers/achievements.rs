// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::achievements;
use crate::api::{ApiError, AppState, AuthUser};
use crate::models::{Achievement, NewAchievement};
use crate::schema::achievements as achievements_table;

#[derive(Debug, Deserialize)]
pub struct CreateAchievementRequest {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub condition: Option<serde_json::Value>,
}

/// A user's achievements, one entry per defined achievement. Missing rows
/// come back synthesized at zero progress.
pub async fn get_user_achievements(
    State(state): State<AppState>,
    AuthUser(_viewer): AuthUser,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let views = achievements::list_for_user(&mut conn, user_id).await?;

    Ok(Json(json!({ "achievements": views })))
}

/// Define a new achievement. Duplicate keys are a conflict.
pub async fn create_achievement(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<CreateAchievementRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if req.key.is_empty() || req.title.is_empty() {
        return Err(ApiError::BadRequest(
            "Key and title are required".to_string(),
        ));
    }

    let mut conn = state.conn().await?;

    let achievement: Achievement = diesel::insert_into(achievements_table::table)
        .values(&NewAchievement {
            key: req.key,
            title: req.title,
            description: req.description,
            icon_url: req.icon,
            condition: req.condition,
        })
        .get_result(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("Achievement already exists".to_string()),
            e => e.into(),
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "achievement": achievement }))))
}
