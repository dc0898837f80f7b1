// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{extract::State, Json};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiError, AppState, AuthUser};
use crate::models::NewUserDevice;
use crate::schema::user_devices;

#[derive(Debug, Deserialize)]
pub struct SavePlayerRequest {
    pub player_id: String,
}

/// Register a push-notification device for the authenticated user.
pub async fn save_player_id(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SavePlayerRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.player_id.is_empty() {
        return Err(ApiError::BadRequest("player_id is required".to_string()));
    }

    let mut conn = state.conn().await?;

    diesel::insert_into(user_devices::table)
        .values(&NewUserDevice {
            user_id,
            player_id: req.player_id,
        })
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "PlayerId saved" })))
}
