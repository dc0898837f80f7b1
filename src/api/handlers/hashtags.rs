// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiError, AppState, AuthUser};
use crate::models::{Hashtag, NewHashtag, Profile, Story, StoryDetail, User};
use crate::schema::{hashtags, profiles, stories, story_hashtags, users};

#[derive(Debug, Deserialize)]
pub struct CreateHashtagRequest {
    pub name: String,
}

/// All hashtags, alphabetical.
pub async fn get_hashtags(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let tags: Vec<Hashtag> = hashtags::table
        .select(Hashtag::as_select())
        .order(hashtags::name.asc())
        .load(&mut conn)
        .await?;

    Ok(Json(json!({
        "count": tags.len(),
        "hashtags": tags,
    })))
}

/// Create a hashtag. Duplicate names are a conflict.
pub async fn create_hashtag(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<CreateHashtagRequest>,
) -> Result<(StatusCode, Json<Hashtag>), ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let mut conn = state.conn().await?;

    let hashtag: Hashtag = diesel::insert_into(hashtags::table)
        .values(&NewHashtag { name: req.name })
        .get_result(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("Hashtag already exists".to_string()),
            e => e.into(),
        })?;

    Ok((StatusCode::CREATED, Json(hashtag)))
}

/// Stories tagged with a hashtag, newest first.
pub async fn get_hashtag_stories(
    State(state): State<AppState>,
    Path(hashtag_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let hashtag: Hashtag = hashtags::table
        .filter(hashtags::id.eq(hashtag_id))
        .select(Hashtag::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Hashtag not found".to_string()))?;

    let rows: Vec<(Story, User, Profile)> = story_hashtags::table
        .filter(story_hashtags::hashtag_id.eq(hashtag_id))
        .inner_join(stories::table.inner_join(users::table.inner_join(profiles::table)))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .order(stories::created_at.desc())
        .load(&mut conn)
        .await?;

    let details: Vec<StoryDetail> = rows
        .into_iter()
        .map(|(story, user, profile)| StoryDetail::new(story, user, profile))
        .collect();

    Ok(Json(json!({
        "hashtag": hashtag,
        "count": details.len(),
        "stories": details,
    })))
}

/// Delete a hashtag and its story links in one transaction.
pub async fn delete_hashtag(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(hashtag_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let hashtag: Hashtag = hashtags::table
        .filter(hashtags::id.eq(hashtag_id))
        .select(Hashtag::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Hashtag with this ID not found".to_string()))?;

    conn.transaction::<(), ApiError, _>(|conn| {
        async move {
            diesel::delete(
                story_hashtags::table.filter(story_hashtags::hashtag_id.eq(hashtag_id)),
            )
            .execute(conn)
            .await?;
            diesel::delete(hashtags::table.filter(hashtags::id.eq(hashtag_id)))
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(Json(json!({
        "message": "Hashtag deleted successfully",
        "id": hashtag.id,
        "name": hashtag.name,
    })))
}
