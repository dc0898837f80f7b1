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

use crate::api::{ensure_owner, ApiError, AppState, AuthUser};
use crate::models::{Comment, CommentDetail, NewComment, Profile, User};
use crate::schema::{comments, profiles, stories, users};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub story_id: i32,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

type CommentRow = (Comment, User, Profile);

fn to_details(rows: Vec<CommentRow>) -> Vec<CommentDetail> {
    rows.into_iter()
        .map(|(comment, user, profile)| CommentDetail::new(comment, user, profile))
        .collect()
}

/// All comments across all stories, newest first.
pub async fn get_all_comments(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let rows: Vec<CommentRow> = comments::table
        .inner_join(users::table.inner_join(profiles::table))
        .select((Comment::as_select(), User::as_select(), Profile::as_select()))
        .order(comments::created_at.desc())
        .load(&mut conn)
        .await?;

    let details = to_details(rows);
    Ok(Json(json!({
        "count": details.len(),
        "comments": details,
    })))
}

/// Comments on one story, newest first.
pub async fn get_comments(
    State(state): State<AppState>,
    Path(story_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let rows: Vec<CommentRow> = comments::table
        .inner_join(users::table.inner_join(profiles::table))
        .filter(comments::story_id.eq(story_id))
        .select((Comment::as_select(), User::as_select(), Profile::as_select()))
        .order(comments::created_at.desc())
        .load(&mut conn)
        .await?;

    let details = to_details(rows);
    Ok(Json(json!({
        "count": details.len(),
        "comments": details,
    })))
}

/// Comment on a story.
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentDetail>), ApiError> {
    if req.content.is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }

    let mut conn = state.conn().await?;

    let exists = stories::table
        .filter(stories::id.eq(req.story_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Story not found".to_string()));
    }

    let comment: Comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            user_id,
            story_id: req.story_id,
            content: req.content,
        })
        .get_result(&mut conn)
        .await?;

    let (user, profile): (User, Profile) = users::table
        .inner_join(profiles::table)
        .filter(users::id.eq(user_id))
        .select((User::as_select(), Profile::as_select()))
        .first(&mut conn)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentDetail::new(comment, user, profile)),
    ))
}

/// Edit a comment. Owner only.
pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(comment_id): Path<i32>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    if req.content.is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }

    let mut conn = state.conn().await?;

    let comment: Comment = comments::table
        .filter(comments::id.eq(comment_id))
        .select(Comment::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    ensure_owner(comment.user_id, user_id, "comment")?;

    let updated: Comment = diesel::update(comments::table.filter(comments::id.eq(comment_id)))
        .set(comments::content.eq(&req.content))
        .get_result(&mut conn)
        .await?;

    Ok(Json(updated))
}

/// Delete a comment. Owner only.
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(comment_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let comment: Comment = comments::table
        .filter(comments::id.eq(comment_id))
        .select(Comment::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    ensure_owner(comment.user_id, user_id, "comment")?;

    diesel::delete(comments::table.filter(comments::id.eq(comment_id)))
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
