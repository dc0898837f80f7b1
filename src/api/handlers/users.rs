// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

use crate::api::{ApiError, AppState, AuthUser};
use crate::models::{FollowDetail, NewSubscription, Profile, User};
use crate::notify::Notification;
use crate::schema::{profiles, subscriptions, user_devices, users};

async fn ensure_user_exists(conn: &mut AsyncPgConnection, user_id: i32) -> Result<(), ApiError> {
    let count = users::table
        .filter(users::id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .await?;
    if count == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// Resolve (user id, followed_at) pairs into follow listings with profile
/// details. Order of the input is preserved.
async fn resolve_follow_details(
    conn: &mut AsyncPgConnection,
    edges: Vec<(i32, NaiveDateTime)>,
) -> Result<Vec<FollowDetail>, ApiError> {
    let ids: Vec<i32> = edges.iter().map(|(id, _)| *id).collect();

    let people: Vec<(User, Profile)> = users::table
        .inner_join(profiles::table)
        .filter(users::id.eq_any(&ids))
        .select((User::as_select(), Profile::as_select()))
        .load(conn)
        .await?;
    let by_id: HashMap<i32, (User, Profile)> =
        people.into_iter().map(|(u, p)| (u.id, (u, p))).collect();

    let details = edges
        .into_iter()
        .filter_map(|(id, followed_at)| {
            by_id.get(&id).map(|(user, profile)| FollowDetail {
                id: user.id,
                username: user.username.clone(),
                avatar: profile.avatar.clone(),
                bio: profile.bio.clone(),
                followed_at,
            })
        })
        .collect();

    Ok(details)
}

/// Users following the given user.
pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    ensure_user_exists(&mut conn, user_id).await?;

    let edges: Vec<(i32, NaiveDateTime)> = subscriptions::table
        .filter(subscriptions::following_id.eq(user_id))
        .select((subscriptions::follower_id, subscriptions::created_at))
        .order(subscriptions::created_at.desc())
        .load(&mut conn)
        .await?;

    let followers = resolve_follow_details(&mut conn, edges).await?;
    Ok(Json(json!({ "followers": followers })))
}

/// Users the given user follows.
pub async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;
    ensure_user_exists(&mut conn, user_id).await?;

    let edges: Vec<(i32, NaiveDateTime)> = subscriptions::table
        .filter(subscriptions::follower_id.eq(user_id))
        .select((subscriptions::following_id, subscriptions::created_at))
        .order(subscriptions::created_at.desc())
        .load(&mut conn)
        .await?;

    let following = resolve_follow_details(&mut conn, edges).await?;
    Ok(Json(json!({ "following": following })))
}

/// Follow a user. Self-follows are rejected; a duplicate follow surfaces
/// the unique pair constraint as a conflict.
pub async fn follow_user(
    State(state): State<AppState>,
    AuthUser(follower_id): AuthUser,
    Path(followee_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    if follower_id == followee_id {
        return Err(ApiError::BadRequest("Cannot follow yourself".to_string()));
    }

    let mut conn = state.conn().await?;
    ensure_user_exists(&mut conn, followee_id).await?;

    diesel::insert_into(subscriptions::table)
        .values(&NewSubscription {
            follower_id,
            following_id: followee_id,
        })
        .execute(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("Already following this user".to_string()),
            e => e.into(),
        })?;

    let follower_name: String = users::table
        .filter(users::id.eq(follower_id))
        .select(users::username)
        .first(&mut conn)
        .await?;

    // Best-effort notification fan-out to the followee.
    let message = format!("{} followed you", follower_name);
    state.notify.notify(
        followee_id,
        Notification::new("follow", follower_name, message.clone()),
    );

    let state_bg = state.clone();
    tokio::spawn(async move {
        if let Err(e) = push_to_user(state_bg, followee_id, "New follower!", message).await {
            warn!("Follow push failed: {}", e);
        }
    });

    Ok(Json(json!({ "message": "Followed successfully" })))
}

async fn push_to_user(
    state: AppState,
    user_id: i32,
    title: &str,
    message: String,
) -> anyhow::Result<()> {
    let mut conn = state.pool.get().await?;
    let player_ids: Vec<String> = user_devices::table
        .filter(user_devices::user_id.eq(user_id))
        .select(user_devices::player_id)
        .load(&mut conn)
        .await?;
    state.push.send_best_effort(&player_ids, title, &message).await;
    Ok(())
}

/// Unfollow a user. Deleting an edge that does not exist is an error.
pub async fn unfollow_user(
    State(state): State<AppState>,
    AuthUser(follower_id): AuthUser,
    Path(followee_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let removed = diesel::delete(
        subscriptions::table
            .filter(subscriptions::follower_id.eq(follower_id))
            .filter(subscriptions::following_id.eq(followee_id)),
    )
    .execute(&mut conn)
    .await?;

    if removed == 0 {
        return Err(ApiError::BadRequest(
            "Not following this user".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Successfully unfollowed user" })))
}
