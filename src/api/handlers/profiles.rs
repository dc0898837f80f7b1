// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::achievements;
use crate::api::{ApiError, AppState, AuthUser, MaybeAuthUser};
use crate::models::{Profile, Story, User};
use crate::schema::{
    comments, likes, not_interested, profiles, stories, story_hashtags, story_views,
    subscriptions, user_achievements, user_devices, users,
};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// Accounts created before this date count as early adopters regardless of
/// the profile flag.
fn early_access_cutoff() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

async fn load_user_with_profile(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<(User, Profile), ApiError> {
    users::table
        .inner_join(profiles::table)
        .filter(users::id.eq(user_id))
        .select((User::as_select(), Profile::as_select()))
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn load_stats(conn: &mut AsyncPgConnection, user_id: i32) -> Result<Value, ApiError> {
    let stories_count = stories::table
        .filter(stories::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .await?;
    let followers_count = subscriptions::table
        .filter(subscriptions::following_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .await?;
    let following_count = subscriptions::table
        .filter(subscriptions::follower_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .await?;

    Ok(json!({
        "stories_count": stories_count,
        "followers_count": followers_count,
        "following_count": following_count,
    }))
}

/// The authenticated user's own profile, with counters. Fetching it
/// unlocks the early_access achievement when that achievement is defined.
pub async fn get_my_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let (user, profile) = load_user_with_profile(&mut conn, user_id).await?;

    if let Err(e) = achievements::update_progress(&mut conn, user_id, "early_access", 1.0).await {
        warn!("Failed to unlock early_access for user {}: {}", user_id, e);
    }

    let stats = load_stats(&mut conn, user_id).await?;
    let is_early = profile.is_early || user.created_at < early_access_cutoff();

    Ok(Json(json!({
        "user": user,
        "profile": profile,
        "stats": stats,
        "is_early": is_early,
    })))
}

/// Update name and bio on the authenticated user's account.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    if req.first_name.is_some() || req.last_name.is_some() {
        #[derive(AsChangeset)]
        #[diesel(table_name = users)]
        struct NameChanges {
            first_name: Option<String>,
            last_name: Option<String>,
        }

        diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(&NameChanges {
                first_name: req.first_name,
                last_name: req.last_name,
            })
            .execute(&mut conn)
            .await?;
    }

    if let Some(bio) = req.bio {
        diesel::update(profiles::table.filter(profiles::user_id.eq(user_id)))
            .set(profiles::bio.eq(bio))
            .execute(&mut conn)
            .await?;
    }

    let (user, profile) = load_user_with_profile(&mut conn, user_id).await?;
    let is_early = profile.is_early;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user,
        "profile": profile,
        "is_early": is_early,
    })))
}

/// A user's public profile with stats and recent stories.
pub async fn get_user_profile(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let (user, profile) = load_user_with_profile(&mut conn, user_id).await?;
    let stats = load_stats(&mut conn, user_id).await?;

    let recent: Vec<Story> = stories::table
        .filter(stories::user_id.eq(user_id))
        .select(Story::as_select())
        .order(stories::created_at.desc())
        .limit(10)
        .load(&mut conn)
        .await?;

    let is_following = match viewer {
        Some(viewer_id) => {
            subscriptions::table
                .filter(subscriptions::follower_id.eq(viewer_id))
                .filter(subscriptions::following_id.eq(user_id))
                .count()
                .get_result::<i64>(&mut conn)
                .await?
                > 0
        }
        None => false,
    };

    let is_early = profile.is_early || user.created_at < early_access_cutoff();

    Ok(Json(json!({
        "user": user,
        "profile": profile,
        "stats": stats,
        "stories": recent,
        "is_following": is_following,
        "is_early": is_early,
    })))
}

/// Delete the authenticated user's account and all owned data in one
/// transaction.
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    conn.transaction::<(), ApiError, _>(|conn| {
        async move {
            let story_ids: Vec<i32> = stories::table
                .filter(stories::user_id.eq(user_id))
                .select(stories::id)
                .load(conn)
                .await?;

            diesel::delete(
                story_hashtags::table.filter(story_hashtags::story_id.eq_any(&story_ids)),
            )
            .execute(conn)
            .await?;
            diesel::delete(stories::table.filter(stories::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(likes::table.filter(likes::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(not_interested::table.filter(not_interested::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(story_views::table.filter(story_views::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(comments::table.filter(comments::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(
                subscriptions::table.filter(
                    subscriptions::follower_id
                        .eq(user_id)
                        .or(subscriptions::following_id.eq(user_id)),
                ),
            )
            .execute(conn)
            .await?;
            diesel::delete(user_devices::table.filter(user_devices::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(
                user_achievements::table.filter(user_achievements::user_id.eq(user_id)),
            )
            .execute(conn)
            .await?;
            diesel::delete(profiles::table.filter(profiles::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(users::table.filter(users::id.eq(user_id)))
                .execute(conn)
                .await?;

            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    info!("Deleted account {}", user_id);
    Ok(Json(json!({ "message": "Account deleted successfully" })))
}
