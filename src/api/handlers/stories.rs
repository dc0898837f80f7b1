// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::achievements;
use crate::api::{ensure_owner, ApiError, AppState, AuthUser, MaybeAuthUser};
use crate::config::Config;
use crate::db::DbPool;
use crate::models::{
    NewLike, NewNotInterested, NewStory, NewStoryHashtag, NewStoryView, Profile, Story,
    StoryDetail, User,
};
use crate::notify::Notification;
use crate::schema::{
    hashtags, likes, not_interested, profiles, stories, story_hashtags, story_views,
    subscriptions, user_devices, users,
};

/// Number of whitespace-separated tokens in the content.
fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Deserialize)]
pub struct StoriesQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    pub title: String,
    pub content: String,
    pub reply_to: Option<i32>,
    #[serde(default)]
    pub hashtag_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = stories)]
struct StoryChanges {
    title: Option<String>,
    content: Option<String>,
    word_count: Option<i32>,
}

type StoryRow = (Story, User, Profile);

fn to_details(rows: Vec<StoryRow>) -> Vec<StoryDetail> {
    rows.into_iter()
        .map(|(story, user, profile)| StoryDetail::new(story, user, profile))
        .collect()
}

async fn load_story_detail(
    conn: &mut AsyncPgConnection,
    story_id: i32,
) -> Result<Option<StoryDetail>, diesel::result::Error> {
    let row: Option<StoryRow> = stories::table
        .inner_join(users::table.inner_join(profiles::table))
        .filter(stories::id.eq(story_id))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .first(conn)
        .await
        .optional()?;
    Ok(row.map(|(story, user, profile)| StoryDetail::new(story, user, profile)))
}

/// List stories, newest first, optionally filtered by a search term over
/// title and content.
pub async fn get_stories(
    State(state): State<AppState>,
    Query(query): Query<StoriesQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let mut stories_query = stories::table
        .inner_join(users::table.inner_join(profiles::table))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .into_boxed();

    if let Some(term) = query.search.filter(|t| !t.is_empty()) {
        debug!("Searching stories for term: {}", term);
        let pattern = format!("%{}%", term);
        stories_query = stories_query.filter(
            stories::title
                .ilike(pattern.clone())
                .or(stories::content.ilike(pattern)),
        );
    }

    let rows: Vec<StoryRow> = stories_query
        .order(stories::created_at.desc())
        .load(&mut conn)
        .await?;

    let details = to_details(rows);
    Ok(Json(json!({
        "count": details.len(),
        "stories": details,
    })))
}

/// Fetch one story with its author. A valid bearer token registers a view
/// in the background; failures there never affect the response.
pub async fn get_story(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(story_id): Path<i32>,
) -> Result<Json<StoryDetail>, ApiError> {
    let mut conn = state.conn().await?;

    let detail = load_story_detail(&mut conn, story_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;

    if let Some(user_id) = viewer {
        let pool = state.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = register_view(pool, story_id, user_id).await {
                warn!("Background view registration failed: {}", e);
            }
        });
    }

    Ok(Json(detail))
}

async fn register_view(pool: DbPool, story_id: i32, user_id: i32) -> anyhow::Result<()> {
    let mut conn = pool.get().await?;

    let inserted = diesel::insert_into(story_views::table)
        .values(&NewStoryView { story_id, user_id })
        .on_conflict((story_views::story_id, story_views::user_id))
        .do_nothing()
        .execute(&mut conn)
        .await?;

    // Only the first view from a user bumps the counter.
    if inserted > 0 {
        diesel::update(stories::table.filter(stories::id.eq(story_id)))
            .set(stories::views.eq(stories::views + 1))
            .execute(&mut conn)
            .await?;
    }

    Ok(())
}

/// Create a story or a reply. The story, its hashtag links and the parent
/// reply accounting commit in one transaction; notification fan-out and
/// achievement recomputation run afterwards, best-effort.
pub async fn create_story(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateStoryRequest>,
) -> Result<(StatusCode, Json<StoryDetail>), ApiError> {
    if req.title.is_empty() || req.content.is_empty() {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    let bounds = &Config::get().story;
    let word_count = count_words(&req.content);
    if word_count < bounds.min_words || word_count > bounds.max_words {
        return Err(ApiError::BadRequest(format!(
            "Story must be between {} and {} words, got {}",
            bounds.min_words, bounds.max_words, word_count
        )));
    }

    let new_story = NewStory {
        user_id,
        title: req.title,
        content: req.content,
        word_count: word_count as i32,
        reply_to: req.reply_to,
    };
    let hashtag_ids = req.hashtag_ids;

    let mut conn = state.conn().await?;

    let story = conn
        .transaction::<Story, ApiError, _>(|conn| {
            async move {
                let story: Story = diesel::insert_into(stories::table)
                    .values(&new_story)
                    .get_result(conn)
                    .await?;

                // Unresolvable hashtag ids are silently skipped.
                if !hashtag_ids.is_empty() {
                    let known: Vec<i32> = hashtags::table
                        .filter(hashtags::id.eq_any(&hashtag_ids))
                        .select(hashtags::id)
                        .load(conn)
                        .await?;
                    let links: Vec<NewStoryHashtag> = known
                        .into_iter()
                        .map(|hashtag_id| NewStoryHashtag {
                            story_id: story.id,
                            hashtag_id,
                        })
                        .collect();
                    if !links.is_empty() {
                        diesel::insert_into(story_hashtags::table)
                            .values(&links)
                            .on_conflict_do_nothing()
                            .execute(conn)
                            .await?;
                    }
                }

                // Parent-side reply accounting happens in the same
                // transaction so a reply never lands without it.
                if let Some(parent_id) = story.reply_to {
                    let updated = diesel::update(stories::table.filter(stories::id.eq(parent_id)))
                        .set((
                            stories::reply_count.eq(stories::reply_count + 1),
                            stories::last_reply_at.eq(Utc::now().naive_utc()),
                        ))
                        .execute(conn)
                        .await?;
                    if updated == 0 {
                        return Err(ApiError::NotFound("Parent story not found".to_string()));
                    }
                }

                Ok(story)
            }
            .scope_boxed()
        })
        .await?;

    let detail = load_story_detail(&mut conn, story.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Failed to load created story".to_string()))?;

    let state_bg = state.clone();
    let story_bg = story.clone();
    let author = detail.user.username.clone();
    tokio::spawn(async move {
        if let Err(e) = story_side_effects(state_bg, story_bg, author).await {
            warn!("Story side effects failed: {}", e);
        }
    });

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Post-commit fan-out: push + WebSocket notifications and achievement
/// recomputation for the author.
async fn story_side_effects(
    state: AppState,
    story: Story,
    author_username: String,
) -> anyhow::Result<()> {
    let mut conn = state.pool.get().await?;

    if let Some(parent_id) = story.reply_to {
        // Notify the parent author about the reply.
        let parent_author: Option<i32> = stories::table
            .filter(stories::id.eq(parent_id))
            .select(stories::user_id)
            .first(&mut conn)
            .await
            .optional()?;

        if let Some(parent_author) = parent_author {
            let message = format!("{} replied to your story", author_username);
            state.notify.notify(
                parent_author,
                Notification::new("reply", author_username.clone(), message.clone()),
            );

            let player_ids: Vec<String> = user_devices::table
                .filter(user_devices::user_id.eq(parent_author))
                .select(user_devices::player_id)
                .load(&mut conn)
                .await?;
            state
                .push
                .send_best_effort(&player_ids, "New reply", &message)
                .await;
        }
    } else {
        // Notify the author's followers about the new root story.
        let follower_ids: Vec<i32> = subscriptions::table
            .filter(subscriptions::following_id.eq(story.user_id))
            .select(subscriptions::follower_id)
            .load(&mut conn)
            .await?;

        if !follower_ids.is_empty() {
            let message = format!("{} posted a new story", author_username);
            for follower_id in &follower_ids {
                state.notify.notify(
                    *follower_id,
                    Notification::new("new_story", author_username.clone(), message.clone()),
                );
            }

            let player_ids: Vec<String> = user_devices::table
                .filter(user_devices::user_id.eq_any(&follower_ids))
                .select(user_devices::player_id)
                .load(&mut conn)
                .await?;
            state
                .push
                .send_best_effort(&player_ids, "New story", &message)
                .await;
        }
    }

    achievements::recompute_user(&mut conn, story.user_id).await?;

    Ok(())
}

/// Update a story's title or content. Owner only; content changes re-derive
/// and re-validate the word count.
pub async fn update_story(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(story_id): Path<i32>,
    Json(req): Json<UpdateStoryRequest>,
) -> Result<Json<StoryDetail>, ApiError> {
    let mut conn = state.conn().await?;

    let story: Story = stories::table
        .filter(stories::id.eq(story_id))
        .select(Story::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;

    ensure_owner(story.user_id, user_id, "story")?;

    let word_count = match &req.content {
        Some(content) => {
            let bounds = &Config::get().story;
            let count = count_words(content);
            if count < bounds.min_words || count > bounds.max_words {
                return Err(ApiError::BadRequest(format!(
                    "Story must be between {} and {} words, got {}",
                    bounds.min_words, bounds.max_words, count
                )));
            }
            Some(count as i32)
        }
        None => None,
    };

    let changes = StoryChanges {
        title: req.title,
        content: req.content,
        word_count,
    };

    if changes.title.is_some() || changes.content.is_some() {
        diesel::update(stories::table.filter(stories::id.eq(story_id)))
            .set(&changes)
            .execute(&mut conn)
            .await?;
    }

    let detail = load_story_detail(&mut conn, story_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;
    Ok(Json(detail))
}

/// Delete a story. Owner only. Hashtag links go first, in the same
/// transaction, to satisfy referential constraints.
pub async fn delete_story(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(story_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let story: Story = stories::table
        .filter(stories::id.eq(story_id))
        .select(Story::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;

    ensure_owner(story.user_id, user_id, "story")?;

    conn.transaction::<(), ApiError, _>(|conn| {
        async move {
            diesel::delete(story_hashtags::table.filter(story_hashtags::story_id.eq(story_id)))
                .execute(conn)
                .await?;
            diesel::delete(stories::table.filter(stories::id.eq(story_id)))
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(Json(json!({ "message": "Story deleted successfully" })))
}

/// Toggle a like. An existing (user, story) like is removed, a missing one
/// is created; the new state and total count come back. Under concurrent
/// toggles this is at-least-once, not exactly-once.
pub async fn like_story(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(story_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let exists = stories::table
        .filter(stories::id.eq(story_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Story not found".to_string()));
    }

    let liked = conn
        .transaction::<bool, ApiError, _>(|conn| {
            async move {
                let removed = diesel::delete(
                    likes::table
                        .filter(likes::user_id.eq(user_id))
                        .filter(likes::story_id.eq(story_id)),
                )
                .execute(conn)
                .await?;

                if removed > 0 {
                    return Ok(false);
                }

                diesel::insert_into(likes::table)
                    .values(&NewLike { user_id, story_id })
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .await?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await?;

    let likes_count = likes::table
        .filter(likes::story_id.eq(story_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    Ok(Json(json!({
        "liked": liked,
        "message": "Operation successful",
        "likes_count": likes_count,
    })))
}

/// Mark a story as not interesting for the calling user. Append-only.
pub async fn not_interested_story(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(story_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let exists = stories::table
        .filter(stories::id.eq(story_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Story not found".to_string()));
    }

    diesel::insert_into(not_interested::table)
        .values(&NewNotInterested { user_id, story_id })
        .execute(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("Story already marked as not interested".to_string()),
            e => e.into(),
        })?;

    Ok(Json(json!({ "message": "Story marked as not interested" })))
}

/// Stories authored by a user, newest first.
pub async fn get_user_stories(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let rows: Vec<StoryRow> = stories::table
        .inner_join(users::table.inner_join(profiles::table))
        .filter(stories::user_id.eq(user_id))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .order(stories::created_at.desc())
        .load(&mut conn)
        .await?;

    let details = to_details(rows);
    Ok(Json(json!({
        "count": details.len(),
        "stories": details,
    })))
}

/// Replies to a story in chronological thread order. A parent with no
/// replies yields an empty list, not a 404.
pub async fn get_replies(
    State(state): State<AppState>,
    Path(parent_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let rows: Vec<StoryRow> = stories::table
        .inner_join(users::table.inner_join(profiles::table))
        .filter(stories::reply_to.eq(parent_id))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .order(stories::created_at.asc())
        .load(&mut conn)
        .await?;

    let details = to_details(rows);
    Ok(Json(json!({
        "count": details.len(),
        "replies": details,
    })))
}

/// Root stories nobody has replied to yet, newest first.
pub async fn get_seeds(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let rows: Vec<StoryRow> = stories::table
        .inner_join(users::table.inner_join(profiles::table))
        .filter(stories::reply_to.is_null())
        .filter(stories::reply_count.eq(0))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .order(stories::created_at.desc())
        .load(&mut conn)
        .await?;

    Ok(Json(json!({ "stories": to_details(rows) })))
}

/// Root stories with replies, ranked by reply activity.
pub async fn get_branches(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let rows: Vec<StoryRow> = stories::table
        .inner_join(users::table.inner_join(profiles::table))
        .filter(stories::reply_to.is_null())
        .filter(stories::reply_count.gt(0))
        .select((Story::as_select(), User::as_select(), Profile::as_select()))
        .order((stories::reply_count.desc(), stories::last_reply_at.desc()))
        .load(&mut conn)
        .await?;

    Ok(Json(json!({ "stories": to_details(rows) })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whitespace_separated_tokens() {
        assert_eq!(count_words("one two three"), 3);
        assert_eq!(count_words("  leading and   trailing  "), 3);
        assert_eq!(count_words("tabs\tand\nnewlines count"), 4);
    }

    #[test]
    fn empty_and_blank_content_is_zero_words() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \n\t "), 0);
    }

    #[test]
    fn punctuation_stays_attached_to_tokens() {
        assert_eq!(count_words("hello, world!"), 2);
    }
}
