// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

//! Lazy per-user achievement progress.
//!
//! Achievement definitions carry a JSON condition; the engine interprets it
//! as a tagged [`Condition`] and recomputes progress from the user's data.
//! Rows are materialized on first write and listings synthesize transient
//! zero-progress entries for achievements the user has no row for, so a
//! listing is never shorter than the set of defined achievements.

use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::models::{Achievement, NewUserAchievement};
use crate::schema::{achievements, stories, user_achievements, users};

/// Typed achievement condition. Unknown condition kinds fail to parse and
/// evaluate to zero progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    StoryCount { value: i64 },
}

/// One entry of a user's achievement listing. Synthesized entries carry
/// zero progress and no backing row.
#[derive(Debug, Serialize)]
pub struct UserAchievementView {
    pub achievement: Achievement,
    pub progress: f64,
    pub unlocked: bool,
}

/// Parse the stored JSON condition. `None` for absent, malformed or
/// unrecognized conditions.
pub fn parse_condition(raw: Option<&serde_json::Value>) -> Option<Condition> {
    raw.and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Progress toward a count target, clamped to [0, 1]. A zero or negative
/// target never fails; it reports zero progress.
pub fn progress_toward(count: i64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    (count as f64 / target as f64).min(1.0)
}

fn clamp_progress(progress: f64) -> f64 {
    progress.clamp(0.0, 1.0)
}

/// Evaluate a condition against the user's current data.
pub async fn evaluate(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    condition: &Condition,
) -> QueryResult<f64> {
    match condition {
        Condition::StoryCount { value } => {
            let count = stories::table
                .filter(stories::user_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)
                .await?;
            Ok(progress_toward(count, *value))
        }
    }
}

/// Upsert a user's progress on an achievement. Progress is clamped to
/// [0, 1]; the unlock flag is merged server-side and never unset.
pub async fn upsert_progress(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    achievement_id: i32,
    progress: f64,
) -> QueryResult<()> {
    let progress = clamp_progress(progress);
    let row = NewUserAchievement {
        user_id,
        achievement_id,
        progress,
        unlocked: progress >= 1.0,
    };

    diesel::insert_into(user_achievements::table)
        .values(&row)
        .on_conflict((
            user_achievements::user_id,
            user_achievements::achievement_id,
        ))
        .do_update()
        .set((
            user_achievements::progress.eq(excluded(user_achievements::progress)),
            user_achievements::unlocked
                .eq(user_achievements::unlocked.or(excluded(user_achievements::unlocked))),
            user_achievements::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;

    Ok(())
}

/// Upsert progress by achievement key. Returns false when no achievement
/// with that key is defined.
pub async fn update_progress(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    key: &str,
    progress: f64,
) -> QueryResult<bool> {
    let achievement_id = achievements::table
        .filter(achievements::key.eq(key))
        .select(achievements::id)
        .first::<i32>(conn)
        .await
        .optional()?;

    match achievement_id {
        Some(achievement_id) => {
            upsert_progress(conn, user_id, achievement_id, progress).await?;
            Ok(true)
        }
        None => {
            debug!("No achievement defined for key {}", key);
            Ok(false)
        }
    }
}

/// All achievements for a user, one entry per defined achievement.
pub async fn list_for_user(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> QueryResult<Vec<UserAchievementView>> {
    let existing: Vec<(i32, f64, bool, Achievement)> = user_achievements::table
        .inner_join(achievements::table)
        .filter(user_achievements::user_id.eq(user_id))
        .select((
            user_achievements::achievement_id,
            user_achievements::progress,
            user_achievements::unlocked,
            Achievement::as_select(),
        ))
        .load(conn)
        .await?;

    let seen: HashSet<i32> = existing.iter().map(|(id, _, _, _)| *id).collect();

    let mut views: Vec<UserAchievementView> = existing
        .into_iter()
        .map(|(_, progress, unlocked, achievement)| UserAchievementView {
            achievement,
            progress,
            unlocked,
        })
        .collect();

    let all: Vec<Achievement> = achievements::table
        .select(Achievement::as_select())
        .load(conn)
        .await?;

    for achievement in all {
        if !seen.contains(&achievement.id) {
            views.push(UserAchievementView {
                achievement,
                progress: 0.0,
                unlocked: false,
            });
        }
    }

    Ok(views)
}

/// Recompute every condition-bearing achievement for one user.
pub async fn recompute_user(conn: &mut AsyncPgConnection, user_id: i32) -> QueryResult<()> {
    let all: Vec<Achievement> = achievements::table
        .select(Achievement::as_select())
        .load(conn)
        .await?;

    for achievement in all {
        let Some(condition) = parse_condition(achievement.condition.as_ref()) else {
            continue;
        };
        let progress = evaluate(conn, user_id, &condition).await?;
        upsert_progress(conn, user_id, achievement.id, progress).await?;
    }

    Ok(())
}

/// Recompute every (achievement, user) pair. This is a manually-invoked
/// batch interface, not part of the request path.
pub async fn update_all(conn: &mut AsyncPgConnection) -> QueryResult<()> {
    let user_ids: Vec<i32> = users::table.select(users::id).load(conn).await?;

    for user_id in user_ids {
        recompute_user(conn, user_id).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_story_count_condition() {
        let raw = json!({"type": "story_count", "value": 10});
        assert_eq!(
            parse_condition(Some(&raw)),
            Some(Condition::StoryCount { value: 10 })
        );
    }

    #[test]
    fn unknown_condition_type_is_none() {
        let raw = json!({"type": "moon_phase", "value": 3});
        assert_eq!(parse_condition(Some(&raw)), None);
    }

    #[test]
    fn malformed_condition_is_none() {
        let raw = json!({"type": "story_count"});
        assert_eq!(parse_condition(Some(&raw)), None);
        assert_eq!(parse_condition(Some(&json!("story_count"))), None);
        assert_eq!(parse_condition(None), None);
    }

    #[test]
    fn progress_is_ratio_capped_at_one() {
        assert_eq!(progress_toward(0, 10), 0.0);
        assert_eq!(progress_toward(5, 10), 0.5);
        assert_eq!(progress_toward(10, 10), 1.0);
        assert_eq!(progress_toward(25, 10), 1.0);
    }

    #[test]
    fn zero_or_missing_target_reports_zero() {
        assert_eq!(progress_toward(5, 0), 0.0);
        assert_eq!(progress_toward(5, -1), 0.0);
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(clamp_progress(-0.5), 0.0);
        assert_eq!(clamp_progress(0.25), 0.25);
        assert_eq!(clamp_progress(1.5), 1.0);
    }
}
