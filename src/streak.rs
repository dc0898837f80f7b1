// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

//! Daily-activity streak tracking on user profiles.
//!
//! A streak increments at most once per 24-hour window, measured in
//! wall-clock UTC with no per-user timezone adjustment. The increment is a
//! guarded atomic UPDATE so concurrent calls inside the same window cannot
//! double-count. The reward flag is sticky once granted.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::schema::profiles;

/// Consecutive active days required before the one-time reward is granted.
pub const REWARD_THRESHOLD: i32 = 7;

const WINDOW_HOURS: i64 = 24;

/// Outcome of a streak update call.
#[derive(Debug, Serialize)]
pub struct StreakStatus {
    pub streak_count: i32,
    pub last_active: Option<NaiveDateTime>,
    pub rewarded: bool,
}

/// Whether a new activity window has opened since `last_active`.
pub fn streak_due(last_active: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    match last_active {
        None => true,
        Some(last) => now - last >= Duration::hours(WINDOW_HOURS),
    }
}

/// Register activity for the user. Increments the streak when a full
/// window has elapsed, otherwise a no-op. Returns the resulting counters
/// and whether the reward was granted by this call.
pub async fn update_streak(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> QueryResult<StreakStatus> {
    let now = Utc::now().naive_utc();
    let cutoff = now - Duration::hours(WINDOW_HOURS);

    let (streak_count, last_active) = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select((profiles::streak_count, profiles::last_active_at))
        .first::<(i32, Option<NaiveDateTime>)>(conn)
        .await?;

    if !streak_due(last_active, now) {
        return Ok(StreakStatus {
            streak_count,
            last_active,
            rewarded: false,
        });
    }

    // The SQL guard repeats the window check so a concurrent caller in the
    // same window cannot double-increment.
    let incremented = diesel::update(
        profiles::table
            .filter(profiles::user_id.eq(user_id))
            .filter(
                profiles::last_active_at
                    .is_null()
                    .or(profiles::last_active_at.le(cutoff)),
            ),
    )
    .set((
        profiles::streak_count.eq(profiles::streak_count + 1),
        profiles::last_active_at.eq(now),
    ))
    .execute(conn)
    .await?;

    // The reward is only ever granted on the call that advanced the streak.
    let rewarded_now = if incremented > 0 {
        diesel::update(
            profiles::table
                .filter(profiles::user_id.eq(user_id))
                .filter(profiles::streak_count.ge(REWARD_THRESHOLD))
                .filter(profiles::streak_rewarded.eq(false)),
        )
        .set(profiles::streak_rewarded.eq(true))
        .execute(conn)
        .await?
            > 0
    } else {
        false
    };

    let (streak_count, last_active) = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select((profiles::streak_count, profiles::last_active_at))
        .first::<(i32, Option<NaiveDateTime>)>(conn)
        .await?;

    Ok(StreakStatus {
        streak_count,
        last_active,
        rewarded: rewarded_now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn first_activity_is_always_due() {
        assert!(streak_due(None, at(1, 12)));
    }

    #[test]
    fn within_window_is_not_due() {
        assert!(!streak_due(Some(at(1, 12)), at(2, 11)));
        assert!(!streak_due(Some(at(1, 12)), at(1, 12)));
    }

    #[test]
    fn full_window_elapsed_is_due() {
        assert!(streak_due(Some(at(1, 12)), at(2, 12)));
        assert!(streak_due(Some(at(1, 12)), at(5, 0)));
    }
}
