// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{achievements, user_achievements};

/// A named achievement definition. `condition` holds the JSON-encoded rule
/// evaluated by the progress engine; a null condition is never auto-computed.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = achievements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Achievement {
    pub id: i32,
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub condition: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// DTO for creating a new achievement definition
#[derive(Debug, Insertable)]
#[diesel(table_name = achievements)]
pub struct NewAchievement {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub condition: Option<serde_json::Value>,
}

/// Per-user progress toward an achievement. Progress lives in [0, 1] and
/// `unlocked` is sticky once set.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = user_achievements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserAchievement {
    pub id: i32,
    pub user_id: i32,
    pub achievement_id: i32,
    pub progress: f64,
    pub unlocked: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_achievements)]
pub struct NewUserAchievement {
    pub user_id: i32,
    pub achievement_id: i32,
    pub progress: f64,
    pub unlocked: bool,
}
