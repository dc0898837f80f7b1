// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{likes, not_interested, story_views};

/// A like; existence of the (user, story) row is the liked state.
#[derive(Debug, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Like {
    pub id: i32,
    pub user_id: i32,
    pub story_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub user_id: i32,
    pub story_id: i32,
}

/// Append-only suppression marker; there is no read path for these rows.
#[derive(Debug, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = not_interested)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotInterested {
    pub id: i32,
    pub user_id: i32,
    pub story_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = not_interested)]
pub struct NewNotInterested {
    pub user_id: i32,
    pub story_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = story_views)]
pub struct NewStoryView {
    pub story_id: i32,
    pub user_id: i32,
}
