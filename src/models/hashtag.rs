// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{hashtags, story_hashtags};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = hashtags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Hashtag {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = hashtags)]
pub struct NewHashtag {
    pub name: String,
}

/// Join row associating a story with a hashtag.
#[derive(Debug, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = story_hashtags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoryHashtag {
    pub id: i32,
    pub story_id: i32,
    pub hashtag_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = story_hashtags)]
pub struct NewStoryHashtag {
    pub story_id: i32,
    pub hashtag_id: i32,
}
