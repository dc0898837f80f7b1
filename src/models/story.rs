// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::stories;

use super::{Profile, User};

/// A micro-story. A null `reply_to` marks a root post; `reply_count` and
/// `last_reply_at` are denormalized aggregates maintained on reply creation.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = stories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Story {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub word_count: i32,
    pub reply_to: Option<i32>,
    pub reply_count: i32,
    pub last_reply_at: Option<NaiveDateTime>,
    pub image_url: Option<String>,
    pub views: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// DTO for creating a new story
#[derive(Debug, Insertable)]
#[diesel(table_name = stories)]
pub struct NewStory {
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub word_count: i32,
    pub reply_to: Option<i32>,
}

/// Story author information attached to story responses
#[derive(Debug, Serialize)]
pub struct AuthorDetail {
    pub id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
}

impl AuthorDetail {
    pub fn from_parts(user: &User, profile: &Profile) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: profile.avatar.clone(),
            bio: profile.bio.clone(),
            is_verified: profile.is_verified,
        }
    }
}

/// A story with its author and profile eagerly attached
#[derive(Debug, Serialize)]
pub struct StoryDetail {
    #[serde(flatten)]
    pub story: Story,
    pub user: AuthorDetail,
}

impl StoryDetail {
    pub fn new(story: Story, user: User, profile: Profile) -> Self {
        let author = AuthorDetail::from_parts(&user, &profile);
        Self {
            story,
            user: author,
        }
    }
}
