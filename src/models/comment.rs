// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::comments;

use super::{AuthorDetail, Profile, User};

/// A flat comment on a story, independent of story-to-story reply threading.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: i32,
    pub user_id: i32,
    pub story_id: i32,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// DTO for creating a new comment
#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub user_id: i32,
    pub story_id: i32,
    pub content: String,
}

/// A comment with its author attached
#[derive(Debug, Serialize)]
pub struct CommentDetail {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: AuthorDetail,
}

impl CommentDetail {
    pub fn new(comment: Comment, user: User, profile: Profile) -> Self {
        let author = AuthorDetail::from_parts(&user, &profile);
        Self {
            comment,
            user: author,
        }
    }
}
