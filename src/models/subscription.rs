// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::subscriptions;

/// Directed follow edge in the social graph.
#[derive(Debug, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: i32,
    pub follower_id: i32,
    pub following_id: i32,
    pub created_at: NaiveDateTime,
}

/// DTO for creating a new follow edge
#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub follower_id: i32,
    pub following_id: i32,
}

/// DTO for follower/following listings with profile details
#[derive(Debug, Serialize, Deserialize)]
pub struct FollowDetail {
    pub id: i32,
    pub username: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub followed_at: NaiveDateTime,
}
