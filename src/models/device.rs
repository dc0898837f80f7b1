// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::user_devices;

/// A push-notification endpoint registered for a user. Multiple devices per
/// user are allowed; there is no dedup or expiry.
#[derive(Debug, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = user_devices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserDevice {
    pub id: i32,
    pub user_id: i32,
    pub player_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_devices)]
pub struct NewUserDevice {
    pub user_id: i32,
    pub player_id: String,
}
