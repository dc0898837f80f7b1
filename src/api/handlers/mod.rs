// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

pub mod achievements;
pub mod auth;
pub mod comments;
pub mod devices;
pub mod hashtags;
pub mod health;
pub mod profiles;
pub mod stories;
pub mod streak;
pub mod users;
pub mod ws;
