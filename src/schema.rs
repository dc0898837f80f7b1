// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

// Import diesel table macros
use diesel::{allow_tables_to_appear_in_same_query, joinable, table};

table! {
    users (id) {
        id -> Integer,
        username -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        first_name -> Nullable<Varchar>,
        last_name -> Nullable<Varchar>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    profiles (id) {
        id -> Integer,
        user_id -> Integer,
        avatar -> Nullable<Varchar>,
        bio -> Nullable<Text>,
        is_verified -> Bool,
        is_early -> Bool,
        otp_code -> Nullable<Varchar>,
        otp_created_at -> Nullable<Timestamp>,
        streak_count -> Integer,
        last_active_at -> Nullable<Timestamp>,
        streak_rewarded -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    stories (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Varchar,
        content -> Text,
        word_count -> Integer,
        reply_to -> Nullable<Integer>,
        reply_count -> Integer,
        last_reply_at -> Nullable<Timestamp>,
        image_url -> Nullable<Varchar>,
        views -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    comments (id) {
        id -> Integer,
        user_id -> Integer,
        story_id -> Integer,
        content -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    likes (id) {
        id -> Integer,
        user_id -> Integer,
        story_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    subscriptions (id) {
        id -> Integer,
        follower_id -> Integer,
        following_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    hashtags (id) {
        id -> Integer,
        name -> Varchar,
        created_at -> Timestamp,
    }
}

table! {
    story_hashtags (id) {
        id -> Integer,
        story_id -> Integer,
        hashtag_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    not_interested (id) {
        id -> Integer,
        user_id -> Integer,
        story_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    story_views (id) {
        id -> Integer,
        story_id -> Integer,
        user_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    user_devices (id) {
        id -> Integer,
        user_id -> Integer,
        player_id -> Varchar,
        created_at -> Timestamp,
    }
}

table! {
    achievements (id) {
        id -> Integer,
        key -> Varchar,
        title -> Varchar,
        description -> Nullable<Text>,
        icon_url -> Nullable<Varchar>,
        condition -> Nullable<Jsonb>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    user_achievements (id) {
        id -> Integer,
        user_id -> Integer,
        achievement_id -> Integer,
        progress -> Double,
        unlocked -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(profiles -> users (user_id));
joinable!(stories -> users (user_id));
joinable!(comments -> users (user_id));
joinable!(comments -> stories (story_id));
joinable!(likes -> users (user_id));
joinable!(likes -> stories (story_id));
joinable!(story_hashtags -> stories (story_id));
joinable!(story_hashtags -> hashtags (hashtag_id));
joinable!(not_interested -> users (user_id));
joinable!(not_interested -> stories (story_id));
joinable!(story_views -> stories (story_id));
joinable!(story_views -> users (user_id));
joinable!(user_devices -> users (user_id));
joinable!(user_achievements -> users (user_id));
joinable!(user_achievements -> achievements (achievement_id));

// Allow joining the tables if needed
allow_tables_to_appear_in_same_query!(
    users,
    profiles,
    stories,
    comments,
    likes,
    subscriptions,
    hashtags,
    story_hashtags,
    not_interested,
    story_views,
    user_devices,
    achievements,
    user_achievements,
);
