pub mod achievements;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod models;
pub mod notify;
pub mod schema;
pub mod streak;

#[macro_use]
extern crate diesel;
