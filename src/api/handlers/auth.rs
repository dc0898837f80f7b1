// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{ApiError, AppState};
use crate::auth;
use crate::models::{NewProfile, NewUser, Profile, User};
use crate::schema::{profiles, users};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub user_id: i32,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub user_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Register a new account and send the verification OTP by email.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if req.username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if !req.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let mut conn = state.conn().await?;

    let existing = users::table
        .filter(
            users::username
                .eq(&req.username)
                .or(users::email.eq(&req.email)),
        )
        .count()
        .get_result::<i64>(&mut conn)
        .await?;
    if existing > 0 {
        return Err(ApiError::BadRequest(
            "Username or email already exists".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let otp = auth::generate_otp();

    let new_user = NewUser {
        username: req.username.clone(),
        email: req.email.clone(),
        password_hash,
    };

    let otp_for_tx = otp.clone();
    let user = conn
        .transaction::<User, ApiError, _>(|conn| {
            async move {
                let user: User = diesel::insert_into(users::table)
                    .values(&new_user)
                    .get_result(conn)
                    .await?;

                diesel::insert_into(profiles::table)
                    .values(&NewProfile { user_id: user.id })
                    .execute(conn)
                    .await?;

                diesel::update(profiles::table.filter(profiles::user_id.eq(user.id)))
                    .set((
                        profiles::otp_code.eq(&otp_for_tx),
                        profiles::otp_created_at.eq(Utc::now().naive_utc()),
                        profiles::is_verified.eq(false),
                    ))
                    .execute(conn)
                    .await?;

                Ok(user)
            }
            .scope_boxed()
        })
        .await?;

    info!("Registered user {} ({})", user.username, user.email);

    // Email delivery is best-effort and never fails registration.
    let mailer = state.mailer.clone();
    let email = user.email.clone();
    let username = user.username.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_otp(&email, &username, &otp).await {
            warn!("Failed to send OTP email to {}: {}", email, e);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully. OTP sent to email",
            "user_id": user.id,
        })),
    ))
}

/// Log in with username and password. The profile must be verified.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let result: Option<(User, Profile)> = users::table
        .inner_join(profiles::table)
        .filter(users::username.eq(&req.username))
        .select((User::as_select(), Profile::as_select()))
        .first(&mut conn)
        .await
        .optional()?;

    let Some((user, profile)) = result else {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if !profile.is_verified {
        return Err(ApiError::Forbidden("Account not verified".to_string()));
    }

    let tokens = auth::generate_token_pair(user.id)?;

    Ok(Json(json!({
        "message": "Login successful",
        "user_id": user.id,
        "username": user.username,
        "tokens": tokens,
    })))
}

/// Verify the emailed OTP and issue the first token pair.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let profile: Profile = profiles::table
        .filter(profiles::user_id.eq(req.user_id))
        .select(Profile::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let issued_at = profile
        .otp_created_at
        .ok_or_else(|| ApiError::BadRequest("No OTP pending for this user".to_string()))?;

    if Utc::now().naive_utc() - issued_at > Duration::minutes(auth::OTP_TTL_MINUTES) {
        return Err(ApiError::BadRequest("OTP expired".to_string()));
    }

    if profile.otp_code.as_deref() != Some(req.otp.as_str()) {
        return Err(ApiError::BadRequest("Invalid OTP".to_string()));
    }

    diesel::update(profiles::table.filter(profiles::user_id.eq(req.user_id)))
        .set((
            profiles::is_verified.eq(true),
            profiles::otp_code.eq(None::<String>),
            profiles::otp_created_at.eq(None::<chrono::NaiveDateTime>),
        ))
        .execute(&mut conn)
        .await?;

    let tokens = auth::generate_token_pair(req.user_id)?;

    Ok(Json(json!({
        "message": "Account verified successfully",
        "tokens": tokens,
    })))
}

/// Regenerate the OTP and email it again.
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<ResendOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn().await?;

    let user: User = users::table
        .filter(users::id.eq(req.user_id))
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let otp = auth::generate_otp();

    diesel::update(profiles::table.filter(profiles::user_id.eq(user.id)))
        .set((
            profiles::otp_code.eq(&otp),
            profiles::otp_created_at.eq(Utc::now().naive_utc()),
            profiles::is_verified.eq(false),
        ))
        .execute(&mut conn)
        .await?;

    let mailer = state.mailer.clone();
    let email = user.email.clone();
    let username = user.username.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_otp(&email, &username, &otp).await {
            warn!("Failed to resend OTP email to {}: {}", email, e);
        }
    });

    Ok(Json(json!({ "message": "OTP resent successfully" })))
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh_token(
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>, ApiError> {
    let tokens = auth::refresh_token_pair(&req.refresh_token)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    Ok(Json(json!({
        "message": "Token refreshed successfully",
        "tokens": tokens,
    })))
}
