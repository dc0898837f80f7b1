// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

const TOKEN_ISSUER: &str = "ravell-api";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("failed to hash password")]
    Hash(#[from] bcrypt::BcryptError),
}

/// JWT claims carried by both access and refresh tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// The bearer token pair returned by login, verification and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn sign_token(user_id: i32, ttl_seconds: i64, secret: &str) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        user_id,
        exp: now + ttl_seconds,
        iat: now,
        iss: TOKEN_ISSUER.to_string(),
    };
    let key = EncodingKey::from_secret(secret.as_ref());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Issue an access/refresh token pair for a user.
pub fn generate_token_pair(user_id: i32) -> Result<TokenPair, AuthError> {
    let auth = &Config::get().auth;
    let access_token = sign_token(user_id, auth.access_ttl_hours * 3600, &auth.jwt_secret)?;
    let refresh_token =
        sign_token(user_id, auth.refresh_ttl_days * 24 * 3600, &auth.jwt_secret)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Validate a token and return the user id it was issued for.
pub fn validate_token(token: &str) -> Result<i32, AuthError> {
    let auth = &Config::get().auth;
    let key = DecodingKey::from_secret(auth.jwt_secret.as_ref());
    let validation = Validation::default();
    let data = decode::<Claims>(token, &key, &validation)?;
    Ok(data.claims.user_id)
}

/// Validate a refresh token and issue a fresh token pair.
pub fn refresh_token_pair(refresh_token: &str) -> Result<TokenPair, AuthError> {
    let user_id = validate_token(refresh_token)?;
    generate_token_pair(user_id)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// OTP codes are 6 decimal digits and expire after this many minutes.
pub const OTP_TTL_MINUTES: i64 = 15;
const OTP_LENGTH: usize = 6;

pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn install_test_config() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let _ = Config::init();
    }

    #[test]
    fn token_round_trip() {
        install_test_config();
        let pair = generate_token_pair(42).unwrap();
        assert_eq!(validate_token(&pair.access_token).unwrap(), 42);
        assert_eq!(validate_token(&pair.refresh_token).unwrap(), 42);
    }

    #[test]
    fn refresh_issues_new_pair_for_same_user() {
        install_test_config();
        let pair = generate_token_pair(7).unwrap();
        let refreshed = refresh_token_pair(&pair.refresh_token).unwrap();
        assert_eq!(validate_token(&refreshed.access_token).unwrap(), 7);
    }

    #[test]
    fn garbage_token_is_rejected() {
        install_test_config();
        assert!(validate_token("not.a.token").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..20 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
