// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

const ONESIGNAL_URL: &str = "https://onesignal.com/api/v1/notifications";

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push delivery is not configured")]
    NotConfigured,
    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("push provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// OneSignal REST client. Deliveries are best-effort; callers log and drop
/// errors rather than failing the primary request.
pub struct PushClient {
    http: reqwest::Client,
    app_id: Option<String>,
    api_key: Option<String>,
}

impl PushClient {
    pub fn new() -> Self {
        let push = &Config::get().push;
        Self {
            http: reqwest::Client::new(),
            app_id: push.onesignal_app_id.clone(),
            api_key: push.onesignal_api_key.clone(),
        }
    }

    /// Send a push notification to the given device player ids.
    pub async fn send(
        &self,
        player_ids: &[String],
        title: &str,
        message: &str,
    ) -> Result<(), PushError> {
        let (Some(app_id), Some(api_key)) = (&self.app_id, &self.api_key) else {
            return Err(PushError::NotConfigured);
        };

        if player_ids.is_empty() {
            return Ok(());
        }

        let payload = json!({
            "app_id": app_id,
            "include_player_ids": player_ids,
            "headings": {"en": title},
            "contents": {"en": message},
        });

        let response = self
            .http
            .post(ONESIGNAL_URL)
            .header("Authorization", format!("Basic {}", api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Push sent to {} devices", player_ids.len());
        Ok(())
    }

    /// Fire-and-forget variant used from request handlers: logs failures,
    /// never surfaces them.
    pub async fn send_best_effort(&self, player_ids: &[String], title: &str, message: &str) {
        match self.send(player_ids, title, message).await {
            Ok(()) => {}
            Err(PushError::NotConfigured) => {
                debug!("Skipping push, OneSignal credentials not configured");
            }
            Err(e) => warn!("Push delivery failed: {}", e),
        }
    }
}
