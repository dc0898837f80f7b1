// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email delivery is not configured")]
    NotConfigured,
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// SMTP transport for OTP verification mail. When the SMTP environment is
/// not configured the mailer degrades to a logged no-op error so account
/// registration still succeeds.
pub struct OtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_email: Option<String>,
}

impl OtpMailer {
    pub fn new() -> Self {
        let smtp = &Config::get().smtp;

        let transport = match (&smtp.host, &smtp.username, &smtp.password) {
            (Some(host), Some(username), Some(password)) => {
                match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
                    Ok(builder) => Some(
                        builder
                            .port(smtp.port)
                            .credentials(Credentials::new(username.clone(), password.clone()))
                            .build(),
                    ),
                    Err(e) => {
                        warn!("Invalid SMTP relay {}: {}", host, e);
                        None
                    }
                }
            }
            _ => None,
        };

        Self {
            transport,
            from_email: smtp.from_email.clone(),
        }
    }

    /// Send the verification code to a freshly registered user.
    pub async fn send_otp(&self, to: &str, username: &str, otp: &str) -> Result<(), MailError> {
        let (Some(transport), Some(from_email)) = (&self.transport, &self.from_email) else {
            return Err(MailError::NotConfigured);
        };

        let body = format!(
            "Hi {username},\n\n\
             Your Ravell verification code is: {otp}\n\n\
             The code expires in 15 minutes. If you did not create an \
             account, you can ignore this message.\n"
        );

        let message = Message::builder()
            .from(from_email.parse()?)
            .to(to.parse()?)
            .subject("Your Ravell verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        transport.send(message).await?;
        info!("OTP email sent to {}", to);
        Ok(())
    }
}
