//! Verification-code delivery over SMS and email.

mod config;
mod email;
mod sms;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::TargetType;

pub use config::{MailConfig, NotifyConfig, SmsConfig};
pub use email::EmailSender;
pub use sms::SmsSender;

/// Upper bound for one delivery attempt; kept below the server request timeout.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SendError {
    #[error("Sender misconfigured: {0}")]
    Config(String),

    #[error("Invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected the message ({status}): {body}")]
    Gateway { status: u16, body: String },

    #[error("SMTP send failed: {0}")]
    Smtp(String),
}

/// Delivers a verification code to one recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send(&self, target: &str, code: &str) -> Result<(), SendError>;
}

/// One sender per delivery channel.
#[derive(Clone)]
pub struct CodeSenders {
    sms: Arc<dyn CodeSender>,
    email: Arc<dyn CodeSender>,
}

impl CodeSenders {
    pub fn new(sms: Arc<dyn CodeSender>, email: Arc<dyn CodeSender>) -> Self {
        Self { sms, email }
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self, SendError> {
        Ok(Self::new(
            Arc::new(SmsSender::new(config.sms.clone())?),
            Arc::new(EmailSender::new(&config.mail)?),
        ))
    }

    /// Both channels only log the code.
    pub fn disabled() -> Self {
        Self::new(Arc::new(SmsSender::disabled()), Arc::new(EmailSender::disabled()))
    }

    pub fn for_target(&self, target_type: TargetType) -> &dyn CodeSender {
        match target_type {
            TargetType::Phone => self.sms.as_ref(),
            TargetType::Email => self.email.as_ref(),
        }
    }
}
