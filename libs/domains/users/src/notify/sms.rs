use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::{CodeSender, DISPATCH_TIMEOUT, SendError, SmsConfig};
use crate::models::CODE_EXPIRE_MINUTES;

/// Sends codes through an HTTP SMS gateway.
#[derive(Clone)]
pub struct SmsSender {
    config: SmsConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    phone: &'a str,
    sign_name: &'a str,
    template_id: &'a str,
    params: [String; 2],
}

impl SmsSender {
    pub fn new(config: SmsConfig) -> Result<Self, SendError> {
        let client = Client::builder().timeout(DISPATCH_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    pub fn disabled() -> Self {
        Self {
            config: SmsConfig::default(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CodeSender for SmsSender {
    async fn send(&self, target: &str, code: &str) -> Result<(), SendError> {
        if !self.config.enabled {
            info!(recipient = %target, code = %code, "SMS disabled, verification code not sent");
            return Ok(());
        }

        let request = GatewayRequest {
            phone: target,
            sign_name: &self.config.sign_name,
            template_id: &self.config.template_id,
            params: [code.to_string(), CODE_EXPIRE_MINUTES.to_string()],
        };

        let response = self
            .client
            .post(&self.config.gateway_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(recipient = %target, status = %status, "SMS gateway rejected message");
            return Err(SendError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        info!(recipient = %target, "Verification SMS sent");
        Ok(())
    }
}
