use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{error, info};

use super::{CodeSender, DISPATCH_TIMEOUT, MailConfig, SendError};
use crate::models::CODE_EXPIRE_MINUTES;

const SUBJECT: &str = "Your verification code";

struct SmtpChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpChannel {
    fn build_message(&self, target: &str, code: &str) -> Result<Message, SendError> {
        let to: Mailbox = target
            .parse()
            .map_err(|_| SendError::InvalidRecipient(target.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body_text(code))
            .map_err(|e| SendError::Smtp(format!("Failed to build email message: {e}")))
    }
}

/// Sends codes by email over SMTP. Without a channel it only logs.
pub struct EmailSender {
    channel: Option<SmtpChannel>,
}

impl EmailSender {
    pub fn new(config: &MailConfig) -> Result<Self, SendError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| SendError::Config(format!("Invalid MAIL_FROM address: {e}")))?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| SendError::Config(format!("Failed to create SMTP relay: {e}")))?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            channel: Some(SmtpChannel {
                transport: builder.timeout(Some(DISPATCH_TIMEOUT)).build(),
                from,
            }),
        })
    }

    pub fn disabled() -> Self {
        Self { channel: None }
    }
}

fn body_text(code: &str) -> String {
    format!(
        "Your verification code is {code}. It is valid for {CODE_EXPIRE_MINUTES} minutes.\n\n\
         If you did not request this code, you can ignore this email."
    )
}

#[async_trait]
impl CodeSender for EmailSender {
    async fn send(&self, target: &str, code: &str) -> Result<(), SendError> {
        let Some(channel) = &self.channel else {
            info!(recipient = %target, code = %code, "Mail disabled, verification code not sent");
            return Ok(());
        };

        let message = channel.build_message(target, code)?;
        channel.transport.send(message).await.map_err(|e| {
            error!(recipient = %target, error = %e, "Failed to send verification email");
            SendError::Smtp(e.to_string())
        })?;

        info!(recipient = %target, "Verification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> MailConfig {
        MailConfig {
            enabled: true,
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_body_mentions_code_and_validity() {
        let body = body_text("004211");
        assert!(body.contains("004211"));
        assert!(body.contains("5 minutes"));
    }

    #[test]
    fn test_invalid_from_is_config_error() {
        let config = MailConfig {
            from: "not an address".to_string(),
            ..enabled_config()
        };
        assert!(matches!(EmailSender::new(&config), Err(SendError::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let sender = EmailSender::new(&enabled_config()).unwrap();
        let err = sender.send("nobody", "123456").await.unwrap_err();
        assert!(matches!(err, SendError::InvalidRecipient(_)));
    }
}
