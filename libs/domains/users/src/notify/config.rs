use core_config::{ConfigError, FromEnv, env_flag, env_or_default, env_parse, env_required};

/// HTTP SMS gateway settings.
#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub enabled: bool,
    pub gateway_url: String,
    pub api_key: String,
    pub sign_name: String,
    pub template_id: String,
}

impl FromEnv for SmsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        if !env_flag("SMS_ENABLED") {
            return Ok(Self::default());
        }

        Ok(Self {
            enabled: true,
            gateway_url: env_required("SMS_GATEWAY_URL")?,
            api_key: env_required("SMS_API_KEY")?,
            sign_name: env_or_default("SMS_SIGN_NAME", "usercenter"),
            template_id: env_required("SMS_TEMPLATE_ID")?,
        })
    }
}

/// SMTP settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Implicit TLS relay; plain SMTP otherwise (Mailpit and friends)
    pub use_tls: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            from: "usercenter <noreply@localhost>".to_string(),
            use_tls: false,
        }
    }
}

impl FromEnv for MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        if !env_flag("MAIL_ENABLED") {
            return Ok(defaults);
        }

        Ok(Self {
            enabled: true,
            host: env_required("SMTP_HOST")?,
            port: env_parse("SMTP_PORT", 465)?,
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from: env_or_default("MAIL_FROM", &defaults.from),
            use_tls: env_flag("SMTP_USE_TLS"),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub sms: SmsConfig,
    pub mail: MailConfig,
}

impl FromEnv for NotifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            sms: SmsConfig::from_env()?,
            mail: MailConfig::from_env()?,
        })
    }
}
