use crate::secrets::SecretRepository;
use lettre::message::Mailbox;
use serde::Deserialize;
use std::fmt::Display;
use tracing::{info, warn};

pub(crate) const DEFAULT_SMTP_URL: &str = "smtps://smtp.gmail.com";
pub(crate) const DEFAULT_SMTP_CREDENTIALS_SECRET: &str = "smtp-credentials";
const DEFAULT_SENDER_NAME: &str = "AlphaFrame Website";

/// Everything the handlers need from the environment, validated once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub smtp_url: String,
    pub credentials: Option<SmtpCredentials>,
    pub routing: MailRouting,
}

/// Where outgoing mail comes from and goes to.
#[derive(Clone, Debug)]
pub struct MailRouting {
    pub sender: Mailbox,
    pub recipient: Mailbox,
}

#[derive(Deserialize, Clone)]
pub struct SmtpCredentials {
    #[serde(rename = "SMTP_USERNAME")]
    pub username: String,
    #[serde(rename = "SMTP_PASSWORD")]
    pub password: String,
}

impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Settings {
    pub async fn load<SecretRepositoryT: SecretRepository>(
        secrets_repository: &SecretRepositoryT,
    ) -> Result<Self, ConfigurationError> {
        let smtp_url = env_setting("SMTP_URL").unwrap_or_else(|| DEFAULT_SMTP_URL.into());
        info!("Using SMTP server {}", redact_url(&smtp_url));
        let credentials = if smtp_url.starts_with("smtps://") {
            Some(Self::load_credentials(secrets_repository).await?)
        } else {
            // Sending credentials over a non-TLS connection is risky, so they are only ever
            // attached to smtps URLs.
            if env_setting("EMAIL_USER").is_some() {
                warn!("Not sending EMAIL_USER and EMAIL_PASS over non-TLS SMTP URL");
            }
            None
        };
        // EMAIL_USER still names the owner's mailbox when no credentials are sent.
        let username = credentials
            .as_ref()
            .map(|credentials| credentials.username.clone())
            .or_else(|| env_setting("EMAIL_USER"));
        let routing = MailRouting::load(username.as_deref())?;
        Ok(Self {
            smtp_url,
            credentials,
            routing,
        })
    }

    async fn load_credentials<SecretRepositoryT: SecretRepository>(
        secrets_repository: &SecretRepositoryT,
    ) -> Result<SmtpCredentials, ConfigurationError> {
        if let (Some(username), Some(password)) =
            (env_setting("EMAIL_USER"), env_setting("EMAIL_PASS"))
        {
            return Ok(SmtpCredentials { username, password });
        }
        let secret_name = env_setting("SMTP_CREDENTIALS_SECRET")
            .unwrap_or_else(|| DEFAULT_SMTP_CREDENTIALS_SECRET.into());
        let secret: Result<SmtpCredentials, _> =
            secrets_repository.get_secret(&secret_name).await;
        match secret {
            Ok(credentials) => Ok(credentials),
            Err(error) => Err(ConfigurationError::MissingCredentials {
                secret_name,
                description: error.to_string(),
            }),
        }
    }
}

impl MailRouting {
    fn load(username: Option<&str>) -> Result<Self, ConfigurationError> {
        let sender = match env_setting("SENDER_ADDRESS") {
            Some(address) => parse_mailbox("SENDER_ADDRESS", &address)?,
            None => {
                let Some(username) = username else {
                    return Err(ConfigurationError::MissingSetting("SENDER_ADDRESS"));
                };
                parse_mailbox(
                    "SENDER_ADDRESS",
                    &format!("{DEFAULT_SENDER_NAME} <{username}>"),
                )?
            }
        };
        let recipient = match env_setting("RECIPIENT_ADDRESS") {
            Some(address) => parse_mailbox("RECIPIENT_ADDRESS", &address)?,
            None => {
                let Some(username) = username else {
                    return Err(ConfigurationError::MissingSetting("RECIPIENT_ADDRESS"));
                };
                parse_mailbox("RECIPIENT_ADDRESS", username)?
            }
        };
        Ok(Self { sender, recipient })
    }
}

fn env_setting(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_mailbox(setting: &'static str, value: &str) -> Result<Mailbox, ConfigurationError> {
    value
        .parse()
        .map_err(|error| ConfigurationError::InvalidAddress {
            setting,
            description: format!("{value}: {error}"),
        })
}

fn redact_url(url: &str) -> &str {
    match url.rsplit_once('@') {
        Some((_, host)) => host,
        None => url,
    }
}

#[derive(Debug)]
pub enum ConfigurationError {
    MissingSetting(&'static str),
    InvalidAddress {
        setting: &'static str,
        description: String,
    },
    MissingCredentials {
        secret_name: String,
        description: String,
    },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::MissingSetting(key) => write!(f, "Missing setting {key}"),
            ConfigurationError::InvalidAddress {
                setting,
                description,
            } => write!(f, "Invalid address in {setting}: {description}"),
            ConfigurationError::MissingCredentials {
                secret_name,
                description,
            } => write!(
                f,
                "No SMTP credentials in EMAIL_USER/EMAIL_PASS and unable to read secret {secret_name}: {description}"
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}
