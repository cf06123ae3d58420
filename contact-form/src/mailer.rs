use crate::settings::Settings;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::{Credentials, Mechanism},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::fmt::Display;
use tracing::info;

#[derive(Clone, Debug, PartialEq)]
pub struct OutboundEmail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub reply_to: Option<Mailbox>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// The one boundary between the handlers and whichever service actually delivers mail.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError>;
}

pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    pub fn new(settings: &Settings) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::from_url(&settings.smtp_url)
            .map_err(|error| MailError::InvalidTransport(error.to_string()))?
            .authentication(vec![Mechanism::Plain]);

        if settings.smtp_url.starts_with("smtps://") {
            if let Some(credentials) = settings.credentials.as_ref() {
                builder = builder.credentials(Credentials::new(
                    credentials.username.clone(),
                    credentials.password.clone(),
                ));
            }
        }

        Ok(Self {
            transport: builder.build(),
        })
    }

    fn build_message(email: OutboundEmail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(email.from)
            .to(email.to)
            .subject(email.subject);
        if let Some(reply_to) = email.reply_to {
            builder = builder.reply_to(reply_to);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .map_err(|error| MailError::InvalidMessage(error.to_string()))
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        let message = Self::build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|error| MailError::Delivery(error.to_string()))?;
        info!("SMTP server accepted message");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MailError {
    InvalidTransport(String),
    InvalidMessage(String),
    Delivery(String),
}

impl Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::InvalidTransport(description) => {
                write!(f, "Invalid SMTP configuration: {description}")
            }
            MailError::InvalidMessage(description) => {
                write!(f, "Error building message: {description}")
            }
            MailError::Delivery(description) => write!(f, "Error sending message: {description}"),
        }
    }
}

impl std::error::Error for MailError {}
