mod error;
mod format;
mod forward;
mod handler;
mod mailer;
mod message;
mod response;
mod secrets;
mod settings;

pub use error::ContactFormError;
pub use format::{format_message, FormattedMessage};
pub use forward::{InboundEmail, InboundEmailForwarder};
pub use handler::ContactFormMessageHandler;
pub use mailer::{MailError, MailSender, OutboundEmail, SmtpMailSender};
pub use message::{ContactFormMessage, InquiryType, ValidatedContactFormMessage};
pub use secrets::{AwsSecretsManagerSecretRepository, SecretRepository};
pub use settings::{ConfigurationError, MailRouting, Settings, SmtpCredentials};

/// Logging setup shared by the Lambda binaries. CloudWatch timestamps every line already.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();
}
