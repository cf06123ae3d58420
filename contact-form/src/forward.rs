use crate::{
    error::ContactFormError,
    format::render_template,
    mailer::{MailSender, OutboundEmail},
    response::json_response,
    settings::MailRouting,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestPayloadExt, Response,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

const FORWARDED_TEMPLATE_NAME: &str = "forwarded-message";
const FORWARDED_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/forwarded-message.html"
));

/// Payload of the inbound-email webhook.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct InboundEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
}

/// Relays mail received on the public domain to the site owner's own mailbox.
pub struct InboundEmailForwarder<MailSenderT: MailSender> {
    mailer: MailSenderT,
    routing: MailRouting,
}

impl<MailSenderT: MailSender> InboundEmailForwarder<MailSenderT> {
    pub fn new(mailer: MailSenderT, routing: MailRouting) -> Self {
        Self { mailer, routing }
    }

    pub async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        match self.process_request(&event).await {
            Ok(()) => Ok(json_response(StatusCode::OK, &json!({ "status": "ok" }))?),
            Err(error) => {
                error.log();
                Ok(error.into_response()?)
            }
        }
    }

    async fn process_request(&self, event: &Request) -> Result<(), ContactFormError> {
        if event.method() != Method::POST {
            return Err(ContactFormError::MethodNotAllowed {
                method: event.method().clone(),
                allow: "POST",
            });
        }
        let inbound: InboundEmail = match event.payload() {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return Err(ContactFormError::ClientError("Missing payload".into())),
            Err(error) => {
                warn!("Unable to parse webhook payload: {error}");
                return Err(ContactFormError::ClientError(
                    "Invalid request body".into(),
                ));
            }
        };
        let email = self.construct_forwarded_message(&inbound)?;
        let subject = email.subject.clone();
        self.mailer
            .send(email)
            .await
            .map_err(|error| ContactFormError::InternalError {
                error: "Internal Server Error",
                description: error.to_string(),
            })?;
        info!("Forwarded inbound message \"{subject}\"");
        Ok(())
    }

    fn construct_forwarded_message(
        &self,
        inbound: &InboundEmail,
    ) -> Result<OutboundEmail, ContactFormError> {
        let subject = format!(
            "[New Inquiry] {}",
            inbound.subject.as_deref().unwrap_or("(no subject)")
        );
        let html_body = render_template(FORWARDED_TEMPLATE_NAME, FORWARDED_TEMPLATE, inbound)
            .map_err(|error| ContactFormError::InternalError {
                error: "Internal Server Error",
                description: format!("Error rendering forwarded message: {error}"),
            })?;
        let text_body = format!(
            "From: {}\nTo: {}\n\n{}\n",
            inbound.from.as_deref().unwrap_or_default(),
            inbound.to.as_deref().unwrap_or_default(),
            inbound
                .text
                .as_deref()
                .or(inbound.html.as_deref())
                .unwrap_or_default(),
        );
        Ok(OutboundEmail {
            from: self.routing.sender.clone(),
            to: self.routing.recipient.clone(),
            reply_to: inbound.from.as_deref().and_then(|from| from.parse().ok()),
            subject,
            text_body,
            html_body,
        })
    }
}
