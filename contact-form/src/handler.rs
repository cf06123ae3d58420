use crate::{
    error::ContactFormError,
    format::format_message,
    mailer::{MailSender, OutboundEmail},
    message::{ContactFormMessage, ValidatedContactFormMessage},
    response::{add_cors_headers, json_response, preflight_response},
    settings::MailRouting,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestPayloadExt, Response,
};
use lettre::{message::Mailbox, Address};
use serde_json::json;
use tracing::{info, warn};

/// Validates contact form submissions and passes them on to the site owner by mail.
pub struct ContactFormMessageHandler<MailSenderT: MailSender> {
    mailer: MailSenderT,
    routing: MailRouting,
}

impl<MailSenderT: MailSender> ContactFormMessageHandler<MailSenderT> {
    pub fn new(mailer: MailSenderT, routing: MailRouting) -> Self {
        Self { mailer, routing }
    }

    pub async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        if event.method() == Method::OPTIONS {
            return Ok(preflight_response()?);
        }
        let mut response = match self.process_request(&event).await {
            Ok(()) => json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": "Message sent" }),
            )?,
            Err(error) => {
                error.log();
                error.into_response()?
            }
        };
        add_cors_headers(&mut response);
        Ok(response)
    }

    async fn process_request(&self, event: &Request) -> Result<(), ContactFormError> {
        if event.method() != Method::POST {
            return Err(ContactFormError::MethodNotAllowed {
                method: event.method().clone(),
                allow: "POST, OPTIONS",
            });
        }
        let message: ContactFormMessage = match event.payload() {
            Ok(Some(message)) => message,
            Ok(None) => return Err(ContactFormError::ClientError("Missing fields".into())),
            Err(error) => {
                warn!("Unable to parse request body: {error}");
                return Err(ContactFormError::ClientError(
                    "Invalid request body".into(),
                ));
            }
        };
        let validated_message = message.validate()?;
        let email = self.construct_email_message(&validated_message)?;
        self.send_email(email).await
    }

    fn construct_email_message(
        &self,
        message: &ValidatedContactFormMessage,
    ) -> Result<OutboundEmail, ContactFormError> {
        let Ok(reply_to_address) = message.email.parse::<Address>() else {
            return Err(ContactFormError::ClientError(
                "Invalid email address".into(),
            ));
        };
        let formatted = format_message(message).map_err(|error| {
            ContactFormError::InternalError {
                error: "Failed to compose email",
                description: format!("Error rendering message: {error}"),
            }
        })?;
        Ok(OutboundEmail {
            from: self.routing.sender.clone(),
            to: self.routing.recipient.clone(),
            reply_to: Some(Mailbox::new(Some(message.name.into()), reply_to_address)),
            subject: formatted.subject,
            text_body: formatted.text_body,
            html_body: formatted.html_body,
        })
    }

    async fn send_email(&self, email: OutboundEmail) -> Result<(), ContactFormError> {
        let subject = email.subject.clone();
        match self.mailer.send(email).await {
            Ok(()) => {
                info!("Sent contact form message \"{subject}\"");
                Ok(())
            }
            Err(error) => Err(ContactFormError::InternalError {
                error: "Failed to send email",
                description: error.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ContactFormMessageHandler;
    use crate::{
        mailer::{test_support::RecordingMailSender, MailError, OutboundEmail},
        settings::MailRouting,
    };
    use googletest::prelude::*;
    use lambda_http::{
        http::{HeaderValue, Method},
        Body, Request, Response,
    };
    use serde::Serialize;
    use serde_json::{json, Value};

    type ContactFormMessageHandlerForTesting = ContactFormMessageHandler<RecordingMailSender>;

    fn routing() -> MailRouting {
        MailRouting {
            sender: "AlphaFrame Website <website@alphaframe.test>".parse().unwrap(),
            recipient: "owner@alphaframe.test".parse().unwrap(),
        }
    }

    fn handler() -> ContactFormMessageHandlerForTesting {
        ContactFormMessageHandler::new(RecordingMailSender::default(), routing())
    }

    fn body_json(response: &Response<Body>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    #[googletest::test]
    #[tokio::test]
    async fn sends_founder_inquiry_and_returns_200() {
        let subject = handler();
        let event = EventPayload::minimal().into_event();

        let response = subject.handle(event).await.unwrap();

        expect_that!(response.status().as_u16(), eq(200));
        expect_that!(
            body_json(&response),
            eq(json!({ "success": true, "message": "Message sent" }))
        );
        let sent = subject.mailer.sent();
        expect_that!(sent, len(eq(1)));
        expect_that!(sent[0].subject, eq("[FOUNDER INQUIRY] from Jo"));
        expect_that!(sent[0].to.email.to_string(), eq("owner@alphaframe.test"));
        expect_that!(
            sent[0].from.email.to_string(),
            eq("website@alphaframe.test")
        );
        expect_that!(
            sent[0].reply_to.as_ref().map(|mailbox| mailbox.email.to_string()),
            some(eq("jo@x.com"))
        );
        expect_that!(sent[0].text_body, contains_substring("Hi"));
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_when_name_is_missing() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            name: None,
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))?;
        verify_that!(body_json(&response), eq(json!({ "error": "Missing fields" })))?;
        verify_that!(subject.mailer.sent(), empty())
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_when_email_is_missing() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            email: None,
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_when_message_is_missing() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            message: None,
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))
    }

    #[googletest::test]
    #[tokio::test]
    async fn accepts_product_inquiry_without_message() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            message: None,
            inquiry_type: Some("product_inquiry".into()),
            product_name: Some("Lens".into()),
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(200))?;
        verify_that!(
            subject.mailer.sent(),
            elements_are![field!(
                OutboundEmail.subject,
                eq("[PRODUCT INQUIRY] Lens from Jo")
            )]
        )
    }

    #[googletest::test]
    #[tokio::test]
    async fn marks_marketer_inquiry_as_hunter_application() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            inquiry_type: Some("marketer".into()),
            ..EventPayload::minimal()
        }
        .into_event();

        subject.handle(event).await.unwrap();

        verify_that!(
            subject.mailer.sent(),
            elements_are![field!(
                OutboundEmail.subject,
                contains_substring("[HUNTER APPLICATION]")
            )]
        )
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_405_for_other_methods() {
        let subject = handler();
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let mut event = EventPayload::minimal().into_event();
            *event.method_mut() = method;

            let response = subject.handle(event).await.unwrap();

            expect_that!(response.status().as_u16(), eq(405));
            expect_that!(
                body_json(&response),
                eq(json!({ "error": "Method not allowed" }))
            );
            expect_that!(header(&response, "Allow"), some(eq("POST, OPTIONS")));
        }
        expect_that!(subject.mailer.sent(), empty());
    }

    #[googletest::test]
    #[tokio::test]
    async fn answers_preflight_with_cors_headers() {
        let subject = handler();
        let mut event = Request::new(Body::Empty);
        *event.method_mut() = Method::OPTIONS;

        let response = subject.handle(event).await.unwrap();

        expect_that!(response.status().as_u16(), eq(204));
        expect_that!(header(&response, "Access-Control-Allow-Origin"), some(eq("*")));
        expect_that!(
            header(&response, "Access-Control-Allow-Methods"),
            some(eq("POST, OPTIONS"))
        );
        expect_that!(
            header(&response, "Access-Control-Allow-Headers"),
            some(eq("Content-Type"))
        );
    }

    #[googletest::test]
    #[tokio::test]
    async fn adds_cors_headers_to_error_responses() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            name: None,
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(header(&response, "Access-Control-Allow-Origin"), some(eq("*")))
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_for_malformed_json() -> Result<()> {
        let subject = handler();
        let event = json_event("{ not json".into());

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))?;
        verify_that!(
            body_json(&response),
            eq(json!({ "error": "Invalid request body" }))
        )
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_without_json_body() -> Result<()> {
        let subject = handler();
        let mut event = Request::new(Body::Empty);
        *event.method_mut() = Method::POST;

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_for_invalid_email_address() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            email: Some("not an address".into()),
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))?;
        verify_that!(
            body_json(&response),
            eq(json!({ "error": "Invalid email address" }))
        )
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_400_for_line_break_in_name() -> Result<()> {
        let subject = handler();
        let event = EventPayload {
            name: Some("Jo\r\nBcc: x@y.com".into()),
            ..EventPayload::minimal()
        }
        .into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(400))?;
        verify_that!(body_json(&response), eq(json!({ "error": "Invalid name" })))?;
        verify_that!(subject.mailer.sent(), empty())
    }

    #[googletest::test]
    #[tokio::test]
    async fn returns_500_when_mail_cannot_be_sent() -> Result<()> {
        let subject = ContactFormMessageHandler::new(
            RecordingMailSender::failing_with(MailError::Delivery("Connection refused".into())),
            routing(),
        );
        let event = EventPayload::minimal().into_event();

        let response = subject.handle(event).await.unwrap();

        verify_that!(response.status().as_u16(), eq(500))?;
        verify_that!(
            body_json(&response),
            eq(json!({
                "error": "Failed to send email",
                "details": "Error sending message: Connection refused"
            }))
        )
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct EventPayload {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        inquiry_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
    }

    impl EventPayload {
        fn minimal() -> Self {
            Self {
                name: Some("Jo".into()),
                email: Some("jo@x.com".into()),
                message: Some("Hi".into()),
                inquiry_type: None,
                product_name: None,
            }
        }

        fn into_event(self) -> Request {
            json_event(serde_json::to_string(&self).unwrap())
        }
    }

    fn json_event(body: String) -> Request {
        let mut event = Request::new(Body::Text(body));
        *event.method_mut() = Method::POST;
        event
            .headers_mut()
            .append("Content-Type", HeaderValue::from_static("application/json"));
        event
    }
}
