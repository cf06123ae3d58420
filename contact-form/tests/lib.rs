use contact_form::{ContactFormMessageHandler, MailRouting, Settings, SmtpMailSender};
use googletest::prelude::*;
use lambda_http::{
    http::{HeaderValue, Method},
    Body, Request,
};
use serial_test::serial;
use std::{sync::OnceLock, time::Duration};
use test_support::{
    fake_smtp::{start_poisoned_smtp_server, FakeSmtpServer},
    setup_logging,
};
use tokio::time::timeout;

fn settings(smtp_url: String) -> Settings {
    Settings {
        smtp_url,
        credentials: None,
        routing: MailRouting {
            sender: "AlphaFrame Website <website@alphaframe.test>".parse().unwrap(),
            recipient: "AlphaFrame Owner <owner@alphaframe.test>".parse().unwrap(),
        },
    }
}

fn handler_for(smtp_url: String) -> ContactFormMessageHandler<SmtpMailSender> {
    let settings = settings(smtp_url);
    let mailer = SmtpMailSender::new(&settings).unwrap();
    ContactFormMessageHandler::new(mailer, settings.routing)
}

fn contact_event(body: &str) -> Request {
    let mut event = Request::new(Body::Text(body.into()));
    *event.method_mut() = Method::POST;
    event
        .headers_mut()
        .append("Content-Type", HeaderValue::from_static("application/json"));
    event
}

#[googletest::test]
#[tokio::test]
#[serial]
async fn sends_email_to_recipient() -> Result<()> {
    setup_logging();
    fake_smtp().start();
    fake_smtp().flush().await;
    let subject = handler_for(FakeSmtpServer::url());
    let event = contact_event(
        r#"{
            "name": "Jo Example",
            "email": "jo@example.com",
            "website": "https://jo.example.com",
            "message": "Hi there"
        }"#,
    );

    let response = subject.handle(event).await.unwrap();

    verify_that!(response.status().as_u16(), eq(200))?;
    verify_that!(
        timeout(Duration::from_secs(10), fake_smtp().last_mail_content()).await,
        ok(ok(all!(
            contains_substring("To: \"AlphaFrame Owner\" <owner@alphaframe.test>"),
            contains_substring("From: \"AlphaFrame Website\" <website@alphaframe.test>"),
            contains_substring("Reply-To: \"Jo Example\" <jo@example.com>"),
            contains_substring("Subject: [FOUNDER INQUIRY] from Jo Example"),
            contains_substring("Hi there")
        )))
    )
}

#[googletest::test]
#[tokio::test]
#[serial]
async fn does_not_send_email_for_invalid_submission() -> Result<()> {
    fake_smtp().start();
    fake_smtp().flush().await;
    let subject = handler_for(FakeSmtpServer::url());
    let event = contact_event(r#"{ "name": "Jo Example", "email": "jo@example.com" }"#);

    let response = subject.handle(event).await.unwrap();

    verify_that!(response.status().as_u16(), eq(400))?;
    verify_that!(
        timeout(Duration::from_secs(1), fake_smtp().last_mail_content()).await,
        err(anything())
    )
}

#[googletest::test]
#[tokio::test]
#[serial]
async fn returns_500_when_smtp_fails() -> Result<()> {
    let subject = handler_for(start_poisoned_smtp_server());
    let event = contact_event(r#"{ "name": "Jo", "email": "jo@example.com", "message": "Hi" }"#);

    let response = subject.handle(event).await.unwrap();

    verify_that!(response.status().as_u16(), eq(500))?;
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    verify_that!(body["error"], eq(serde_json::json!("Failed to send email")))
}

fn fake_smtp() -> &'static FakeSmtpServer {
    static FAKE_SMTP: OnceLock<FakeSmtpServer> = OnceLock::new();
    FAKE_SMTP.get_or_init(FakeSmtpServer::new)
}
