use contact_form::{
    init_tracing, AwsSecretsManagerSecretRepository, InboundEmailForwarder, SecretRepository,
    Settings, SmtpMailSender,
};
use lambda_http::{run, service_fn, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let secrets_repository = AwsSecretsManagerSecretRepository::open().await;
    let settings = Settings::load(&secrets_repository).await?;
    let mailer = SmtpMailSender::new(&settings)?;
    let forwarder = InboundEmailForwarder::new(mailer, settings.routing);
    run(service_fn(|event| forwarder.handle(event))).await
}
