use crate::{
    listeners::{Listeners, Subscription},
    AuthChangeEvent, AuthClient, AuthError, AuthStateCallback, BackendSettings, BootstrapError,
    EmailCredentials, Session, SignUpOutcome, User,
};
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const SIGN_UP_PATH: &str = "auth/v1/signup";
const TOKEN_PATH: &str = "auth/v1/token?grant_type=password";
const LOGOUT_PATH: &str = "auth/v1/logout";

/// Live client for the backend's authentication API. The current session is kept in memory for
/// the lifetime of the client.
pub struct BackendClient {
    http_client: Client,
    settings: BackendSettings,
    session: Mutex<Option<Session>>,
    listeners: Arc<Listeners>,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Result<Self, BootstrapError> {
        let http_client = Client::builder()
            .build()
            .map_err(BootstrapError::HttpClient)?;
        Ok(Self {
            http_client,
            settings,
            session: Default::default(),
            listeners: Default::default(),
        })
    }

    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::new(BackendSettings::from_env()?)
    }

    fn post(&self, path: &str, bearer: &str) -> RequestBuilder {
        self.http_client
            .post(self.settings.endpoint(path))
            .header("apikey", self.settings.anon_key())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    fn store_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn signed_in(&self, session: &Session) {
        self.store_session(Some(session.clone()));
        info!("Signed in as user {}", session.user.id);
        self.listeners
            .notify(AuthChangeEvent::SignedIn, Some(session));
    }
}

#[async_trait]
impl AuthClient for BackendClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.current_session())
    }

    fn on_auth_state_change(&self, callback: AuthStateCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }

    async fn sign_up(&self, credentials: &EmailCredentials) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .post(SIGN_UP_PATH, self.settings.anon_key())
            .json(credentials)
            .send()
            .await?;
        let outcome = match check_status(response).await?.json().await? {
            SignUpPayload::Session(session) => SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpPayload::User(user) => SignUpOutcome {
                user,
                session: None,
            },
        };
        if let Some(session) = outcome.session.as_ref() {
            self.signed_in(session);
        }
        Ok(outcome)
    }

    async fn sign_in_with_password(
        &self,
        credentials: &EmailCredentials,
    ) -> Result<Session, AuthError> {
        let response = self
            .post(TOKEN_PATH, self.settings.anon_key())
            .json(credentials)
            .send()
            .await?;
        let session: Session = check_status(response).await?.json().await?;
        self.signed_in(&session);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(());
        };
        let result = self
            .post(LOGOUT_PATH, &session.access_token)
            .send()
            .await
            .map_err(AuthError::from);
        let result = match result {
            Ok(response) => check_status(response).await.map(|_| ()),
            Err(error) => Err(error),
        };
        // The local session is gone either way; the backend expires the token on its own.
        if let Err(error) = &result {
            warn!("Error revoking session on backend: {error}");
        }
        self.store_session(None);
        self.listeners.notify(AuthChangeEvent::SignedOut, None);
        result
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpPayload {
    Session(Session),
    User(User),
}

#[derive(Deserialize, Default)]
struct ErrorPayload {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

async fn check_status(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let payload: ErrorPayload = response.json().await.unwrap_or_default();
    let message = payload
        .error_description
        .or(payload.msg)
        .or(payload.message)
        .or(payload.error)
        .unwrap_or_else(|| status.to_string());
    Err(AuthError::Rejected {
        status: status.as_u16(),
        message,
    })
}
