//! Client for the hosted backend's authentication API.
//!
//! Construct a [`BackendClient`] once at startup from [`BackendSettings`] and hand it to whatever
//! needs it. Configuration problems surface as [`BootstrapError`] immediately. Callers which
//! must keep running without a backend can opt into [`bootstrap_with_fallback`], which installs
//! an [`UnconfiguredBackend`] and says so in the log.

mod client;
mod listeners;
mod settings;
mod unconfigured;

pub use client::BackendClient;
pub use listeners::Subscription;
pub use settings::{BackendSettings, ANON_KEY_VARIABLE, URL_VARIABLE};
pub use unconfigured::UnconfiguredBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Result of a sign-up. The session is absent when the backend requires the address to be
/// confirmed first.
#[derive(Clone, Debug, PartialEq)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

#[derive(Serialize, Clone, Debug)]
pub struct EmailCredentials {
    pub email: String,
    pub password: String,
}

impl EmailCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
}

pub type AuthStateCallback = Box<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// The session established by the last successful sign-in or sign-up, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    fn on_auth_state_change(&self, callback: AuthStateCallback) -> Subscription;

    async fn sign_up(&self, credentials: &EmailCredentials) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in_with_password(
        &self,
        credentials: &EmailCredentials,
    ) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Missing setting {0}")]
    MissingSetting(&'static str),
    #[error("Invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Unable to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Backend not configured")]
    NotConfigured,
    #[error("Backend rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Error talking to backend: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Builds a live client from the environment, falling back to an [`UnconfiguredBackend`] when
/// the configuration is missing or invalid.
///
/// Prefer [`BackendClient::from_env`] wherever failing at startup is acceptable.
pub fn bootstrap_with_fallback() -> Box<dyn AuthClient> {
    match BackendSettings::from_env().and_then(BackendClient::new) {
        Ok(client) => Box::new(client),
        Err(error) => {
            warn!("Backend client unavailable: {error}");
            warn!("Authentication calls will be rejected until {URL_VARIABLE} and {ANON_KEY_VARIABLE} are set.");
            Box::new(UnconfiguredBackend::default())
        }
    }
}
