use crate::{
    listeners::Subscription, AuthClient, AuthError, AuthStateCallback, EmailCredentials, Session,
    SignUpOutcome,
};
use async_trait::async_trait;

/// Stand-in used when the backend is not configured: there is never a session, listeners are
/// never called, and every attempt to authenticate fails with [`AuthError::NotConfigured`].
#[derive(Default)]
pub struct UnconfiguredBackend;

#[async_trait]
impl AuthClient for UnconfiguredBackend {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(None)
    }

    fn on_auth_state_change(&self, _callback: AuthStateCallback) -> Subscription {
        Subscription::inert()
    }

    async fn sign_up(&self, _credentials: &EmailCredentials) -> Result<SignUpOutcome, AuthError> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_in_with_password(
        &self,
        _credentials: &EmailCredentials,
    ) -> Result<Session, AuthError> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
