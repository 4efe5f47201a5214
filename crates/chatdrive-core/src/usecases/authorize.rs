//! Authorization flow use case
//!
//! Runs the two halves of the three-legged OAuth handshake:
//!
//! 1. [`AuthorizationFlow::begin`] issues a single-use CSRF state for the
//!    user and returns the provider consent URL carrying its nonce.
//! 2. [`AuthorizationFlow::complete`] consumes that state when the provider
//!    redirects back, exchanges the code, and stores the credential.
//!
//! Absent, stale, replayed, and forged states all surface as the same
//! [`ConnectionError::StateNotFound`] so callers cannot tell them apart.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::domain::{ConnectionError, ConnectionState, CsrfState, Nonce, UserIdentity};
use crate::ports::{ICredentialStore, ICsrfStateStore, IIdentityProvider};
use crate::usecases::hooks::TransitionHooks;

/// Default lifetime of an unconsumed CSRF state
pub const DEFAULT_STATE_TTL_MINUTES: i64 = 15;

/// Begins and completes authorizations
pub struct AuthorizationFlow {
    identity: Arc<dyn IIdentityProvider>,
    credentials: Arc<dyn ICredentialStore>,
    states: Arc<dyn ICsrfStateStore>,
    hooks: TransitionHooks,
    state_ttl: Duration,
}

impl AuthorizationFlow {
    /// Creates a new AuthorizationFlow
    ///
    /// # Arguments
    ///
    /// * `identity` - OAuth provider adapter
    /// * `credentials` - Where exchanged credentials are persisted
    /// * `states` - Where CSRF states live between the two halves
    /// * `hooks` - Side effects run after a successful connect
    pub fn new(
        identity: Arc<dyn IIdentityProvider>,
        credentials: Arc<dyn ICredentialStore>,
        states: Arc<dyn ICsrfStateStore>,
        hooks: TransitionHooks,
    ) -> Self {
        Self {
            identity,
            credentials,
            states,
            hooks,
            state_ttl: Duration::minutes(DEFAULT_STATE_TTL_MINUTES),
        }
    }

    /// Overrides how long an issued state stays redeemable
    #[must_use]
    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Lifetime of an unconsumed state
    pub fn state_ttl(&self) -> Duration {
        self.state_ttl
    }

    /// Starts an authorization for `user`
    ///
    /// # Returns
    /// The consent URL to send to the user
    ///
    /// # Errors
    /// [`ConnectionError::Persistence`] if the state could not be stored
    pub async fn begin(&self, user: &UserIdentity) -> Result<String, ConnectionError> {
        let state = CsrfState::issue(user.clone());

        self.states
            .put(&state)
            .await
            .map_err(ConnectionError::Persistence)?;

        debug!(user = %user, nonce = ?state.nonce, "Issued authorization state");
        Ok(self.identity.authorization_url(&state.nonce))
    }

    /// Completes an authorization from the provider redirect
    ///
    /// # Arguments
    ///
    /// * `nonce` - The `state` query parameter
    /// * `code` - The `code` query parameter
    ///
    /// # Returns
    /// The user the credential was stored for
    ///
    /// # Errors
    /// - [`ConnectionError::StateNotFound`] for unknown, stale, or reused states
    /// - [`ConnectionError::ExchangeFailed`] if the provider rejected the code
    /// - [`ConnectionError::Persistence`] if a local store failed
    pub async fn complete(&self, nonce: &str, code: &str) -> Result<UserIdentity, ConnectionError> {
        // Malformed nonces cannot exist in the store
        let nonce = Nonce::new(nonce).map_err(|_| ConnectionError::StateNotFound)?;

        // Step 1: consume the state; it is gone after this whatever happens
        let state = self
            .states
            .consume(&nonce)
            .await
            .map_err(ConnectionError::Persistence)?
            .ok_or(ConnectionError::StateNotFound)?;

        if state.is_stale(self.state_ttl) {
            debug!(user = %state.owner, "Rejected stale authorization state");
            return Err(ConnectionError::StateNotFound);
        }

        let user = state.owner;

        // Step 2: exchange the code
        let credential = self.identity.exchange_code(code).await.map_err(|e| {
            warn!(user = %user, error = %e, "Authorization code exchange failed");
            ConnectionError::ExchangeFailed(e)
        })?;

        if credential.refresh_token.is_none() {
            warn!(user = %user, "Provider returned no refresh token");
        }

        // Step 3: persist, replacing any previous credential
        self.credentials
            .put(&user, &credential)
            .await
            .map_err(ConnectionError::Persistence)?;

        info!(user = %user, "Storage account connected");

        self.hooks.run(&user, ConnectionState::Connected).await;
        Ok(user)
    }

    /// Ends an authorization the user declined at the consent page
    ///
    /// The state is consumed so the nonce cannot be redeemed later.
    ///
    /// # Returns
    /// The user who started the authorization, if the state was still known
    pub async fn abandon(&self, nonce: &str) -> Result<Option<UserIdentity>, ConnectionError> {
        let Ok(nonce) = Nonce::new(nonce) else {
            return Ok(None);
        };

        let state = self
            .states
            .consume(&nonce)
            .await
            .map_err(ConnectionError::Persistence)?;

        if let Some(state) = &state {
            debug!(user = %state.owner, "Discarded declined authorization state");
        }
        Ok(state.map(|s| s.owner))
    }
}
