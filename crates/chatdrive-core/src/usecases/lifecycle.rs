//! Credential lifecycle use case
//!
//! Disconnect and reconnect. Local state wins over remote state: a failed
//! revoke at the provider never leaves the user stuck "connected", and only
//! a failed local delete is treated as an inconsistency.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{ConnectionError, ConnectionState, UserIdentity};
use crate::ports::{ICredentialStore, IIdentityProvider};
use crate::usecases::authorize::AuthorizationFlow;
use crate::usecases::hooks::TransitionHooks;

/// Revokes and re-establishes stored credentials
pub struct CredentialLifecycle {
    identity: Arc<dyn IIdentityProvider>,
    credentials: Arc<dyn ICredentialStore>,
    flow: Arc<AuthorizationFlow>,
    hooks: TransitionHooks,
}

impl CredentialLifecycle {
    /// Creates a new CredentialLifecycle
    ///
    /// # Arguments
    ///
    /// * `identity` - Provider whose revocation endpoint is called
    /// * `credentials` - Store holding the credential to remove
    /// * `flow` - Used by [`Self::reconnect`] to start a new authorization
    /// * `hooks` - Side effects run after a successful disconnect
    pub fn new(
        identity: Arc<dyn IIdentityProvider>,
        credentials: Arc<dyn ICredentialStore>,
        flow: Arc<AuthorizationFlow>,
        hooks: TransitionHooks,
    ) -> Self {
        Self {
            identity,
            credentials,
            flow,
            hooks,
        }
    }

    /// Current connection state of `user`
    ///
    /// # Errors
    /// [`ConnectionError::Persistence`] if the credential store failed
    pub async fn connection_state(
        &self,
        user: &UserIdentity,
    ) -> Result<ConnectionState, ConnectionError> {
        let credential = self
            .credentials
            .get(user)
            .await
            .map_err(ConnectionError::Persistence)?;
        Ok(ConnectionState::from_credential(credential.as_ref()))
    }

    /// Disconnects `user`
    ///
    /// # Errors
    /// - [`ConnectionError::NotFound`] if the user has no credential
    /// - [`ConnectionError::Persistence`] if the credential could not be read
    /// - [`ConnectionError::CriticalInconsistency`] if the local delete failed
    pub async fn revoke(&self, user: &UserIdentity) -> Result<(), ConnectionError> {
        let credential = self
            .credentials
            .get(user)
            .await
            .map_err(ConnectionError::Persistence)?
            .ok_or(ConnectionError::NotFound)?;

        // Step 1: remote revoke, best effort
        if let Err(e) = self.identity.revoke(credential.revocation_token()).await {
            warn!(user = %user, error = %e, "Remote revoke failed, deleting local credential anyway");
        }

        // Step 2: local delete, unconditional
        match self.credentials.delete(user).await {
            Ok(existed) => {
                if !existed {
                    warn!(user = %user, "Credential vanished before delete");
                }
            }
            Err(e) => {
                error!(
                    user = %user,
                    error = format!("{e:#}"),
                    "Failed to delete local credential after revoke attempt"
                );
                return Err(ConnectionError::CriticalInconsistency(e));
            }
        }

        info!(user = %user, "Storage account disconnected");

        self.hooks.run(user, ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Revokes any existing credential and starts a new authorization
    ///
    /// # Returns
    /// The consent URL for the new authorization
    ///
    /// # Errors
    /// Only failures of [`AuthorizationFlow::begin`]; revoke failures are logged
    pub async fn reconnect(&self, user: &UserIdentity) -> Result<String, ConnectionError> {
        match self.revoke(user).await {
            Ok(()) | Err(ConnectionError::NotFound) => {}
            Err(e) => warn!(user = %user, error = %e, "Revoke before reconnect failed"),
        }

        self.flow.begin(user).await
    }
}
