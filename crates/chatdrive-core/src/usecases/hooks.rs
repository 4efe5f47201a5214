//! Post-transition hooks
//!
//! Side effects that follow a committed connection state change (linking the
//! matching rich menu, for instance). Hooks run in registration order after
//! the state change is persisted. Each one is independently fallible and
//! independently logged; none can fail the operation that triggered it.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::domain::{ConnectionState, UserIdentity};
use crate::ports::IChatMessenger;

/// A side effect run after a user's connection state changes
#[async_trait::async_trait]
pub trait IConnectionHook: Send + Sync {
    /// Name used in log fields
    fn name(&self) -> &str;

    /// Called once the new `state` for `user` has been committed
    async fn on_transition(&self, user: &UserIdentity, state: ConnectionState)
        -> anyhow::Result<()>;
}

/// Ordered list of hooks
#[derive(Clone, Default)]
pub struct TransitionHooks {
    hooks: Vec<Arc<dyn IConnectionHook>>,
}

impl TransitionHooks {
    /// Creates an empty hook list
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook
    #[must_use]
    pub fn with(mut self, hook: Arc<dyn IConnectionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs every hook, logging failures
    pub async fn run(&self, user: &UserIdentity, state: ConnectionState) {
        for hook in &self.hooks {
            match hook.on_transition(user, state).await {
                Ok(()) => debug!(hook = hook.name(), user = %user, %state, "Hook completed"),
                Err(e) => warn!(
                    hook = hook.name(),
                    user = %user,
                    %state,
                    error = format!("{e:#}"),
                    "Post-transition hook failed"
                ),
            }
        }
    }
}

/// Links the rich menu matching the user's connection state
pub struct UiStateSyncHook {
    messenger: Arc<dyn IChatMessenger>,
    connected_id: Option<String>,
    disconnected_id: Option<String>,
}

impl UiStateSyncHook {
    /// Creates the hook
    ///
    /// # Arguments
    ///
    /// * `messenger` - Chat platform adapter that performs the linking
    /// * `connected_id` - Affordance for users with a credential
    /// * `disconnected_id` - Affordance for users without one
    pub fn new(
        messenger: Arc<dyn IChatMessenger>,
        connected_id: Option<String>,
        disconnected_id: Option<String>,
    ) -> Self {
        Self {
            messenger,
            connected_id,
            disconnected_id,
        }
    }

    /// The affordance configured for `state`, if any
    pub fn affordance_for(&self, state: ConnectionState) -> Option<&str> {
        match state {
            ConnectionState::Connected => self.connected_id.as_deref(),
            ConnectionState::Disconnected => self.disconnected_id.as_deref(),
        }
    }
}

#[async_trait::async_trait]
impl IConnectionHook for UiStateSyncHook {
    fn name(&self) -> &str {
        "ui_state_sync"
    }

    async fn on_transition(
        &self,
        user: &UserIdentity,
        state: ConnectionState,
    ) -> anyhow::Result<()> {
        let Some(affordance) = self.affordance_for(state) else {
            debug!(user = %user, %state, "No UI affordance configured for state");
            return Ok(());
        };

        self.messenger
            .link_ui_state(user, affordance)
            .await
            .with_context(|| format!("Failed to link affordance {affordance} for {state} state"))
    }
}
