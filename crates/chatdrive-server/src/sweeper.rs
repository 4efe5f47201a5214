//! Periodic removal of abandoned authorization states
//!
//! A user who opens the consent link and never finishes leaves a CSRF state
//! behind. The sweeper deletes states older than the configured TTL so the
//! table does not grow without bound.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatdrive_core::ports::ICsrfStateStore;

/// Deletes every state created more than `ttl` ago
///
/// # Returns
/// The number of states removed
pub async fn sweep_once(
    states: &dyn ICsrfStateStore,
    ttl: chrono::Duration,
) -> anyhow::Result<u64> {
    let cutoff = Utc::now() - ttl;
    let removed = states.prune_older_than(cutoff).await?;
    if removed > 0 {
        info!(removed, "Pruned expired authorization states");
    } else {
        debug!("No expired authorization states");
    }
    Ok(removed)
}

/// Runs [`sweep_once`] every `interval` until `shutdown` is cancelled
///
/// Failures are logged and the next tick tries again.
pub async fn run_state_sweeper(
    states: Arc<dyn ICsrfStateStore>,
    ttl: chrono::Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = interval.as_secs(), "State sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweep_once(states.as_ref(), ttl).await {
                    warn!(error = %e, "Failed to prune authorization states");
                }
            }
            _ = shutdown.cancelled() => {
                info!("State sweeper stopping");
                break;
            }
        }
    }
}
