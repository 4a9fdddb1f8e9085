//! Idle-session eviction and pruning of closed identifiers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SessionsConfig;
use crate::registry::Registry;

/// Close every session idle for longer than `timeout`. Returns how many
/// sessions were closed.
pub async fn sweep_idle(registry: &Registry, timeout: Duration) -> usize {
    let Ok(timeout) = chrono::Duration::from_std(timeout) else {
        return 0;
    };
    let Some(cutoff) = Utc::now().checked_sub_signed(timeout) else {
        return 0;
    };

    let mut evicted = 0_usize;
    for session_id in registry.idle_since(cutoff).await {
        match registry.close(session_id).await {
            Ok(_) => {
                info!(%session_id, "Evicted idle session");
                evicted = evicted.saturating_add(1);
            }
            Err(err) => warn!(%session_id, %err, "Idle session vanished before eviction"),
        }
    }
    evicted
}

/// Forget identifiers closed more than `retention` ago. Returns how many
/// were dropped.
pub async fn prune_closed(registry: &Registry, retention: Duration) -> usize {
    let Ok(retention) = chrono::Duration::from_std(retention) else {
        return 0;
    };
    let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
        return 0;
    };
    let pruned = registry.prune_closed(cutoff).await;
    if pruned > 0 {
        debug!(pruned, "Pruned closed session identifiers");
    }
    pruned
}

/// Spawn the periodic sweep. Returns `None` when both idle eviction
/// (`idle_timeout_secs == 0`) and closed-identifier pruning
/// (`closed_retention_secs == 0`) are disabled.
pub fn spawn_eviction_task(
    registry: Arc<Registry>,
    config: &SessionsConfig,
) -> Option<JoinHandle<()>> {
    let timeout =
        (config.idle_timeout_secs > 0).then(|| Duration::from_secs(config.idle_timeout_secs));
    let retention = (config.closed_retention_secs > 0)
        .then(|| Duration::from_secs(config.closed_retention_secs));
    if timeout.is_none() && retention.is_none() {
        info!("Idle session eviction disabled");
        return None;
    }
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));
    info!(
        idle_timeout_secs = config.idle_timeout_secs,
        closed_retention_secs = config.closed_retention_secs,
        sweep_interval_secs = period.as_secs(),
        "Session sweep enabled"
    );

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Some(timeout) = timeout {
                sweep_idle(&registry, timeout).await;
            }
            if let Some(retention) = retention {
                prune_closed(&registry, retention).await;
            }
        }
    }))
}
