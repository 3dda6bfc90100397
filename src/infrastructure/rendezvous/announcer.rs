use super::Rendezvous;
use crate::infrastructure::observability::HealthChecker;
use crate::shared::metrics::METRICS;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Announces `addr` under `topic` immediately and then every `interval`.
///
/// Failures are logged and retried on the next tick; they never stop the
/// loop. A failed announce marks `health` degraded until the next success.
/// Runs until `shutdown` fires.
pub fn spawn_announcer(
    rendezvous: Arc<dyn Rendezvous>,
    topic: String,
    addr: SocketAddr,
    interval: Duration,
    health: Arc<HealthChecker>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match rendezvous.announce(&topic, addr).await {
                        Ok(()) => {
                            debug!(%topic, %addr, "announced");
                            health.mark_recovered();
                        }
                        Err(e) => {
                            warn!(%topic, %addr, "announce failed: {}", e);
                            METRICS.errors_total.with_label_values(&["announce"]).inc();
                            health.mark_degraded();
                        }
                    }
                }
            }
        }

        debug!(%topic, %addr, "announcer stopped");
    })
}
