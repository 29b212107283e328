//! Background KV TTL sweeper — cooperatively cancellable via
//! `tokio_util::sync::CancellationToken`, per §9's explicit-context redesign
//! (no implicit background thread the caller can't stop).

use super::provider::StorageProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawns the sweeper task and returns its join handle. Dropping the
/// returned token's cancellation (or calling `cancel()` on it) stops the
/// loop after its current sleep or sweep completes.
pub fn spawn_ttl_sweeper(
    storage: Arc<dyn StorageProvider>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("kv ttl sweeper stopping");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    match storage.kv_delete_expired(chrono::Utc::now()).await {
                        Ok(count) if count > 0 => debug!(removed = count, "kv ttl sweep removed expired entries"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "kv ttl sweep failed"),
                    }
                }
            }
        }
    })
}
