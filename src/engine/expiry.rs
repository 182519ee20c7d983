use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::store::memory::MemoryNotificationStore;

/// Deletes notifications past their `expires_at` once per `every`.
pub async fn run_expiry_sweeper(store: Arc<MemoryNotificationStore>, every: Duration) {
    let mut ticker = interval(every.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let removed = store.purge_expired(Utc::now());
        if removed > 0 {
            info!(removed, "expired notifications purged");
        }
    }
}
