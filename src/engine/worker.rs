use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::models::notification::NotificationEvent;
use crate::observability::metrics::Metrics;
use crate::store::{NotificationSink, SinkError};

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub concurrency: usize,
    pub delivery_timeout: Duration,
}

/// Delivers queued notifications to `sink` with at most
/// `settings.concurrency` emits in flight. Once `shutdown` resolves the queue
/// stops accepting events; what is already buffered is still delivered.
/// Returns when the queue is empty and every in-flight delivery has finished.
pub async fn run_notification_workers<F>(
    sink: Arc<dyn NotificationSink>,
    mut rx: mpsc::Receiver<NotificationEvent>,
    settings: WorkerSettings,
    metrics: Metrics,
    shutdown: F,
) where
    F: Future<Output = ()> + Send,
{
    let concurrency = settings
        .concurrency
        .clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
    let limiter = Arc::new(Semaphore::new(concurrency));

    info!(concurrency, "notification workers started");

    tokio::pin!(shutdown);
    let mut closing = false;

    loop {
        let next = tokio::select! {
            event = rx.recv() => event,
            () = &mut shutdown, if !closing => {
                closing = true;
                rx.close();
                info!("notification queue closed; draining buffered events");
                continue;
            }
        };
        let Some(event) = next else {
            break;
        };

        metrics.notifications_in_queue.dec();

        let Ok(permit) = limiter.clone().acquire_owned().await else {
            break;
        };

        let sink = sink.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move {
            deliver(sink.as_ref(), event, settings.delivery_timeout, &metrics).await;
            drop(permit);
        });
    }

    // Every permit back means every spawned delivery has finished.
    // `concurrency` is clamped to u32 above.
    let _ = limiter.acquire_many(concurrency as u32).await;
    info!("notification workers stopped: queue drained");
}

async fn deliver(
    sink: &dyn NotificationSink,
    event: NotificationEvent,
    delivery_timeout: Duration,
    metrics: &Metrics,
) {
    let notification_id = event.id;
    let recipient_id = event.recipient_id;

    let result = match timeout(delivery_timeout, sink.emit(event)).await {
        Ok(result) => result,
        Err(_) => Err(SinkError::Timeout(delivery_timeout.as_millis() as u64)),
    };

    match result {
        Ok(()) => {
            metrics.notification_outcome("delivered");
            debug!(%notification_id, %recipient_id, "notification delivered");
        }
        Err(err) => {
            metrics.notification_outcome("failed");
            warn!(%notification_id, %recipient_id, error = %err, "notification delivery failed");
        }
    }
}
