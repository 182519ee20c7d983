use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::engine::notify::NotificationDispatcher;
use crate::engine::queue::NotificationQueue;
use crate::engine::ranking::RankingEngine;
use crate::engine::worker::WorkerSettings;
use crate::models::notification::NotificationEvent;
use crate::observability::metrics::Metrics;
use crate::store::memory::{MemoryAssignmentStore, MemoryDirectory, MemoryNotificationStore};
use crate::store::{AssignmentStore, SolverDirectory};

pub struct AppState {
    pub solvers: Arc<MemoryDirectory>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub notifications: Arc<MemoryNotificationStore>,
    pub ranking: RankingEngine,
    pub dispatcher: NotificationDispatcher,
    pub worker_settings: WorkerSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let solvers = Arc::new(MemoryDirectory::new());
        Self::with_directory(config, solvers.clone(), solvers)
    }

    /// Ranks against `directory` instead of the registry behind `/solvers`.
    pub fn with_directory(
        config: &Config,
        solvers: Arc<MemoryDirectory>,
        directory: Arc<dyn SolverDirectory>,
    ) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let metrics = Metrics::new();
        let (queue, notification_rx) =
            NotificationQueue::new(config.notification_queue_size, metrics.clone());

        let ranking = RankingEngine::new(
            directory,
            config.scoring,
            config.directory_timeout(),
            config.top_n,
            metrics.clone(),
        );

        (
            Self {
                solvers,
                assignments: Arc::new(MemoryAssignmentStore::new()),
                notifications: Arc::new(MemoryNotificationStore::new(config.event_buffer_size)),
                ranking,
                dispatcher: NotificationDispatcher::new(queue, config.notification_ttl()),
                worker_settings: WorkerSettings {
                    concurrency: config.notification_workers,
                    delivery_timeout: config.delivery_timeout(),
                },
                metrics,
            },
            notification_rx,
        )
    }
}
