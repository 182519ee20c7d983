use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::notification::NotificationEvent;
use crate::models::solver::Solver;
use crate::store::{
    AssignmentStore, NotificationSink, SinkError, SolverDirectory, SolverFilter, StoreError,
};

#[derive(Default)]
pub struct MemoryDirectory {
    records: DashMap<Uuid, Solver>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, solver: Solver) {
        self.records.insert(solver.id, solver);
    }

    pub fn get(&self, id: Uuid) -> Option<Solver> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains_solver(&self, id: Uuid) -> bool {
        self.records
            .get(&id)
            .is_some_and(|entry| entry.value().is_solver())
    }

    pub fn list(&self) -> Vec<Solver> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SolverDirectory for MemoryDirectory {
    async fn fetch_solvers(&self, filter: &SolverFilter) -> Result<Vec<Solver>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryAssignmentStore {
    assignments: DashMap<Uuid, Assignment>,
}

impl MemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn get(&self, id: Uuid) -> Result<Option<Assignment>, StoreError> {
        Ok(self.assignments.get(&id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, assignment: Assignment) -> Result<(), StoreError> {
        self.assignments.insert(assignment.id, assignment);
        Ok(())
    }

    async fn replace_if_status(
        &self,
        expected: AssignmentStatus,
        assignment: Assignment,
    ) -> Result<bool, StoreError> {
        // The shard write lock is held from the status check to the write.
        match self.assignments.get_mut(&assignment.id) {
            Some(mut entry) if entry.status == expected => {
                *entry = assignment;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Assignment>, StoreError> {
        let mut assignments: Vec<Assignment> = self
            .assignments
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        assignments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assignments)
    }
}

/// Notification inbox plus a live feed of every stored event.
pub struct MemoryNotificationStore {
    notifications: DashMap<Uuid, NotificationEvent>,
    events_tx: broadcast::Sender<NotificationEvent>,
}

impl MemoryNotificationStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));
        Self {
            notifications: DashMap::new(),
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events_tx.subscribe()
    }

    pub fn insert(&self, event: NotificationEvent) {
        self.notifications.insert(event.id, event.clone());
        let _ = self.events_tx.send(event);
    }

    /// Unexpired notifications for one recipient, newest first.
    pub fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        now: DateTime<Utc>,
    ) -> Vec<NotificationEvent> {
        let mut notifications: Vec<NotificationEvent> = self
            .notifications
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|n| n.recipient_id == user_id && !n.is_expired(now))
            .filter(|n| !unread_only || !n.is_read)
            .collect();

        notifications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        notifications
    }

    pub fn unread_count(&self, user_id: Uuid, now: DateTime<Utc>) -> usize {
        self.notifications
            .iter()
            .filter(|entry| {
                let n = entry.value();
                n.recipient_id == user_id && !n.is_read && !n.is_expired(now)
            })
            .count()
    }

    pub fn mark_read(&self, id: Uuid, now: DateTime<Utc>) -> Option<NotificationEvent> {
        let mut entry = self.notifications.get_mut(&id)?;
        if !entry.is_read {
            entry.mark_read(now);
        }
        Some(entry.clone())
    }

    pub fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> usize {
        let mut modified = 0;
        for mut entry in self.notifications.iter_mut() {
            if entry.recipient_id == user_id && !entry.is_read {
                entry.mark_read(now);
                modified += 1;
            }
        }
        modified
    }

    pub fn delete(&self, id: Uuid) -> bool {
        self.notifications.remove(&id).is_some()
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.notifications.len();
        self.notifications.retain(|_, n| !n.is_expired(now));
        before.saturating_sub(self.notifications.len())
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationStore {
    async fn emit(&self, event: NotificationEvent) -> Result<(), SinkError> {
        self.insert(event);
        Ok(())
    }
}
