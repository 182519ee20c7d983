//! Collaborator seams of the matching core.
//!
//! The ranking engine and the notification workers only see these traits;
//! [`memory`] holds the in-process implementations the service runs with.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::notification::NotificationEvent;
use crate::models::solver::{Role, Solver};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("delivery timed out after {0}ms")]
    Timeout(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverFilter {
    pub role: Option<Role>,
}

impl SolverFilter {
    pub fn solvers() -> Self {
        Self {
            role: Some(Role::Solver),
        }
    }

    pub fn matches(&self, solver: &Solver) -> bool {
        self.role.is_none_or(|role| solver.role == role)
    }
}

#[async_trait]
pub trait SolverDirectory: Send + Sync {
    async fn fetch_solvers(&self, filter: &SolverFilter) -> Result<Vec<Solver>, StoreError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Assignment>, StoreError>;

    /// Inserts or replaces by id.
    async fn put(&self, assignment: Assignment) -> Result<(), StoreError>;

    /// Replaces the stored record only while its status is still `expected`.
    /// Returns `false`, writing nothing, when the record is missing or has
    /// moved on.
    async fn replace_if_status(
        &self,
        expected: AssignmentStatus,
        assignment: Assignment,
    ) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<Assignment>, StoreError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> Result<(), SinkError>;
}
