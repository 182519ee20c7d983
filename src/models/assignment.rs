use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Urgency {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    #[default]
    Posted,
    Matched,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;

        matches!(
            (self, next),
            (Posted, Matched)
                | (Matched, InProgress)
                | (InProgress, Completed)
                | (Posted | Matched | InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub location: GeoPoint,
    pub urgency: Urgency,
    pub price: f64,
    pub status: AssignmentStatus,
    pub solver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl Assignment {
    pub fn is_urgent(&self) -> bool {
        self.urgency == Urgency::High
    }
}
