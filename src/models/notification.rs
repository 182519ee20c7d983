use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    // buyer side
    SolverMatched,
    AssignmentAccepted,
    AssignmentDelivered,
    AssignmentCompleted,
    PaymentConfirmed,
    ChatMessage,
    // solver side
    NewAssignment,
    AssignmentUrgent,
    AssignmentCancelled,
    PaymentReceived,
    BuyerMessage,
    RatingReceived,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelatedType {
    Assignment,
    Payment,
    Chat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelatedEntity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: RelatedType,
}

impl RelatedEntity {
    pub fn assignment(id: Uuid) -> Self {
        Self {
            id,
            kind: RelatedType::Assignment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub related: Option<RelatedEntity>,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Fresh unread event expiring [`DEFAULT_TTL_DAYS`] after now; use
    /// [`with_ttl`](Self::with_ttl) to override.
    pub fn new(
        recipient_id: Uuid,
        category: NotificationCategory,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            category,
            title: title.into(),
            body: body.into(),
            related: None,
            priority: NotificationPriority::default(),
            is_read: false,
            read_at: None,
            created_at,
            expires_at: created_at + Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    pub fn with_related(mut self, related: RelatedEntity) -> Self {
        self.related = Some(related);
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = self.created_at + ttl;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        self.is_read = true;
        self.read_at = Some(now);
    }
}
