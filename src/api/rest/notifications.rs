use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::matching::parse_id;
use crate::error::AppError;
use crate::models::notification::{
    NotificationCategory, NotificationEvent, NotificationPriority, RelatedEntity,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications/send", post(send_notification))
        .route("/notifications/user/:user_id", get(list_notifications))
        .route("/notifications/user/:user_id/read-all", put(mark_all_read))
        .route("/notifications/:id/read", put(mark_read))
        .route("/notifications/:id", delete(delete_notification))
}

#[derive(Deserialize)]
pub struct SendNotificationRequest {
    pub recipient_id: Uuid,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub related: Option<RelatedEntity>,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct SendNotificationResponse {
    pub id: Uuid,
    pub queued: bool,
}

#[derive(Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Serialize)]
pub struct InboxResponse {
    pub notifications: Vec<NotificationEvent>,
    pub unread_count: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct ModifiedResponse {
    pub modified_count: usize,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted_count: usize,
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title cannot be empty".to_string()));
    }

    let mut event = NotificationEvent::new(
        payload.recipient_id,
        payload.category,
        payload.title,
        payload.body,
    )
    .with_priority(payload.priority);
    if let Some(related) = payload.related {
        event = event.with_related(related);
    }
    event = match payload.expires_at {
        Some(expires_at) => {
            event.expires_at = expires_at;
            event
        }
        None => event.with_ttl(state.dispatcher.ttl()),
    };

    let id = event.id;
    let summary = state.dispatcher.dispatch(event);

    Ok(Json(SendNotificationResponse {
        id,
        queued: summary.queued == 1,
    }))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<InboxResponse>, AppError> {
    let user_id = parse_id(&user_id, "user id")?;
    let now = Utc::now();

    let notifications = state
        .notifications
        .list_for_user(user_id, query.unread, now);
    let unread_count = state.notifications.unread_count(user_id, now);

    Ok(Json(InboxResponse {
        total: notifications.len(),
        notifications,
        unread_count,
    }))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NotificationEvent>, AppError> {
    let id = parse_id(&id, "notification id")?;

    state
        .notifications
        .mark_read(id, Utc::now())
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ModifiedResponse>, AppError> {
    let user_id = parse_id(&user_id, "user id")?;

    Ok(Json(ModifiedResponse {
        modified_count: state.notifications.mark_all_read(user_id, Utc::now()),
    }))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = parse_id(&id, "notification id")?;

    Ok(Json(DeletedResponse {
        deleted_count: usize::from(state.notifications.delete(id)),
    }))
}
