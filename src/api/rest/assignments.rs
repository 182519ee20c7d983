use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::matching::{
    AssignmentDraft, create_and_match, parse_id, resolve_assignment, transition_status,
};
use crate::engine::notify::DispatchSummary;
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::ranking::ScoredCandidate;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assignments", post(create_assignment).get(list_assignments))
        .route("/assignments/:id", get(get_assignment))
        .route("/assignments/:id/status", patch(update_status))
        .route("/match/solvers", post(match_solvers))
}

#[derive(Serialize)]
pub struct CreateAssignmentResponse {
    pub assignment: Assignment,
    pub top_solvers: Vec<ScoredCandidate>,
    pub notifications_queued: usize,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AssignmentStatus,
    #[serde(default)]
    pub solver_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub assignment: Assignment,
    pub notifications: DispatchSummary,
}

async fn create_assignment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssignmentDraft>,
) -> Result<Json<CreateAssignmentResponse>, AppError> {
    let (assignment, outcome) = create_and_match(&state, payload).await?;

    Ok(Json(CreateAssignmentResponse {
        assignment,
        top_solvers: outcome.candidates,
        notifications_queued: outcome.notifications.queued,
    }))
}

async fn list_assignments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    Ok(Json(state.assignments.list().await?))
}

async fn get_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    let id = parse_id(&id, "assignment id")?;
    Ok(Json(resolve_assignment(&state, id).await?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    let id = parse_id(&id, "assignment id")?;
    let (assignment, notifications) =
        transition_status(&state, id, payload.status, payload.solver_id).await?;

    Ok(Json(UpdateStatusResponse {
        assignment,
        notifications,
    }))
}

/// Accepts `{"assignment_id": "..."}` (or `assignmentId`) naming a stored
/// assignment, or an inline assignment descriptor. Read-only: nothing is
/// persisted and no notifications are sent.
async fn match_solvers(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<ScoredCandidate>>, AppError> {
    let reference = body.get("assignment_id").or_else(|| body.get("assignmentId"));

    let assignment = match reference {
        Some(Value::String(raw)) => {
            let id = parse_id(raw, "assignment_id")?;
            resolve_assignment(&state, id).await?
        }
        Some(_) => {
            return Err(AppError::BadRequest(
                "invalid assignment_id".to_string(),
            ));
        }
        None => serde_json::from_value::<AssignmentDraft>(body)
            .map_err(|err| AppError::BadRequest(format!("invalid assignment payload: {err}")))?
            .into_query(chrono::Utc::now())?,
    };

    Ok(Json(state.ranking.rank_assignment(&assignment).await?))
}
