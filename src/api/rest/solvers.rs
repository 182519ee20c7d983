use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::matching::parse_id;
use crate::error::AppError;
use crate::models::geo::GeoPoint;
use crate::models::ranking::RankedBuyer;
use crate::models::solver::{Role, Solver};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/solvers", post(create_solver).get(list_solvers))
        .route("/solvers/:id", get(get_solver).put(update_solver))
        .route("/buyers/top", get(top_buyers))
}

#[derive(Deserialize)]
pub struct CreateSolverRequest {
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub price_per_job: f64,
    #[serde(default)]
    pub avg_speed_hours: f64,
    #[serde(default)]
    pub location: GeoPoint,
    #[serde(default)]
    pub reliability: f64,
    #[serde(default)]
    pub completed_jobs: u32,
}

impl CreateSolverRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name cannot be empty".to_string()));
        }

        if !self.price_per_job.is_finite() || self.price_per_job < 0.0 {
            return Err(AppError::BadRequest("price_per_job must be >= 0".to_string()));
        }

        if !self.avg_speed_hours.is_finite() || self.avg_speed_hours < 0.0 {
            return Err(AppError::BadRequest(
                "avg_speed_hours must be >= 0".to_string(),
            ));
        }

        Ok(())
    }

    fn into_solver(self, id: Uuid) -> Solver {
        Solver {
            id,
            name: self.name,
            role: self.role,
            skills: self.skills,
            price_per_job: self.price_per_job,
            avg_speed_hours: self.avg_speed_hours,
            location: self.location,
            reliability: if self.reliability.is_finite() {
                self.reliability.clamp(0.0, 1.0)
            } else {
                0.0
            },
            completed_jobs: self.completed_jobs,
            updated_at: Utc::now(),
        }
    }
}

async fn create_solver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSolverRequest>,
) -> Result<Json<Solver>, AppError> {
    payload.validate()?;
    let solver = payload.into_solver(Uuid::new_v4());

    state.solvers.insert(solver.clone());
    Ok(Json(solver))
}

async fn get_solver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Solver>, AppError> {
    let id = parse_id(&id, "solver id")?;
    state
        .solvers
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("solver {id} not found")))
}

/// Replaces the whole record; rankings pick the new values up on their
/// next directory fetch.
async fn update_solver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CreateSolverRequest>,
) -> Result<Json<Solver>, AppError> {
    let id = parse_id(&id, "solver id")?;
    payload.validate()?;
    if state.solvers.get(id).is_none() {
        return Err(AppError::NotFound(format!("solver {id} not found")));
    }

    let solver = payload.into_solver(id);
    state.solvers.insert(solver.clone());
    Ok(Json(solver))
}

#[derive(Serialize)]
pub struct TopBuyersResponse {
    pub top_buyers: Vec<RankedBuyer>,
}

async fn top_buyers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TopBuyersResponse>, AppError> {
    Ok(Json(TopBuyersResponse {
        top_buyers: state.ranking.rank_buyers().await?,
    }))
}

async fn list_solvers(State(state): State<Arc<AppState>>) -> Json<Vec<Solver>> {
    Json(state.solvers.list())
}
