use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    #[default]
    Solver,
}

/// Directory record for a marketplace user. Only records with
/// [`Role::Solver`] take part in ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solver {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub price_per_job: f64,
    /// Average turnaround in hours per job.
    pub avg_speed_hours: f64,
    pub location: GeoPoint,
    /// Historical reliability in `[0, 1]`.
    pub reliability: f64,
    pub completed_jobs: u32,
    pub updated_at: DateTime<Utc>,
}

impl Solver {
    pub fn is_solver(&self) -> bool {
        self.role == Role::Solver
    }
}
