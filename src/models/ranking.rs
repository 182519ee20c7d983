use serde::{Deserialize, Serialize};

use crate::models::solver::Solver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skill_score: f64,
    pub price_score: f64,
    pub speed_score: f64,
    pub distance_score: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.skill_score + self.price_score + self.speed_score + self.distance_score
    }
}

/// One entry of a ranking result. Produced per call and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub solver: Solver,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Buyer leaderboard entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedBuyer {
    pub buyer: Solver,
    pub score: f64,
}
