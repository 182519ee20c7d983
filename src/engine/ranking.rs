use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{error, info};

use crate::engine::scoring::{ScoringPolicy, buyer_score, compute_score};
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::ranking::{RankedBuyer, ScoredCandidate};
use crate::models::solver::{Role, Solver};
use crate::observability::metrics::Metrics;
use crate::store::{SolverDirectory, SolverFilter};

pub const TOP_N: usize = 10;

/// Scores every solver-role record in `pool` and returns the best `limit`,
/// highest score first. Equal scores are ordered by solver id so the result
/// is reproducible for an unchanged pool.
pub fn rank_candidates(
    policy: &ScoringPolicy,
    assignment: &Assignment,
    pool: &[Solver],
    limit: usize,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = pool
        .iter()
        .filter(|solver| solver.is_solver())
        .map(|solver| {
            let (score, breakdown) = compute_score(policy, assignment, solver);
            ScoredCandidate {
                solver: solver.clone(),
                score,
                breakdown,
            }
        })
        .collect();

    scored.sort_by(compare_candidates);
    scored.truncate(limit);
    scored
}

fn compare_candidates(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.solver.id.cmp(&b.solver.id))
}

/// Buyer-role records of `pool` by [`buyer_score`], best `limit` first,
/// with the same id tie-break as solver rankings.
pub fn rank_buyers(pool: &[Solver], limit: usize) -> Vec<RankedBuyer> {
    let mut ranked: Vec<RankedBuyer> = pool
        .iter()
        .filter(|record| record.role == Role::Buyer)
        .map(|buyer| RankedBuyer {
            buyer: buyer.clone(),
            score: buyer_score(buyer),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.buyer.id.cmp(&b.buyer.id))
    });
    ranked.truncate(limit);
    ranked
}

/// Fetches the candidate pool once per call and ranks it synchronously.
/// Holds no mutable state, so concurrent calls are independent.
pub struct RankingEngine {
    directory: Arc<dyn SolverDirectory>,
    policy: ScoringPolicy,
    fetch_timeout: Duration,
    top_n: usize,
    metrics: Metrics,
}

impl RankingEngine {
    pub fn new(
        directory: Arc<dyn SolverDirectory>,
        policy: ScoringPolicy,
        fetch_timeout: Duration,
        top_n: usize,
        metrics: Metrics,
    ) -> Self {
        Self {
            directory,
            policy,
            fetch_timeout,
            top_n,
            metrics,
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub async fn rank_assignment(
        &self,
        assignment: &Assignment,
    ) -> Result<Vec<ScoredCandidate>, AppError> {
        let start = Instant::now();

        let result = self.fetch_pool(&SolverFilter::solvers()).await.map(|pool| {
            let ranked = rank_candidates(&self.policy, assignment, &pool, self.top_n);
            info!(
                assignment_id = %assignment.id,
                pool = pool.len(),
                returned = ranked.len(),
                "assignment ranked"
            );
            ranked
        });

        let outcome = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .ranking_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .rankings_total
            .with_label_values(&[outcome])
            .inc();
        if let Ok(ranked) = &result {
            self.metrics.candidates_returned.observe(ranked.len() as f64);
        }

        result
    }

    pub async fn rank_buyers(&self) -> Result<Vec<RankedBuyer>, AppError> {
        let filter = SolverFilter {
            role: Some(Role::Buyer),
        };
        let pool = self.fetch_pool(&filter).await?;
        let ranked = rank_buyers(&pool, self.top_n);
        info!(pool = pool.len(), returned = ranked.len(), "buyers ranked");
        Ok(ranked)
    }

    async fn fetch_pool(&self, filter: &SolverFilter) -> Result<Vec<Solver>, AppError> {
        match timeout(self.fetch_timeout, self.directory.fetch_solvers(filter)).await
        {
            Ok(Ok(pool)) => Ok(pool),
            Ok(Err(err)) => {
                error!(error = %err, "solver directory fetch failed");
                Err(AppError::DirectoryUnavailable(err.to_string()))
            }
            Err(_) => {
                let waited_ms = self.fetch_timeout.as_millis();
                error!(timeout_ms = waited_ms, "solver directory fetch timed out");
                Err(AppError::DirectoryUnavailable(format!(
                    "fetch timed out after {waited_ms}ms"
                )))
            }
        }
    }
}
