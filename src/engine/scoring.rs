use std::collections::BTreeSet;

use crate::geo::haversine_km;
use crate::models::assignment::Assignment;
use crate::models::ranking::ScoreBreakdown;
use crate::models::solver::Solver;

/// Points awarded per factor. The total is unbounded and only meaningful for
/// ordering candidates against the same assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub skill: f64,
    pub price: f64,
    pub speed: f64,
    pub distance: f64,
}

pub const DEFAULT_WEIGHTS: Weights = Weights {
    skill: 40.0,
    price: 20.0,
    speed: 20.0,
    distance: 20.0,
};

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

/// Weighting plus the reference values the inverse factors are scaled by:
/// a solver charging `price_reference` earns exactly `weights.price`, and so
/// on for speed and distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub weights: Weights,
    pub price_reference: f64,
    pub speed_reference_hours: f64,
    pub distance_reference_km: f64,
}

/// Distances below this are treated as this, so co-located solvers still
/// get the best distance score instead of a division by zero.
pub const MIN_DISTANCE_KM: f64 = 1.0;

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            price_reference: 1_000.0,
            speed_reference_hours: 48.0,
            distance_reference_km: 100.0,
        }
    }
}

pub fn compute_score(
    policy: &ScoringPolicy,
    assignment: &Assignment,
    solver: &Solver,
) -> (f64, ScoreBreakdown) {
    let weights = &policy.weights;

    let breakdown = ScoreBreakdown {
        skill_score: finite_or_zero(skill_score(
            weights.skill,
            &assignment.skills,
            &solver.skills,
        )),
        price_score: finite_or_zero(inverse_score(
            weights.price,
            policy.price_reference,
            solver.price_per_job,
        )),
        speed_score: finite_or_zero(inverse_score(
            weights.speed,
            policy.speed_reference_hours,
            solver.avg_speed_hours,
        )),
        distance_score: finite_or_zero(distance_score(policy, assignment, solver)),
    };

    (saturate(breakdown.total()), breakdown)
}

/// Weights of the buyer leaderboard: offered price, responsiveness and
/// rating.
pub const BUYER_OFFER_WEIGHT: f64 = 0.5;
pub const BUYER_RESPONSE_WEIGHT: f64 = 0.2;
pub const BUYER_RATING_WEIGHT: f64 = 0.3;

/// Leaderboard score for a buyer record: a higher offer, a faster response
/// and a better rating all raise it. Unusable inputs contribute 0.
pub fn buyer_score(buyer: &Solver) -> f64 {
    let offer = finite_or_zero(buyer.price_per_job) * BUYER_OFFER_WEIGHT;
    let response = finite_or_zero(buyer.avg_speed_hours);
    let responsiveness = BUYER_RESPONSE_WEIGHT / (response + 1.0);
    let rating = finite_or_zero(buyer.reliability) * BUYER_RATING_WEIGHT;

    saturate(offer + finite_or_zero(responsiveness) + rating)
}

fn skill_score(weight: f64, required: &[String], offered: &[String]) -> f64 {
    let required = normalized_skills(required);
    if required.is_empty() {
        return 0.0;
    }

    let offered = normalized_skills(offered);
    let per_skill = weight / required.len().max(1) as f64;
    let matched = required.intersection(&offered).count();

    per_skill * matched as f64
}

fn normalized_skills(skills: &[String]) -> BTreeSet<String> {
    skills
        .iter()
        .map(|skill| skill.trim().to_lowercase())
        .filter(|skill| !skill.is_empty())
        .collect()
}

/// `weight * reference / value`, or 0 when `value` is missing or not usable.
fn inverse_score(weight: f64, reference: f64, value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }

    weight * reference / value
}

fn distance_score(policy: &ScoringPolicy, assignment: &Assignment, solver: &Solver) -> f64 {
    if !assignment.location.is_set() || !solver.location.is_set() {
        return 0.0;
    }

    let distance_km = haversine_km(&assignment.location, &solver.location);
    inverse_score(
        policy.weights.distance,
        policy.distance_reference_km,
        distance_km.max(MIN_DISTANCE_KM),
    )
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Sums of finite factors can still overflow; clamp to the largest finite
/// value so ordering keeps working.
fn saturate(total: f64) -> f64 {
    if total.is_finite() { total } else { f64::MAX }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{DEFAULT_WEIGHTS, ScoringPolicy, buyer_score, compute_score};
    use crate::models::assignment::{Assignment, AssignmentStatus, Urgency};
    use crate::models::geo::GeoPoint;
    use crate::models::solver::{Role, Solver};

    pub(crate) fn solver(id_seed: u128, skills: &[&str], price: f64, speed: f64) -> Solver {
        Solver {
            id: Uuid::from_u128(id_seed),
            name: format!("solver-{id_seed}"),
            role: Role::Solver,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            price_per_job: price,
            avg_speed_hours: speed,
            location: GeoPoint::default(),
            reliability: 0.8,
            completed_jobs: 0,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn assignment(skills: &[&str], urgency: Urgency) -> Assignment {
        let now = Utc::now();
        Assignment {
            id: Uuid::from_u128(0xA55),
            buyer_id: Uuid::from_u128(0xB0B),
            title: "Regression analysis".to_string(),
            description: "Fit a model and write it up".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            location: GeoPoint::default(),
            urgency,
            price: 800.0,
            status: AssignmentStatus::Posted,
            solver_id: None,
            created_at: now,
            deadline: now + Duration::days(3),
        }
    }

    #[test]
    fn solver_with_required_skills_outranks_one_without() {
        let policy = ScoringPolicy::default();
        let task = assignment(&["python", "ml"], Urgency::Medium);

        let skilled = solver(1, &["python", "ml"], 500.0, 24.0);
        let unskilled = solver(2, &["design"], 500.0, 24.0);

        let (skilled_score, skilled_breakdown) = compute_score(&policy, &task, &skilled);
        let (unskilled_score, unskilled_breakdown) = compute_score(&policy, &task, &unskilled);

        assert!(skilled_score > unskilled_score);
        assert!((skilled_breakdown.skill_score - DEFAULT_WEIGHTS.skill).abs() < 1e-9);
        assert_eq!(unskilled_breakdown.skill_score, 0.0);
        assert_eq!(skilled_breakdown.price_score, unskilled_breakdown.price_score);
    }

    #[test]
    fn partial_skill_overlap_earns_a_share_of_the_weight() {
        let policy = ScoringPolicy::default();
        let task = assignment(&["python", "ml", "sql", "stats"], Urgency::Low);
        let half = solver(1, &["Python", " SQL ", "excel"], 0.0, 0.0);

        let (_, breakdown) = compute_score(&policy, &task, &half);

        assert!((breakdown.skill_score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_skill_tags_count_once() {
        let policy = ScoringPolicy::default();
        let task = assignment(&["ml", "ml", "python"], Urgency::Low);
        let candidate = solver(1, &["ml", "ml"], 0.0, 0.0);

        let (_, breakdown) = compute_score(&policy, &task, &candidate);

        assert!((breakdown.skill_score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_required_skills_contributes_nothing() {
        let policy = ScoringPolicy::default();
        let task = assignment(&[], Urgency::Medium);

        for seed in 0..20u128 {
            let candidate = solver(seed, &["python", "ml", "rust"], 100.0 * seed as f64, 6.0);
            let (_, breakdown) = compute_score(&policy, &task, &candidate);
            assert_eq!(breakdown.skill_score, 0.0);
        }

        let blank = assignment(&["  ", ""], Urgency::Medium);
        let (_, breakdown) = compute_score(&policy, &blank, &solver(1, &["  "], 0.0, 0.0));
        assert_eq!(breakdown.skill_score, 0.0);
    }

    #[test]
    fn zero_or_unusable_price_contributes_nothing() {
        let policy = ScoringPolicy::default();
        let task = assignment(&["python"], Urgency::Medium);

        for price in [0.0, -0.0, -50.0, f64::NAN, f64::INFINITY, f64::MIN_POSITIVE / 4.0] {
            let (score, breakdown) = compute_score(&policy, &task, &solver(1, &[], price, 0.0));
            assert_eq!(breakdown.price_score, 0.0, "price {price}");
            assert!(score.is_finite());
        }
    }

    #[test]
    fn cheaper_and_faster_solvers_score_higher() {
        let policy = ScoringPolicy::default();
        let task = assignment(&[], Urgency::Medium);

        let (cheap, _) = compute_score(&policy, &task, &solver(1, &[], 250.0, 0.0));
        let (pricey, _) = compute_score(&policy, &task, &solver(2, &[], 2_000.0, 0.0));
        assert!(cheap > pricey);

        let (fast, _) = compute_score(&policy, &task, &solver(3, &[], 0.0, 6.0));
        let (slow, _) = compute_score(&policy, &task, &solver(4, &[], 0.0, 96.0));
        assert!(fast > slow);

        let (_, breakdown) = compute_score(&policy, &task, &solver(5, &[], 1_000.0, 48.0));
        assert!((breakdown.price_score - 20.0).abs() < 1e-9);
        assert!((breakdown.speed_score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn distance_is_skipped_when_either_location_is_unset() {
        let policy = ScoringPolicy::default();
        let mut task = assignment(&[], Urgency::Medium);
        let mut candidate = solver(1, &[], 0.0, 0.0);
        candidate.location = GeoPoint {
            lat: 19.07,
            lng: 72.87,
        };

        let (_, breakdown) = compute_score(&policy, &task, &candidate);
        assert_eq!(breakdown.distance_score, 0.0);

        task.location = GeoPoint {
            lat: 18.52,
            lng: 73.85,
        };
        candidate.location = GeoPoint::default();
        let (_, breakdown) = compute_score(&policy, &task, &candidate);
        assert_eq!(breakdown.distance_score, 0.0);
    }

    #[test]
    fn nearer_solver_gets_higher_distance_score() {
        let policy = ScoringPolicy::default();
        let mut task = assignment(&[], Urgency::Medium);
        task.location = GeoPoint {
            lat: 19.0760,
            lng: 72.8777,
        };

        let mut near = solver(1, &[], 0.0, 0.0);
        near.location = GeoPoint {
            lat: 19.10,
            lng: 72.90,
        };
        let mut far = solver(2, &[], 0.0, 0.0);
        far.location = GeoPoint {
            lat: 28.61,
            lng: 77.20,
        };
        let mut same_spot = solver(3, &[], 0.0, 0.0);
        same_spot.location = task.location;

        let (near_score, _) = compute_score(&policy, &task, &near);
        let (far_score, _) = compute_score(&policy, &task, &far);
        let (same_score, _) = compute_score(&policy, &task, &same_spot);

        assert!(near_score > far_score);
        assert!(same_score >= near_score);
        assert!(same_score.is_finite());
    }

    #[test]
    fn malformed_record_scores_zero_on_bad_factors_only() {
        let policy = ScoringPolicy::default();
        let task = assignment(&["python"], Urgency::Medium);
        let mut broken = solver(1, &["python"], f64::NAN, f64::NEG_INFINITY);
        broken.location = GeoPoint {
            lat: f64::NAN,
            lng: 1.0,
        };

        let (score, breakdown) = compute_score(&policy, &task, &broken);

        assert_eq!(breakdown.price_score, 0.0);
        assert_eq!(breakdown.speed_score, 0.0);
        assert_eq!(breakdown.distance_score, 0.0);
        assert!((score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_inputs_keep_the_total_finite() {
        let policy = ScoringPolicy::default();
        let task = assignment(&[], Urgency::Medium);

        let (score, breakdown) = compute_score(&policy, &task, &solver(1, &[], 2e-304, 9.6e-306));

        assert!(breakdown.price_score.is_finite());
        assert!(breakdown.speed_score.is_finite());
        assert!(score.is_finite());
        assert_eq!(score, f64::MAX);
    }

    #[test]
    fn buyer_score_rewards_offer_response_and_rating() {
        let mut generous = solver(1, &[], 1_000.0, 2.0);
        generous.role = Role::Buyer;
        let mut stingy = generous.clone();
        stingy.price_per_job = 100.0;
        let mut slow = generous.clone();
        slow.avg_speed_hours = 48.0;

        assert!(buyer_score(&generous) > buyer_score(&stingy));
        assert!(buyer_score(&generous) > buyer_score(&slow));

        // 1000 * 0.5 + 0.2 / 3 + 0.8 * 0.3
        assert!((buyer_score(&generous) - (500.0 + 0.2 / 3.0 + 0.24)).abs() < 1e-9);
    }

    #[test]
    fn buyer_score_ignores_unusable_fields() {
        let mut broken = solver(1, &[], f64::NAN, -5.0);
        broken.role = Role::Buyer;
        broken.reliability = f64::INFINITY;

        // Only the responsiveness term survives, at its best value.
        assert!((buyer_score(&broken) - 0.2).abs() < 1e-12);
    }
}
