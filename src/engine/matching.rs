use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::notify::DispatchSummary;
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus, Urgency};
use crate::models::geo::GeoPoint;
use crate::models::ranking::ScoredCandidate;
use crate::state::AppState;

const DEFAULT_TITLE: &str = "Untitled Assignment";
const DEFAULT_DEADLINE_DAYS: i64 = 3;

/// Assignment as submitted by a client, before ids and lifecycle fields are
/// assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentDraft {
    #[serde(default)]
    pub buyer_id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: GeoPoint,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl AssignmentDraft {
    pub fn into_assignment(self, now: DateTime<Utc>) -> Result<Assignment, AppError> {
        if self.description.trim().is_empty() {
            return Err(AppError::BadRequest("description cannot be empty".to_string()));
        }
        self.into_query(now)
    }

    /// Transient assignment for a read-only ranking. Ranking never reads the
    /// description, so it may be empty here.
    pub fn into_query(self, now: DateTime<Utc>) -> Result<Assignment, AppError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::BadRequest("price must be >= 0".to_string()));
        }

        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Ok(Assignment {
            id: Uuid::new_v4(),
            buyer_id: self.buyer_id.unwrap_or(Uuid::nil()),
            title,
            description: self.description,
            skills: self.skills,
            location: self.location,
            urgency: self.urgency,
            price: self.price,
            status: AssignmentStatus::Posted,
            solver_id: None,
            created_at: now,
            deadline: self
                .deadline
                .unwrap_or(now + Duration::days(DEFAULT_DEADLINE_DAYS)),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub candidates: Vec<ScoredCandidate>,
    pub notifications: DispatchSummary,
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("invalid {what}")))
}

pub async fn resolve_assignment(state: &AppState, id: Uuid) -> Result<Assignment, AppError> {
    state
        .assignments
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {id} not found")))
}

/// Queues the match notifications; the caller gets the ranking without
/// waiting for any delivery.
fn notify_match(
    state: &AppState,
    assignment: &Assignment,
    candidates: Vec<ScoredCandidate>,
) -> MatchOutcome {
    let notifications = state.dispatcher.dispatch_match(assignment, &candidates);

    info!(
        assignment_id = %assignment.id,
        candidates = candidates.len(),
        queued = notifications.queued,
        dropped = notifications.dropped,
        "match notifications dispatched"
    );

    MatchOutcome {
        candidates,
        notifications,
    }
}

/// Ranks, then stores. Nothing is stored when ranking fails.
pub async fn create_and_match(
    state: &AppState,
    draft: AssignmentDraft,
) -> Result<(Assignment, MatchOutcome), AppError> {
    let assignment = draft.into_assignment(Utc::now())?;
    let candidates = state.ranking.rank_assignment(&assignment).await?;
    state.assignments.put(assignment.clone()).await?;

    let outcome = notify_match(state, &assignment, candidates);
    Ok((assignment, outcome))
}

/// Moves an assignment to `next`. `solver_id` is only meaningful, and then
/// required, when matching. The write is conditional on the status read, so
/// of two racing transitions from the same state only one succeeds.
pub async fn transition_status(
    state: &AppState,
    id: Uuid,
    next: AssignmentStatus,
    solver_id: Option<Uuid>,
) -> Result<(Assignment, DispatchSummary), AppError> {
    if next != AssignmentStatus::Matched && solver_id.is_some() {
        return Err(AppError::BadRequest(format!(
            "solver_id is only accepted when moving to {:?}",
            AssignmentStatus::Matched
        )));
    }

    let mut assignment = resolve_assignment(state, id).await?;
    let current = assignment.status;

    if !current.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "cannot move assignment from {current:?} to {next:?}"
        )));
    }

    let previous_solver = assignment.solver_id;
    if next == AssignmentStatus::Matched {
        let solver_id = solver_id.ok_or_else(|| {
            AppError::BadRequest("solver_id is required to match an assignment".to_string())
        })?;
        if !state.solvers.contains_solver(solver_id) {
            return Err(AppError::NotFound(format!("solver {solver_id} not found")));
        }
        assignment.solver_id = Some(solver_id);
    }

    assignment.status = next;
    if !state
        .assignments
        .replace_if_status(current, assignment.clone())
        .await?
    {
        return Err(AppError::Conflict(format!(
            "assignment {id} changed while moving from {current:?} to {next:?}"
        )));
    }

    let notifications = state
        .dispatcher
        .dispatch_status_change(&assignment, previous_solver);

    info!(
        assignment_id = %assignment.id,
        status = ?assignment.status,
        queued = notifications.queued,
        "assignment status changed"
    );

    Ok((assignment, notifications))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use async_trait::async_trait;

    use super::{
        AssignmentDraft, create_and_match, parse_id, resolve_assignment, transition_status,
    };
    use crate::config::Config;
    use crate::engine::scoring::tests::solver;
    use crate::error::AppError;
    use crate::models::assignment::{AssignmentStatus, Urgency};
    use crate::models::geo::GeoPoint;
    use crate::models::solver::Solver;
    use crate::state::AppState;
    use crate::store::memory::MemoryDirectory;
    use crate::store::{SolverDirectory, SolverFilter, StoreError};

    struct OfflineDirectory;

    #[async_trait]
    impl SolverDirectory for OfflineDirectory {
        async fn fetch_solvers(&self, _filter: &SolverFilter) -> Result<Vec<Solver>, StoreError> {
            Err(StoreError::Unavailable("directory offline".to_string()))
        }
    }

    fn draft(skills: &[&str], urgency: Urgency) -> AssignmentDraft {
        AssignmentDraft {
            buyer_id: Some(uuid::Uuid::from_u128(0xB0B)),
            title: Some("Thesis proofreading".to_string()),
            description: "Proofread 40 pages".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            location: GeoPoint::default(),
            urgency,
            price: 1200.0,
            deadline: None,
        }
    }

    #[test]
    fn draft_defaults_title_and_deadline() {
        let now = Utc::now();
        let mut d = draft(&[], Urgency::Low);
        d.title = Some("   ".to_string());

        let assignment = d.into_assignment(now).unwrap();

        assert_eq!(assignment.title, "Untitled Assignment");
        assert_eq!(assignment.deadline, now + Duration::days(3));
        assert_eq!(assignment.status, AssignmentStatus::Posted);
    }

    #[test]
    fn draft_rejects_negative_price_and_blank_description() {
        let mut d = draft(&[], Urgency::Low);
        d.price = -1.0;
        assert!(matches!(d.into_assignment(Utc::now()), Err(AppError::BadRequest(_))));

        let mut d = draft(&[], Urgency::Low);
        d.description = " ".to_string();
        assert!(matches!(d.into_assignment(Utc::now()), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn ranking_query_does_not_need_a_description() {
        let mut d = draft(&["sql"], Urgency::Low);
        d.description = String::new();

        assert!(matches!(
            d.clone().into_assignment(Utc::now()),
            Err(AppError::BadRequest(_))
        ));
        let query = d.into_query(Utc::now()).unwrap();
        assert_eq!(query.skills, vec!["sql".to_string()]);
    }

    #[test]
    fn unparseable_id_is_an_input_error() {
        assert!(matches!(parse_id("not-a-uuid", "assignment id"), Err(AppError::BadRequest(_))));
        assert!(parse_id("00000000-0000-0000-0000-000000000001", "assignment id").is_ok());
    }

    #[tokio::test]
    async fn create_ranks_and_queues_one_event_per_recipient() {
        let (state, mut rx) = AppState::new(&Config::default());
        state.solvers.insert(solver(1, &["proofreading"], 400.0, 10.0));
        state.solvers.insert(solver(2, &[], 400.0, 10.0));

        let (assignment, outcome) =
            create_and_match(&state, draft(&["proofreading"], Urgency::High))
                .await
                .unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].solver.id.as_u128(), 1);
        assert_eq!(outcome.notifications.queued, 3);

        let mut recipients = Vec::new();
        while let Ok(event) = rx.try_recv() {
            recipients.push(event.recipient_id);
        }
        assert_eq!(recipients.len(), 3);
        assert_eq!(recipients[0], assignment.buyer_id);
    }

    #[tokio::test]
    async fn matched_requires_a_known_solver() {
        let (state, _rx) = AppState::new(&Config::default());
        let (assignment, _) = create_and_match(&state, draft(&[], Urgency::Low))
            .await
            .unwrap();

        let err = transition_status(&state, assignment.id, AssignmentStatus::Matched, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = transition_status(
            &state,
            assignment.id,
            AssignmentStatus::Matched,
            Some(uuid::Uuid::from_u128(77)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn illegal_transition_is_a_conflict() {
        let (state, _rx) = AppState::new(&Config::default());
        state.solvers.insert(solver(5, &[], 100.0, 5.0));
        let (assignment, _) = create_and_match(&state, draft(&[], Urgency::Low))
            .await
            .unwrap();

        let err = transition_status(&state, assignment.id, AssignmentStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let (matched, summary) = transition_status(
            &state,
            assignment.id,
            AssignmentStatus::Matched,
            Some(uuid::Uuid::from_u128(5)),
        )
        .await
        .unwrap();
        assert_eq!(matched.solver_id, Some(uuid::Uuid::from_u128(5)));
        assert_eq!(summary.queued, 1);
    }

    #[tokio::test]
    async fn solver_id_outside_matching_is_rejected() {
        let (state, _rx) = AppState::new(&Config::default());
        let (assignment, _) = create_and_match(&state, draft(&[], Urgency::Low))
            .await
            .unwrap();

        let err = transition_status(
            &state,
            assignment.id,
            AssignmentStatus::Cancelled,
            Some(uuid::Uuid::from_u128(5)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let stored = resolve_assignment(&state, assignment.id).await.unwrap();
        assert_eq!(stored.status, AssignmentStatus::Posted);
    }

    #[tokio::test]
    async fn racing_matches_leave_exactly_one_winner() {
        let (state, mut rx) = AppState::new(&Config::default());
        state.solvers.insert(solver(10, &[], 100.0, 5.0));
        state.solvers.insert(solver(20, &[], 100.0, 5.0));
        let (assignment, _) = create_and_match(&state, draft(&[], Urgency::Low))
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}

        let (first, second) = tokio::join!(
            transition_status(
                &state,
                assignment.id,
                AssignmentStatus::Matched,
                Some(uuid::Uuid::from_u128(10)),
            ),
            transition_status(
                &state,
                assignment.id,
                AssignmentStatus::Matched,
                Some(uuid::Uuid::from_u128(20)),
            ),
        );

        let winners: Vec<_> = [&first, &second]
            .into_iter()
            .filter_map(|result| result.as_ref().ok())
            .collect();
        assert_eq!(winners.len(), 1);
        assert!([&first, &second]
            .iter()
            .any(|result| matches!(result, Err(AppError::Conflict(_)))));

        let stored = resolve_assignment(&state, assignment.id).await.unwrap();
        assert_eq!(stored.solver_id, winners[0].0.solver_id);

        let mut accepted = 0;
        while rx.try_recv().is_ok() {
            accepted += 1;
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn transition_loses_to_a_write_after_its_read() {
        let (state, _rx) = AppState::new(&Config::default());
        state.solvers.insert(solver(10, &[], 100.0, 5.0));
        let (assignment, _) = create_and_match(&state, draft(&[], Urgency::Low))
            .await
            .unwrap();

        // Another writer cancels between this caller's read and its write.
        let stale = resolve_assignment(&state, assignment.id).await.unwrap();
        let mut cancelled = stale.clone();
        cancelled.status = AssignmentStatus::Cancelled;
        state.assignments.put(cancelled).await.unwrap();

        let mut matched = stale;
        matched.status = AssignmentStatus::Matched;
        let swapped = state
            .assignments
            .replace_if_status(AssignmentStatus::Posted, matched)
            .await
            .unwrap();
        assert!(!swapped);

        let err = transition_status(
            &state,
            assignment.id,
            AssignmentStatus::Matched,
            Some(uuid::Uuid::from_u128(10)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_ranking_stores_nothing() {
        let config = Config::default();
        let (state, _rx) = AppState::with_directory(
            &config,
            std::sync::Arc::new(MemoryDirectory::new()),
            std::sync::Arc::new(OfflineDirectory),
        );

        let err = create_and_match(&state, draft(&["sql"], Urgency::High))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DirectoryUnavailable(_)));
        assert!(state.assignments.list().await.unwrap().is_empty());
    }
}
