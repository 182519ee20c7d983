//! Builds the notifications a match or a lifecycle change produces and hands
//! them to the delivery queue. Nothing here waits on delivery.

use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::queue::NotificationQueue;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::notification::{
    NotificationCategory, NotificationEvent, NotificationPriority, RelatedEntity,
};
use crate::models::ranking::ScoredCandidate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub queued: usize,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    queue: NotificationQueue,
    ttl: Duration,
}

impl NotificationDispatcher {
    pub fn new(queue: NotificationQueue, ttl: Duration) -> Self {
        Self { queue, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn dispatch_match(
        &self,
        assignment: &Assignment,
        candidates: &[ScoredCandidate],
    ) -> DispatchSummary {
        self.publish(match_notifications(assignment, candidates, self.ttl))
    }

    pub fn dispatch_status_change(
        &self,
        assignment: &Assignment,
        previous_solver: Option<Uuid>,
    ) -> DispatchSummary {
        self.publish(status_change_notifications(
            assignment,
            previous_solver,
            self.ttl,
        ))
    }

    /// Stores an already built event, used for hand-crafted notifications.
    pub fn dispatch(&self, event: NotificationEvent) -> DispatchSummary {
        self.publish(vec![event])
    }

    fn publish(&self, events: Vec<NotificationEvent>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for event in events {
            if self.queue.submit(event) {
                summary.queued += 1;
            } else {
                summary.dropped += 1;
            }
        }
        summary
    }
}

/// One `solver_matched` event for the buyer, then one event per candidate.
/// High urgency switches the solver events to the urgent category and
/// priority.
pub fn match_notifications(
    assignment: &Assignment,
    candidates: &[ScoredCandidate],
    ttl: Duration,
) -> Vec<NotificationEvent> {
    let related = RelatedEntity::assignment(assignment.id);
    let mut events = Vec::with_capacity(candidates.len() + 1);

    let buyer_body = match candidates.len() {
        0 => "No solvers match your assignment requirements yet".to_string(),
        1 => "We found 1 solver matching your assignment requirements".to_string(),
        n => format!("We found {n} solvers matching your assignment requirements"),
    };
    events.push(
        NotificationEvent::new(
            assignment.buyer_id,
            NotificationCategory::SolverMatched,
            "Top Solvers Found!",
            buyer_body,
        )
        .with_related(related)
        .with_priority(NotificationPriority::Medium)
        .with_ttl(ttl),
    );

    let (category, priority, title, body) = if assignment.is_urgent() {
        (
            NotificationCategory::AssignmentUrgent,
            NotificationPriority::High,
            "Urgent Assignment!",
            format!("Urgent assignment nearby: {}", assignment.title),
        )
    } else {
        (
            NotificationCategory::NewAssignment,
            NotificationPriority::Medium,
            "New Assignment Available",
            format!("A new assignment matching your skills: {}", assignment.title),
        )
    };

    for candidate in candidates {
        events.push(
            NotificationEvent::new(candidate.solver.id, category, title, body.clone())
                .with_related(related)
                .with_priority(priority)
                .with_ttl(ttl),
        );
    }

    events
}

/// Events for the state `assignment` has just entered. `previous_solver`
/// is the solver assigned before the change, which is who hears about a
/// cancellation.
pub fn status_change_notifications(
    assignment: &Assignment,
    previous_solver: Option<Uuid>,
    ttl: Duration,
) -> Vec<NotificationEvent> {
    let related = RelatedEntity::assignment(assignment.id);
    let event = |recipient: Uuid,
                 category: NotificationCategory,
                 priority: NotificationPriority,
                 title: &str,
                 body: String| {
        NotificationEvent::new(recipient, category, title, body)
            .with_related(related)
            .with_priority(priority)
            .with_ttl(ttl)
    };

    match assignment.status {
        AssignmentStatus::Matched => vec![event(
            assignment.buyer_id,
            NotificationCategory::AssignmentAccepted,
            NotificationPriority::Medium,
            "Solver Accepted",
            format!("A solver accepted your assignment: {}", assignment.title),
        )],
        AssignmentStatus::Completed => {
            let mut events = vec![event(
                assignment.buyer_id,
                NotificationCategory::AssignmentCompleted,
                NotificationPriority::High,
                "Assignment Completed",
                "Your assignment has been marked complete and funds have been released to the solver."
                    .to_string(),
            )];
            if let Some(solver_id) = assignment.solver_id {
                events.push(event(
                    solver_id,
                    NotificationCategory::AssignmentCompleted,
                    NotificationPriority::High,
                    "Assignment Completed",
                    "Assignment completed. Funds have been released to your account.".to_string(),
                ));
            }
            events
        }
        AssignmentStatus::Cancelled => previous_solver
            .map(|solver_id| {
                event(
                    solver_id,
                    NotificationCategory::AssignmentCancelled,
                    NotificationPriority::Medium,
                    "Assignment Cancelled",
                    format!("The buyer cancelled the assignment: {}", assignment.title),
                )
            })
            .into_iter()
            .collect(),
        AssignmentStatus::Posted | AssignmentStatus::InProgress => Vec::new(),
    }
}
