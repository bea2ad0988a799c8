//! Journey stage machine
//!
//! Ordered stages may only move forward. [`JourneyStage::RoadmapActive`]
//! is special: from there the journey either completes or pauses, and a
//! paused journey can only resume to `RoadmapActive`. Validation is pure
//! and runs before anything is written.

use crate::error::WaypointError;
use crate::repo::{Repository, JOURNEY_SORT_KEY};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use waypoint_model::{JourneyStage, JourneyStatus, StageInfo, UserJourney};

/// Kind of an accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Already in the requested stage; nothing written
    Same,
    /// Forward progression
    Forward,
    /// `RoadmapActive -> JourneyPaused`
    Pause,
    /// `JourneyPaused -> RoadmapActive`
    Resume,
    /// `RoadmapActive -> JourneyCompleted` or a forward jump to it
    Complete,
}

/// Why a transition was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Target is behind the current stage
    #[error("cannot regress from {from} to {to}")]
    Regress {
        /// Current stage
        from: JourneyStage,
        /// Requested stage
        to: JourneyStage,
    },

    /// Current stage only allows specific targets
    #[error("{from} can only move to {allowed}, not {to}")]
    Restricted {
        /// Current stage
        from: JourneyStage,
        /// Requested stage
        to: JourneyStage,
        /// Allowed targets
        allowed: String,
    },

    /// Abandoned journeys accept no transitions
    #[error("journey abandoned")]
    Abandoned,
}

/// Validate `from -> to`
///
/// # Errors
///
/// [`TransitionError`] describing the refusal.
pub fn validate_transition(from: JourneyStage, to: JourneyStage) -> Result<TransitionKind, TransitionError> {
    use JourneyStage::{JourneyCompleted, JourneyPaused, RoadmapActive};

    if from == to {
        return Ok(TransitionKind::Same);
    }

    match (from, to) {
        (RoadmapActive, JourneyCompleted) => Ok(TransitionKind::Complete),
        (RoadmapActive, JourneyPaused) => Ok(TransitionKind::Pause),
        (JourneyPaused, RoadmapActive) => Ok(TransitionKind::Resume),
        (JourneyPaused, _) | (_, JourneyPaused) => Err(restricted(from, to)),
        _ => match (from.order(), to.order()) {
            (Some(a), Some(b)) if b > a && from != RoadmapActive => Ok(if to == JourneyCompleted {
                TransitionKind::Complete
            } else {
                TransitionKind::Forward
            }),
            _ => Err(TransitionError::Regress { from, to }),
        },
    }
}

fn restricted(from: JourneyStage, to: JourneyStage) -> TransitionError {
    let targets = allowed_transitions(from);
    let allowed = if targets.is_empty() {
        "no other stage".to_string()
    } else {
        targets.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" or ")
    };
    TransitionError::Restricted { from, to, allowed }
}

/// Every stage reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: JourneyStage) -> Vec<JourneyStage> {
    use JourneyStage::{JourneyCompleted, JourneyPaused, RoadmapActive};
    match from {
        RoadmapActive => vec![JourneyCompleted, JourneyPaused],
        JourneyPaused => vec![RoadmapActive],
        JourneyCompleted => vec![],
        _ => JourneyStage::ALL
            .into_iter()
            .filter(|to| matches!((from.order(), to.order()), (Some(a), Some(b)) if b > a))
            .collect(),
    }
}

/// Result of a transition request
///
/// A refused transition is a normal outcome (`success == false`), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// Whether the journey is now in the requested stage
    pub success: bool,
    /// Human readable explanation
    pub reason: String,
    /// Stage before the request
    pub previous_stage: JourneyStage,
    /// Stage after the request
    pub current_stage: JourneyStage,
    /// Kind of accepted transition
    pub transition_kind: Option<TransitionKind>,
}

/// Validates and persists journey-stage transitions
#[derive(Debug, Clone)]
pub struct StageMachine {
    repo: Repository,
}

impl StageMachine {
    /// Stage machine over `repo`
    #[must_use]
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Current stage, `None` if the user has no journey yet
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn get_stage(&self, email: &str) -> Result<Option<JourneyStage>, WaypointError> {
        Ok(self.journey(email).await?.map(|j| j.current_stage))
    }

    /// Full journey record
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn journey(&self, email: &str) -> Result<Option<UserJourney>, WaypointError> {
        self.repo.get(email, JOURNEY_SORT_KEY).await
    }

    /// Order and description of `stage`
    #[must_use]
    pub fn describe_stage(stage: JourneyStage) -> StageInfo {
        stage.describe()
    }

    /// Request a move to the stage named `new_stage`
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] for an unknown stage name; store
    /// failures. A refused transition is `Ok` with `success == false`.
    pub async fn transition(&self, email: &str, new_stage: &str) -> Result<TransitionOutcome, WaypointError> {
        let stage: JourneyStage = new_stage.parse()?;
        self.transition_to(email, stage, BTreeMap::new()).await
    }

    /// Request a move to `to`, annotating the log entry with `metadata`
    ///
    /// A missing journey is created in [`JourneyStage::Authenticated`]
    /// first; creation and transition are written together, and nothing is
    /// written when the transition is refused.
    ///
    /// # Errors
    ///
    /// Store failures, including [`WaypointError::Conflict`] when another
    /// request changed the journey concurrently.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn transition_to(
        &self,
        email: &str,
        to: JourneyStage,
        metadata: BTreeMap<String, String>,
    ) -> Result<TransitionOutcome, WaypointError> {
        let now = Utc::now();
        let (mut journey, is_new) = match self.journey(email).await? {
            Some(journey) => (journey, false),
            None => (UserJourney::new(email, now), true),
        };
        let previous = journey.current_stage;

        let verdict = if journey.is_abandoned() {
            Err(TransitionError::Abandoned)
        } else {
            validate_transition(previous, to)
        };

        let kind = match verdict {
            Ok(kind) => kind,
            Err(refusal) => {
                tracing::debug!("{email}: refused {previous} -> {to}: {refusal}");
                return Ok(TransitionOutcome {
                    success: false,
                    reason: refusal.to_string(),
                    previous_stage: previous,
                    current_stage: previous,
                    transition_kind: None,
                });
            }
        };

        if kind == TransitionKind::Same {
            if is_new {
                self.repo.insert(&mut journey).await?;
            }
            return Ok(TransitionOutcome {
                success: true,
                reason: "same stage".to_string(),
                previous_stage: previous,
                current_stage: previous,
                transition_kind: Some(kind),
            });
        }

        journey.record(to, metadata, now);
        if is_new {
            self.repo.insert(&mut journey).await?;
        } else {
            self.repo.update(&mut journey).await?;
        }
        tracing::info!("{email}: {previous} -> {to} ({kind:?})");

        Ok(TransitionOutcome {
            success: true,
            reason: format!("moved from {previous} to {to}"),
            previous_stage: previous,
            current_stage: to,
            transition_kind: Some(kind),
        })
    }

    /// Move forward to `target` as a side effect of another operation
    ///
    /// Skips silently when the journey is already at or past `target` or is
    /// paused. Failures and refusals are logged, never returned.
    pub async fn advance_best_effort(&self, email: &str, target: JourneyStage, cause: &str) {
        let current = match self.get_stage(email).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!("{email}: could not read stage before advancing to {target}: {e}");
                return;
            }
        };
        let already_there = match current {
            Some(JourneyStage::JourneyPaused) => true,
            Some(stage) => stage.order() >= target.order(),
            None => false,
        };
        if already_there {
            tracing::debug!("{email}: stage already at or past {target}, not advancing");
            return;
        }

        let metadata = BTreeMap::from([("cause".to_string(), cause.to_string())]);
        match self.transition_to(email, target, metadata).await {
            Ok(outcome) if outcome.success => {}
            Ok(outcome) => tracing::warn!("{email}: stage advance to {target} refused: {}", outcome.reason),
            Err(e) => tracing::warn!("{email}: stage advance to {target} failed: {e}"),
        }
    }

    /// Mark the journey abandoned; later transitions are refused
    ///
    /// # Errors
    ///
    /// [`WaypointError::NotFound`] without a journey; store failures.
    pub async fn abandon(&self, email: &str) -> Result<UserJourney, WaypointError> {
        let mut journey: UserJourney = self.repo.require(email, JOURNEY_SORT_KEY).await?;
        if journey.is_abandoned() {
            return Ok(journey);
        }
        journey.status = JourneyStatus::Abandoned;
        journey.updated_at = Utc::now();
        self.repo.update(&mut journey).await?;
        tracing::info!("{email}: journey abandoned at {}", journey.current_stage);
        Ok(journey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;
    use waypoint_store::InMemoryStore;
    use JourneyStage::*;

    fn machine() -> StageMachine {
        StageMachine::new(Repository::new(Arc::new(InMemoryStore::new()), Duration::from_secs(1)))
    }

    fn any_stage() -> impl Strategy<Value = JourneyStage> {
        prop::sample::select(JourneyStage::ALL.to_vec())
    }

    #[test]
    fn roadmap_active_only_completes_or_pauses() {
        assert_eq!(validate_transition(RoadmapActive, JourneyCompleted), Ok(TransitionKind::Complete));
        assert_eq!(validate_transition(RoadmapActive, JourneyPaused), Ok(TransitionKind::Pause));
        assert!(validate_transition(RoadmapActive, RoadmapGenerated).is_err());
    }

    #[test]
    fn paused_only_resumes() {
        assert_eq!(validate_transition(JourneyPaused, RoadmapActive), Ok(TransitionKind::Resume));
        assert!(validate_transition(JourneyPaused, JourneyCompleted).is_err());
        assert!(validate_transition(ProfileCompleted, JourneyPaused).is_err());
    }

    #[test]
    fn backward_moves_regress() {
        let err = validate_transition(RoadmapGenerated, BasicRegistered).unwrap_err();
        assert!(err.to_string().starts_with("cannot regress"));
    }

    proptest! {
        #[test]
        fn prop_forward_moves_succeed(from in any_stage(), to in any_stage()) {
            if let (Some(a), Some(b)) = (from.order(), to.order()) {
                if b > a && from != RoadmapActive {
                    prop_assert!(validate_transition(from, to).is_ok());
                }
                if b < a {
                    prop_assert!(validate_transition(from, to).is_err());
                }
            }
        }

        #[test]
        fn prop_validation_agrees_with_allowed_list(from in any_stage(), to in any_stage()) {
            prop_assume!(from != to);
            let allowed = allowed_transitions(from);
            prop_assert_eq!(validate_transition(from, to).is_ok(), allowed.contains(&to));
        }
    }

    #[tokio::test]
    async fn first_transition_creates_the_journey() {
        let machine = machine();
        assert_eq!(machine.get_stage("a@b.c").await.unwrap(), None);

        let outcome = machine.transition("a@b.c", "BASIC_REGISTERED").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.previous_stage, Authenticated);
        assert_eq!(machine.get_stage("a@b.c").await.unwrap(), Some(BasicRegistered));
    }

    #[tokio::test]
    async fn refused_transition_writes_nothing() {
        let machine = machine();
        machine.transition("a@b.c", "CAREER_PATHS_GENERATED").await.unwrap();
        let before = machine.journey("a@b.c").await.unwrap().unwrap();

        let outcome = machine.transition("a@b.c", "PROFILE_COMPLETED").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.reason.contains("cannot regress"));

        let after = machine.journey("a@b.c").await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn refused_first_transition_creates_nothing() {
        let machine = machine();
        let outcome = machine.transition("new@b.c", "JOURNEY_PAUSED").await.unwrap();
        assert!(!outcome.success);
        assert!(machine.journey("new@b.c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_stage_is_a_validation_error() {
        let err = machine().transition("a@b.c", "FINISHED").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn same_stage_is_a_successful_no_op() {
        let machine = machine();
        machine.transition("a@b.c", "BASIC_REGISTERED").await.unwrap();
        let outcome = machine.transition("a@b.c", "BASIC_REGISTERED").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.transition_kind, Some(TransitionKind::Same));
        let journey = machine.journey("a@b.c").await.unwrap().unwrap();
        assert_eq!(journey.transitions.len(), 1);
    }

    #[tokio::test]
    async fn abandoned_journey_refuses_transitions() {
        let machine = machine();
        machine.transition("a@b.c", "BASIC_REGISTERED").await.unwrap();
        machine.abandon("a@b.c").await.unwrap();
        let outcome = machine.transition("a@b.c", "PROFILE_COMPLETED").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.reason, "journey abandoned");
    }

    #[tokio::test]
    async fn best_effort_advance_never_regresses() {
        let machine = machine();
        machine.transition("a@b.c", "ROADMAP_GENERATED").await.unwrap();
        machine.advance_best_effort("a@b.c", CareerPathsGenerated, "test").await;
        assert_eq!(machine.get_stage("a@b.c").await.unwrap(), Some(RoadmapGenerated));

        machine.advance_best_effort("a@b.c", RoadmapActive, "test").await;
        assert_eq!(machine.get_stage("a@b.c").await.unwrap(), Some(RoadmapActive));
    }
}
