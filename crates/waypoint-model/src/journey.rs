//! User journey record

use crate::round2;
use crate::stage::JourneyStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall journey status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyStatus {
    /// Progressing normally
    Active,
    /// Paused while the roadmap is active
    Paused,
    /// Journey finished
    Completed,
    /// Explicitly abandoned; terminal
    Abandoned,
}

impl JourneyStatus {
    /// Status implied by sitting in `stage`
    #[must_use]
    pub fn for_stage(stage: JourneyStage) -> Self {
        match stage {
            JourneyStage::JourneyPaused => Self::Paused,
            JourneyStage::JourneyCompleted => Self::Completed,
            _ => Self::Active,
        }
    }
}

/// One entry of the append-only transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    /// Stage left
    pub from: JourneyStage,
    /// Stage entered
    pub to: JourneyStage,
    /// When the transition was recorded
    pub at: DateTime<Utc>,
    /// Free-form annotations supplied by the caller
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// A user's journey through the stages
///
/// Mutated only through the stage machine; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJourney {
    /// Owner
    pub email: String,
    /// Stage the user currently sits in
    pub current_stage: JourneyStage,
    /// Overall status
    pub status: JourneyStatus,
    /// Transition history, oldest first
    #[serde(default)]
    pub transitions: Vec<StageTransition>,
    /// Stages the user has moved past, in the order they were completed
    #[serde(default)]
    pub completed_stages: Vec<JourneyStage>,
    /// `order(current) / total_steps` as a percentage
    pub progress_percentage: f64,
    /// Number of ordered stages
    pub total_steps: u8,
    /// Journey creation time
    pub started_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
    /// Set once the final stage is reached
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Store revision stamp
    #[serde(skip)]
    pub revision: u64,
}

impl UserJourney {
    /// Fresh journey sitting in [`JourneyStage::Authenticated`]
    #[must_use]
    pub fn new(email: impl Into<String>, now: DateTime<Utc>) -> Self {
        let current_stage = JourneyStage::Authenticated;
        Self {
            email: email.into(),
            current_stage,
            status: JourneyStatus::Active,
            transitions: Vec::new(),
            completed_stages: Vec::new(),
            progress_percentage: progress_for(current_stage),
            total_steps: JourneyStage::TOTAL_STEPS,
            started_at: now,
            updated_at: now,
            completed_at: None,
            revision: 0,
        }
    }

    /// Record an already-validated move to `to`
    ///
    /// Appends to the log, marks the stage being left as completed and
    /// recomputes progress and status.
    pub fn record(&mut self, to: JourneyStage, metadata: BTreeMap<String, String>, now: DateTime<Utc>) {
        let from = self.current_stage;
        self.transitions.push(StageTransition {
            from,
            to,
            at: now,
            metadata,
        });

        if !matches!(from, JourneyStage::Authenticated | JourneyStage::JourneyPaused) {
            self.mark_completed(from);
        }
        if to == JourneyStage::JourneyCompleted {
            self.mark_completed(to);
            self.completed_at = Some(now);
        }

        self.current_stage = to;
        self.status = JourneyStatus::for_stage(to);
        self.progress_percentage = progress_for(to);
        self.updated_at = now;
    }

    /// Whether the journey was abandoned
    #[inline]
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.status == JourneyStatus::Abandoned
    }

    fn mark_completed(&mut self, stage: JourneyStage) {
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
    }
}

fn progress_for(stage: JourneyStage) -> f64 {
    round2(f64::from(stage.progress_order()) / f64::from(JourneyStage::TOTAL_STEPS) * 100.0)
}
