//! Waypoint domain model
//!
//! Plain data types shared by every Waypoint crate:
//! - [`JourneyStage`] and the [`UserJourney`] record driven by the stage machine
//! - [`Roadmap`], the central aggregate filled in phase by phase
//! - [`Assessment`], one scored quiz per roadmap topic
//! - [`Profile`], versioned user profile records
//!
//! Nothing in this crate performs I/O. Records carry a `revision` stamp that
//! is owned by the store layer and never serialized into the record body.

pub mod assessment;
pub mod error;
pub mod ids;
pub mod journey;
pub mod profile;
pub mod roadmap;
pub mod stage;

pub use assessment::{
    Assessment, AssessmentQuestion, AssessmentStatus, Difficulty, Evaluation, QuestionKind,
};
pub use error::ModelError;
pub use ids::{AssessmentId, RoadmapId};
pub use journey::{JourneyStatus, StageTransition, UserJourney};
pub use profile::{Profile, ProfileChanges};
pub use roadmap::{
    AiRecommendation, CapstoneProject, CareerPath, CareerQuestion, DetailedPlan, PlanPhase,
    PlanTopic, QuestionAnswer, ResourceLink, Roadmap, RoadmapStatus,
};
pub use stage::{JourneyStage, StageInfo};

/// Round to two decimal places, the precision used for every stored score and rate.
#[inline]
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
