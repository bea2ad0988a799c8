//! Waypoint Core - journey orchestration
//!
//! Drives a learner from sign-up to a completed learning plan:
//! - [`StageMachine`] keeps the per-user journey stage, forward only
//! - [`RoadmapPipeline`] runs the three generation phases of a roadmap
//! - [`AssessmentEngine`] creates, fills and scores topic quizzes
//! - [`ProgressAggregator`] reports progress and syncs it into the plan
//! - [`ProfileService`] versions profiles and clears stale roadmaps
//!
//! Every service works through a [`Repository`] over a
//! [`waypoint_store::DocumentStore`], and generates through a
//! [`waypoint_llm::RetryCoordinator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use waypoint_core::{AppContext, WaypointConfig};
//! use waypoint_llm::ScriptedBackend;
//! use waypoint_model::Profile;
//! use waypoint_store::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(ScriptedBackend::new());
//! let ctx = AppContext::new(WaypointConfig::new(), Arc::new(InMemoryStore::new()), backend)?;
//!
//! let profile = Profile::new("ada@example.com", chrono::Utc::now()).with_career_goal("Data Engineer");
//! let snapshot = ctx.pipeline.generate_questions(&profile).await?;
//! println!("roadmap {} has {} questions", snapshot.roadmap_id, snapshot.roadmap.questions.map_or(0, |q| q.len()));
//! # Ok(())
//! # }
//! ```

pub mod assessment;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod prompts;
pub mod repo;
pub mod stage;

pub use assessment::AssessmentEngine;
pub use config::{MaxTokens, WaypointConfig};
pub use context::AppContext;
pub use error::WaypointError;
pub use pipeline::{RoadmapPipeline, RoadmapSnapshot};
pub use profile::{load_current_profile, CascadeReport, ProfileService, ProfileUpdate};
pub use progress::{ProgressAggregator, RoadmapProgress, TopicProgress, TopicSummary};
pub use repo::{Record, Repository};
pub use stage::{
    allowed_transitions, validate_transition, StageMachine, TransitionError, TransitionKind,
    TransitionOutcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Waypoint Core
    pub use crate::{
        AppContext, AssessmentEngine, ProfileService, ProgressAggregator, RoadmapPipeline,
        RoadmapSnapshot, StageMachine, TransitionOutcome, WaypointConfig, WaypointError,
    };
    pub use waypoint_model::{
        Assessment, AssessmentId, CareerPath, JourneyStage, Profile, ProfileChanges, QuestionAnswer,
        Roadmap, RoadmapId, RoadmapStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
