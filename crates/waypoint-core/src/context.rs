//! Wiring of the services around one store and one generation backend

use crate::assessment::AssessmentEngine;
use crate::config::WaypointConfig;
use crate::error::WaypointError;
use crate::pipeline::RoadmapPipeline;
use crate::profile::ProfileService;
use crate::progress::ProgressAggregator;
use crate::repo::Repository;
use crate::stage::StageMachine;
use std::sync::Arc;
use waypoint_llm::{GenerationBackend, RetryCoordinator};
use waypoint_store::DocumentStore;

/// Every Waypoint service, sharing one repository and one backend
///
/// Cloning is cheap; clones share the store and backend.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Validated configuration
    pub config: Arc<WaypointConfig>,
    /// Journey stages
    pub stages: StageMachine,
    /// Versioned profiles
    pub profiles: ProfileService,
    /// Roadmap phases
    pub pipeline: RoadmapPipeline,
    /// Topic assessments
    pub assessments: AssessmentEngine,
    /// Progress statistics
    pub progress: ProgressAggregator,
}

impl AppContext {
    /// Build every service
    ///
    /// # Errors
    ///
    /// [`WaypointError::Config`] when `config` fails validation.
    pub fn new(
        config: WaypointConfig,
        store: Arc<dyn DocumentStore>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Result<Self, WaypointError> {
        config.validate()?;
        let config = Arc::new(config);

        let repo = Repository::new(store, config.store_timeout());
        let generator = RetryCoordinator::new(backend, config.generation_timeout(), config.strict_temperature);
        let stages = StageMachine::new(repo.clone());
        let progress = ProgressAggregator::new(repo.clone(), config.clone());
        let assessments = AssessmentEngine::new(
            repo.clone(),
            generator.clone(),
            stages.clone(),
            progress.clone(),
            config.clone(),
        );
        let pipeline = RoadmapPipeline::new(
            repo.clone(),
            generator.clone(),
            stages.clone(),
            assessments.clone(),
            config.clone(),
        );
        let profiles = ProfileService::new(repo, stages.clone(), assessments.clone());

        tracing::debug!("waypoint context ready (backend {})", generator.backend_id());
        Ok(Self {
            config,
            stages,
            profiles,
            pipeline,
            assessments,
            progress,
        })
    }
}
