//! Versioned profiles
//!
//! An update never edits a live version: the current version is flipped to
//! `is_current = false` first, then the next version is inserted, so at no
//! point are two versions current.

use crate::assessment::AssessmentEngine;
use crate::error::WaypointError;
use crate::repo::Repository;
use crate::stage::StageMachine;
use chrono::Utc;
use serde::Serialize;
use waypoint_model::{JourneyStage, Profile, ProfileChanges, Roadmap};

/// Live version of `email`'s profile
///
/// # Errors
///
/// Store failures.
pub async fn load_current_profile(repo: &Repository, email: &str) -> Result<Option<Profile>, WaypointError> {
    let versions: Vec<Profile> = repo.query(email, Some("profile#")).await?;
    Ok(versions.into_iter().filter(|p| p.is_current).max_by_key(|p| p.version))
}

/// Counts of records removed by a career-relevant profile change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Roadmaps deleted
    pub roadmaps: usize,
    /// Assessments deleted
    pub assessments: usize,
}

/// Result of a profile update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    /// New live version
    pub profile: Profile,
    /// Set when career-relevant fields changed and generated data was removed
    pub cascade: Option<CascadeReport>,
}

/// Reads and writes profile versions
#[derive(Debug, Clone)]
pub struct ProfileService {
    repo: Repository,
    stages: StageMachine,
    assessments: AssessmentEngine,
}

impl ProfileService {
    /// Create the service
    #[must_use]
    pub fn new(repo: Repository, stages: StageMachine, assessments: AssessmentEngine) -> Self {
        Self {
            repo,
            stages,
            assessments,
        }
    }

    /// Live version
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn current(&self, email: &str) -> Result<Option<Profile>, WaypointError> {
        load_current_profile(&self.repo, email).await
    }

    /// Every version, oldest first
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn history(&self, email: &str) -> Result<Vec<Profile>, WaypointError> {
        let mut versions: Vec<Profile> = self.repo.query(email, Some("profile#")).await?;
        versions.sort_by_key(|p| p.version);
        Ok(versions)
    }

    /// Create the first version or supersede the live one
    ///
    /// Changing a career-relevant field deletes every roadmap and assessment
    /// of the user, since they were generated for the old profile.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Conflict`] if another update won the race; store failures.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(&self, email: &str, changes: &ProfileChanges) -> Result<ProfileUpdate, WaypointError> {
        let now = Utc::now();
        let Some(current) = self.current(email).await? else {
            let mut first = Profile::new(email, now);
            first.version = self
                .history(email)
                .await?
                .last()
                .map_or(1, |latest| latest.version + 1);
            changes.apply(&mut first);
            self.repo.insert(&mut first).await?;
            tracing::info!("{email}: created profile v{}", first.version);
            self.advance_for(&first).await;
            return Ok(ProfileUpdate {
                profile: first,
                cascade: None,
            });
        };

        let career_changed = changes.affects_career(&current);
        let mut next = current.next_version(changes, now);

        let mut superseded = current.clone();
        superseded.is_current = false;
        self.repo.update(&mut superseded).await?;

        if let Err(e) = self.repo.insert(&mut next).await {
            superseded.is_current = true;
            if let Err(rollback) = self.repo.update(&mut superseded).await {
                tracing::error!("{email}: could not restore profile v{}: {rollback}", current.version);
            }
            return Err(e);
        }
        tracing::info!("{email}: profile v{} superseded by v{}", current.version, next.version);

        let cascade = if career_changed {
            Some(self.cascade_delete(email).await?)
        } else {
            None
        };
        self.advance_for(&next).await;
        Ok(ProfileUpdate {
            profile: next,
            cascade,
        })
    }

    async fn cascade_delete(&self, email: &str) -> Result<CascadeReport, WaypointError> {
        let roadmaps: Vec<Roadmap> = self.repo.query(email, None).await?;
        let mut report = CascadeReport::default();
        for roadmap in roadmaps {
            report.assessments += self.assessments.delete_for_roadmap(email, roadmap.id).await?;
            if self.repo.delete::<Roadmap>(email, &roadmap.id.to_string()).await? {
                report.roadmaps += 1;
            }
        }
        tracing::info!(
            "{email}: career profile changed, removed {} roadmaps and {} assessments",
            report.roadmaps,
            report.assessments
        );
        Ok(report)
    }

    async fn advance_for(&self, profile: &Profile) {
        self.stages
            .advance_best_effort(&profile.email, JourneyStage::BasicRegistered, "profile saved")
            .await;
        if profile.has_career_goal() {
            self.stages
                .advance_best_effort(&profile.email, JourneyStage::ProfileCompleted, "career goal set")
                .await;
        }
    }
}
