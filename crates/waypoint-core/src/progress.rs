//! Roadmap and topic progress
//!
//! Statistics are computed from the assessment set. The per-topic fields
//! inside the stored detailed plan are a denormalized copy kept in step by
//! [`ProgressAggregator::sync_topic_progress`] after every evaluation.

use crate::config::WaypointConfig;
use crate::error::WaypointError;
use crate::repo::Repository;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use waypoint_model::{round2, Assessment, AssessmentStatus, PlanTopic, Roadmap, RoadmapId};

/// Per-topic line of a [`RoadmapProgress`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSummary {
    /// Topic name
    pub topic: String,
    /// Phase the topic first appears in
    pub phase: String,
    /// Assessment status
    pub status: AssessmentStatus,
    /// Score, once evaluated
    pub percentage_score: Option<f64>,
    /// Pass flag, once evaluated
    pub is_passed: Option<bool>,
}

/// Completion and pass statistics of one roadmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapProgress {
    /// Roadmap
    pub roadmap_id: RoadmapId,
    /// Career the plan is for
    pub career_title: String,
    /// Assessments of the roadmap
    pub total: usize,
    /// Completed assessments
    pub completed: usize,
    /// Passed assessments
    pub passed: usize,
    /// `completed / total * 100`
    pub completion_rate: f64,
    /// `passed / total * 100`
    pub pass_rate: f64,
    /// Mean of the available scores, 0 when none
    pub average_score: f64,
    /// Assessments in plan order
    pub topics: Vec<TopicSummary>,
}

/// One topic's assessment with its place in the plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicProgress {
    /// Assessment state
    pub assessment: Assessment,
    /// Phase the topic first appears in
    pub phase: String,
    /// Phase duration from the plan
    pub phase_duration: String,
    /// Topic entry from the plan
    pub plan_topic: PlanTopic,
}

/// Computes progress and keeps the plan snapshot in step
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    repo: Repository,
    config: Arc<WaypointConfig>,
}

impl ProgressAggregator {
    /// Create an aggregator
    #[must_use]
    pub fn new(repo: Repository, config: Arc<WaypointConfig>) -> Self {
        Self { repo, config }
    }

    async fn planned_roadmap(&self, email: &str, roadmap_id: RoadmapId) -> Result<Roadmap, WaypointError> {
        let roadmap: Roadmap = self.repo.require(email, &roadmap_id.to_string()).await?;
        if roadmap.detailed_roadmap.is_none() {
            return Err(WaypointError::Validation(format!(
                "roadmap {roadmap_id} has no detailed plan yet"
            )));
        }
        Ok(roadmap)
    }

    /// Statistics over every assessment of the roadmap
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] before the detailed plan exists;
    /// [`WaypointError::NotFound`]; store failures.
    pub async fn roadmap_progress(&self, email: &str, roadmap_id: RoadmapId) -> Result<RoadmapProgress, WaypointError> {
        let roadmap = self.planned_roadmap(email, roadmap_id).await?;
        let mut assessments: Vec<Assessment> = self
            .repo
            .query(email, Some(&format!("{roadmap_id}#")))
            .await?;
        assessments.sort_by_key(|a| a.order);

        let total = assessments.len();
        let completed = assessments
            .iter()
            .filter(|a| a.status == AssessmentStatus::Completed)
            .count();
        let passed = assessments.iter().filter(|a| a.is_passed == Some(true)).count();
        let scores: Vec<f64> = assessments.iter().filter_map(|a| a.percentage_score).collect();

        Ok(RoadmapProgress {
            roadmap_id,
            career_title: roadmap
                .detailed_roadmap
                .map(|plan| plan.career_title)
                .unwrap_or_default(),
            total,
            completed,
            passed,
            completion_rate: rate(completed, total),
            pass_rate: rate(passed, total),
            average_score: mean(&scores),
            topics: assessments
                .into_iter()
                .map(|a| TopicSummary {
                    topic: a.topic,
                    phase: a.phase,
                    status: a.status,
                    percentage_score: a.percentage_score,
                    is_passed: a.is_passed,
                })
                .collect(),
        })
    }

    /// One topic's assessment and plan entry
    ///
    /// # Errors
    ///
    /// [`WaypointError::NotFound`] when the plan or the assessment lacks the
    /// topic; store failures.
    pub async fn topic_progress(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        topic: &str,
    ) -> Result<TopicProgress, WaypointError> {
        let roadmap = self.planned_roadmap(email, roadmap_id).await?;
        let (phase, plan_topic) = roadmap
            .detailed_roadmap
            .as_ref()
            .and_then(|plan| plan.find_topic(topic))
            .ok_or_else(|| WaypointError::not_found("topic", topic))?;
        let assessment: Assessment = self
            .repo
            .require(email, &Assessment::sort_key(roadmap_id, topic))
            .await?;

        Ok(TopicProgress {
            assessment,
            phase: phase.phase.clone(),
            phase_duration: phase.duration.clone(),
            plan_topic: plan_topic.clone(),
        })
    }

    /// Copy an evaluation result into every plan entry named `topic`
    ///
    /// Re-reads and retries up to `max_sync_attempts` times when another
    /// writer bumps the roadmap revision in between.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Conflict`] once the attempts are spent; store failures.
    #[tracing::instrument(skip(self))]
    pub async fn sync_topic_progress(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        topic: &str,
        correct: u32,
        total: u32,
    ) -> Result<Roadmap, WaypointError> {
        let score = if total == 0 {
            0.0
        } else {
            round2(f64::from(correct) / f64::from(total) * 100.0)
        };

        let attempts = self.config.max_sync_attempts.max(1);
        let mut last = None;
        for attempt in 1..=attempts {
            let mut roadmap = self.planned_roadmap(email, roadmap_id).await?;
            let mut touched = 0;
            if let Some(plan) = roadmap.detailed_roadmap.as_mut() {
                for entry in plan.topics_named_mut(topic) {
                    entry.is_completed = true;
                    entry.correct_answers = correct;
                    entry.total_questions = total;
                    entry.score = score;
                    touched += 1;
                }
            }
            if touched == 0 {
                tracing::warn!("roadmap {roadmap_id}: no plan entry for topic {topic}");
                return Ok(roadmap);
            }
            roadmap.updated_at = Utc::now();

            match self
                .repo
                .update_fields(&mut roadmap, &["detailed_roadmap", "updated_at"])
                .await
            {
                Ok(()) => {
                    tracing::debug!("roadmap {roadmap_id}: synced {touched} entries of {topic}");
                    return Ok(roadmap);
                }
                Err(e @ WaypointError::Conflict(_)) => {
                    tracing::debug!("roadmap {roadmap_id}: sync attempt {attempt} lost a race");
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| WaypointError::Conflict(format!("roadmap {roadmap_id}"))))
    }
}

#[allow(clippy::cast_precision_loss)]
fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round2(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_handle_empty_sets() {
        assert!(rate(0, 0).abs() < f64::EPSILON);
        assert!(mean(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn rates_round_to_two_places() {
        assert!((rate(1, 3) - 33.33).abs() < 1e-9);
        assert!((mean(&[60.0, 80.0, 75.0]) - 71.67).abs() < 1e-9);
    }
}
