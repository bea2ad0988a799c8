//! Roadmap pipeline
//!
//! Three ordered phases, each guarded by the roadmap's status:
//!
//! 1. [`RoadmapPipeline::generate_questions`] creates a roadmap in `QUESTIONS_GENERATED`
//! 2. [`RoadmapPipeline::submit_answers`] stores answers and career paths
//! 3. [`RoadmapPipeline::select_path`] stores the detailed plan and spawns assessment shells
//!
//! A phase persists only after its output is fully parsed and merged, with
//! a revision-guarded write, so a failure leaves the roadmap untouched.

pub mod plan;
pub mod wire;

use crate::assessment::AssessmentEngine;
use crate::config::WaypointConfig;
use crate::error::WaypointError;
use crate::profile::load_current_profile;
use crate::prompts;
use crate::repo::Repository;
use crate::stage::StageMachine;
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use waypoint_llm::{GenerationRequest, RetryCoordinator};
use waypoint_model::{
    CareerPath, JourneyStage, Profile, QuestionAnswer, Roadmap, RoadmapId, RoadmapStatus,
};
use wire::{CareerPathsResponse, HighLevelPlanResponse, QuestionsResponse, SubtopicsResponse};

/// Roadmap returned by every pipeline phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapSnapshot {
    /// Roadmap identifier
    pub roadmap_id: RoadmapId,
    /// Whether the phase was served from stored results without generating
    pub cached: bool,
    /// Full roadmap after the phase
    pub roadmap: Roadmap,
}

impl RoadmapSnapshot {
    fn new(roadmap: Roadmap, cached: bool) -> Self {
        Self {
            roadmap_id: roadmap.id,
            cached,
            roadmap,
        }
    }
}

/// Orchestrates question, career-path and detailed-plan generation
#[derive(Debug, Clone)]
pub struct RoadmapPipeline {
    repo: Repository,
    generator: RetryCoordinator,
    stages: StageMachine,
    assessments: AssessmentEngine,
    config: Arc<WaypointConfig>,
}

impl RoadmapPipeline {
    /// Create a pipeline
    #[must_use]
    pub fn new(
        repo: Repository,
        generator: RetryCoordinator,
        stages: StageMachine,
        assessments: AssessmentEngine,
        config: Arc<WaypointConfig>,
    ) -> Self {
        Self {
            repo,
            generator,
            stages,
            assessments,
            config,
        }
    }

    fn request(&self, instruction: String, max_tokens: u32) -> GenerationRequest {
        GenerationRequest::new(instruction)
            .with_system(prompts::SYSTEM)
            .with_temperature(self.config.temperature)
            .with_max_tokens(max_tokens)
    }

    /// Most recent roadmap of `email`
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn latest_roadmap(&self, email: &str) -> Result<Option<Roadmap>, WaypointError> {
        let roadmaps: Vec<Roadmap> = self.repo.query(email, None).await?;
        Ok(roadmaps.into_iter().max_by_key(|r| (r.created_at, r.id)))
    }

    /// Every roadmap of `email`, newest first
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn list_roadmaps(&self, email: &str) -> Result<Vec<Roadmap>, WaypointError> {
        let mut roadmaps: Vec<Roadmap> = self.repo.query(email, None).await?;
        roadmaps.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id)));
        Ok(roadmaps)
    }

    /// One roadmap
    ///
    /// # Errors
    ///
    /// [`WaypointError::NotFound`]; store failures.
    pub async fn roadmap(&self, email: &str, roadmap_id: RoadmapId) -> Result<Roadmap, WaypointError> {
        self.repo.require(email, &roadmap_id.to_string()).await
    }

    /// Phase 1: discovery questions
    ///
    /// Returns the latest roadmap unchanged when it is still waiting for
    /// answers; otherwise generates questions and stores a new roadmap.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] when the profile has no career goal
    /// (checked before any backend call); generation, parse and store failures.
    #[tracing::instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn generate_questions(&self, profile: &Profile) -> Result<RoadmapSnapshot, WaypointError> {
        if !profile.has_career_goal() {
            return Err(WaypointError::Validation(
                "user profile incomplete: career goal is required".into(),
            ));
        }

        if let Some(latest) = self.latest_roadmap(&profile.email).await? {
            if latest.status == RoadmapStatus::QuestionsGenerated {
                tracing::info!("roadmap {} already has questions, reusing", latest.id);
                counter!("waypoint_cache_hits_total", "phase" => "questions").increment(1);
                return Ok(RoadmapSnapshot::new(latest, true));
            }
        }

        let count = self.config.career_question_count;
        let request = self.request(
            prompts::career_questions(profile, count),
            self.config.max_tokens.questions,
        );
        let response: QuestionsResponse = self
            .generator
            .generate_json("career_questions", request, |r: &QuestionsResponse| {
                check_questions(r, count)
            })
            .await?;

        let mut roadmap = Roadmap::with_questions(
            profile.email.clone(),
            profile.career_goal.clone(),
            response.questions,
            Utc::now(),
        );
        self.repo.insert(&mut roadmap).await?;
        tracing::info!("created roadmap {} with {count} questions", roadmap.id);

        self.stages
            .advance_best_effort(&profile.email, JourneyStage::ProfileCompleted, "questions generated")
            .await;
        Ok(RoadmapSnapshot::new(roadmap, false))
    }

    /// Phase 2: store answers and generate career paths
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] unless the roadmap is exactly in
    /// `QUESTIONS_GENERATED` or when answers do not match the questions;
    /// generation, parse, conflict and store failures.
    #[tracing::instrument(skip(self, answers))]
    pub async fn submit_answers(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        answers: Vec<QuestionAnswer>,
    ) -> Result<RoadmapSnapshot, WaypointError> {
        let mut roadmap = self.roadmap(email, roadmap_id).await?;
        let questions = match (roadmap.status, &roadmap.questions) {
            (RoadmapStatus::QuestionsGenerated, Some(questions)) => questions.clone(),
            (RoadmapStatus::QuestionsGenerated, None) => {
                return Err(WaypointError::Validation(
                    "no questions found; expected QUESTIONS_GENERATED with questions".into(),
                ))
            }
            (RoadmapStatus::CareerPathsGenerated, _) => {
                return Err(WaypointError::Validation(
                    "career paths already generated; expected QUESTIONS_GENERATED".into(),
                ))
            }
            (status, _) => {
                return Err(WaypointError::Validation(format!(
                    "roadmap already completed ({status}); expected QUESTIONS_GENERATED"
                )))
            }
        };
        check_answers(&questions, &answers)?;

        let profile = self.profile_for(&roadmap).await?;
        let count = self.config.career_path_count;
        let request = self
            .request(
                prompts::career_paths(&profile, &questions, &answers, count),
                self.config.max_tokens.career_paths,
            );
        let response: CareerPathsResponse = self
            .generator
            .generate_json("career_paths", request, |r: &CareerPathsResponse| {
                check_career_paths(r, count)
            })
            .await?;

        roadmap.answers = Some(answers);
        roadmap.career_paths = Some(response.career_paths);
        roadmap.status = RoadmapStatus::CareerPathsGenerated;
        roadmap.updated_at = Utc::now();
        self.repo.update(&mut roadmap).await?;
        tracing::info!("roadmap {roadmap_id}: career paths generated");

        self.stages
            .advance_best_effort(email, JourneyStage::CareerPathsGenerated, "career paths generated")
            .await;
        Ok(RoadmapSnapshot::new(roadmap, false))
    }

    /// Phase 3: select a path and generate its detailed plan
    ///
    /// Reselecting the stored path's title returns the cached plan. A
    /// different title regenerates the plan and replaces every assessment
    /// of the roadmap.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] for an incomplete path or a roadmap
    /// without career paths; generation, parse, conflict and store failures.
    #[tracing::instrument(skip(self, path), fields(title = %path.title))]
    pub async fn select_path(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        path: CareerPath,
    ) -> Result<RoadmapSnapshot, WaypointError> {
        path.validate()?;
        let mut roadmap = self.roadmap(email, roadmap_id).await?;
        if !matches!(
            roadmap.status,
            RoadmapStatus::CareerPathsGenerated
                | RoadmapStatus::RoadmapCompleted
                | RoadmapStatus::DetailedRoadmapCompleted
        ) {
            return Err(WaypointError::Validation(format!(
                "roadmap is {}; expected CAREER_PATHS_GENERATED",
                roadmap.status
            )));
        }

        let previous_title = roadmap.selected_career_path.as_ref().map(|p| p.title.clone());
        if let (Some(plan), Some(title)) = (&roadmap.detailed_roadmap, &previous_title) {
            if *title == path.title {
                tracing::info!("roadmap {roadmap_id}: reusing detailed plan for {title}");
                counter!("waypoint_cache_hits_total", "phase" => "detailed_plan").increment(1);
                self.assessments
                    .create_shells_for_plan(email, roadmap_id, plan)
                    .await?;
                return Ok(RoadmapSnapshot::new(roadmap, true));
            }
        }

        let profile = self.profile_for(&roadmap).await?;
        let high: HighLevelPlanResponse = self
            .generator
            .generate_json(
                "high_level_plan",
                self.request(
                    prompts::high_level_plan(&profile, &path, &self.config.allowed_resource_domains),
                    self.config.max_tokens.plan,
                ),
                HighLevelPlanResponse::check,
            )
            .await?;

        let breakdown: SubtopicsResponse = self
            .generator
            .generate_json(
                "subtopics",
                self.request(
                    prompts::subtopics(&path.title, &high.outline()),
                    self.config.max_tokens.subtopics,
                ),
                |r: &SubtopicsResponse| {
                    if r.subtopics_breakdown.is_empty() {
                        Err("subtopic breakdown is empty".to_string())
                    } else {
                        Ok(())
                    }
                },
            )
            .await?;

        let total_questions = u32::try_from(self.config.assessment_question_count).unwrap_or(u32::MAX);
        let detailed = plan::merge(
            &path.title,
            high,
            &breakdown,
            total_questions,
            &self.config.allowed_resource_domains,
        );

        // Old assessments go before the new plan is stored: if the delete
        // fails the roadmap still names the old path, and a retry takes this
        // branch again instead of the cache.
        if previous_title.is_some() {
            let removed = self.assessments.delete_for_roadmap(email, roadmap_id).await?;
            tracing::info!("roadmap {roadmap_id}: career path changed, removed {removed} assessments");
        }

        roadmap.selected_career_path = Some(path);
        roadmap.detailed_roadmap = Some(detailed);
        roadmap.status = RoadmapStatus::DetailedRoadmapCompleted;
        roadmap.updated_at = Utc::now();
        self.repo.update(&mut roadmap).await?;
        tracing::info!("roadmap {roadmap_id}: detailed plan stored");

        if let Some(plan) = &roadmap.detailed_roadmap {
            self.assessments
                .create_shells_for_plan(email, roadmap_id, plan)
                .await?;
        }

        self.stages
            .advance_best_effort(email, JourneyStage::CareerPathSelected, "career path selected")
            .await;
        self.stages
            .advance_best_effort(email, JourneyStage::RoadmapGenerated, "detailed roadmap generated")
            .await;
        Ok(RoadmapSnapshot::new(roadmap, false))
    }

    async fn profile_for(&self, roadmap: &Roadmap) -> Result<Profile, WaypointError> {
        Ok(load_current_profile(&self.repo, &roadmap.email)
            .await?
            .unwrap_or_else(|| {
                Profile::new(roadmap.email.clone(), Utc::now()).with_career_goal(roadmap.career_goal.clone())
            }))
    }
}

fn check_questions(response: &QuestionsResponse, count: usize) -> Result<(), String> {
    if response.questions.len() != count {
        return Err(format!(
            "expected {count} questions, got {}",
            response.questions.len()
        ));
    }
    let mut ids = HashSet::new();
    for question in &response.questions {
        if question.id.trim().is_empty() || question.text.trim().is_empty() {
            return Err("question with empty id or text".into());
        }
        if !ids.insert(question.id.as_str()) {
            return Err(format!("duplicate question id {}", question.id));
        }
    }
    Ok(())
}

fn check_career_paths(response: &CareerPathsResponse, count: usize) -> Result<(), String> {
    if response.career_paths.len() != count {
        return Err(format!(
            "expected {count} career paths, got {}",
            response.career_paths.len()
        ));
    }
    response
        .career_paths
        .iter()
        .try_for_each(|path| path.validate().map_err(|e| e.to_string()))
}

fn check_answers(
    questions: &[waypoint_model::CareerQuestion],
    answers: &[QuestionAnswer],
) -> Result<(), WaypointError> {
    if answers.is_empty() {
        return Err(WaypointError::Validation("answers are required".into()));
    }
    for answer in answers {
        if !questions.iter().any(|q| q.id == answer.question_id) {
            return Err(WaypointError::Validation(format!(
                "answer refers to unknown question {}",
                answer.question_id
            )));
        }
        if answer.answer.trim().is_empty() {
            return Err(WaypointError::Validation(format!(
                "empty answer for question {}",
                answer.question_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_model::CareerQuestion;

    fn questions(n: usize) -> QuestionsResponse {
        QuestionsResponse {
            questions: (1..=n)
                .map(|i| CareerQuestion {
                    id: format!("q{i}"),
                    text: format!("Question {i}?"),
                })
                .collect(),
        }
    }

    #[test]
    fn question_count_must_match() {
        assert!(check_questions(&questions(5), 5).is_ok());
        assert_eq!(check_questions(&questions(4), 5).unwrap_err(), "expected 5 questions, got 4");
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let mut response = questions(2);
        response.questions[1].id = "q1".into();
        assert!(check_questions(&response, 2).is_err());
    }

    #[test]
    fn answers_must_reference_known_questions() {
        let qs = questions(2).questions;
        let ok = vec![QuestionAnswer { question_id: "q1".into(), answer: "Yes".into() }];
        let unknown = vec![QuestionAnswer { question_id: "q9".into(), answer: "Yes".into() }];
        assert!(check_answers(&qs, &ok).is_ok());
        assert!(check_answers(&qs, &unknown).is_err());
        assert!(check_answers(&qs, &[]).is_err());
    }
}
