//! Topic assessments
//!
//! Lifecycle: `created -> in_progress -> completed`, with `expired` and
//! `abandoned` as externally triggered terminal states. One assessment
//! exists per (roadmap, topic); its sort key is `"{roadmap_id}#{topic}"`.

pub mod wire;

use crate::config::WaypointConfig;
use crate::error::WaypointError;
use crate::profile::load_current_profile;
use crate::progress::ProgressAggregator;
use crate::prompts;
use crate::repo::Repository;
use crate::stage::StageMachine;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use waypoint_llm::{GenerationRequest, RetryCoordinator};
use waypoint_model::{
    Assessment, AssessmentId, AssessmentStatus, DetailedPlan, JourneyStage, Roadmap, RoadmapId,
};
use wire::{EvaluationResponse, QuestionsPayload};

const DEFAULT_PHASE: &str = "General";

/// Creates, fills, answers and scores topic assessments
#[derive(Debug, Clone)]
pub struct AssessmentEngine {
    repo: Repository,
    generator: RetryCoordinator,
    stages: StageMachine,
    progress: ProgressAggregator,
    config: Arc<WaypointConfig>,
}

impl AssessmentEngine {
    /// Create an engine
    #[must_use]
    pub fn new(
        repo: Repository,
        generator: RetryCoordinator,
        stages: StageMachine,
        progress: ProgressAggregator,
        config: Arc<WaypointConfig>,
    ) -> Self {
        Self {
            repo,
            generator,
            stages,
            progress,
            config,
        }
    }

    /// Shell for `topic`, created unless it exists
    ///
    /// Phase and order come from the roadmap's detailed plan when the topic
    /// is in it.
    ///
    /// # Errors
    ///
    /// [`WaypointError::NotFound`] for an unknown roadmap; store failures.
    pub async fn create_shell(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        topic: &str,
    ) -> Result<Assessment, WaypointError> {
        let roadmap: Roadmap = self.repo.require(email, &roadmap_id.to_string()).await?;
        let placed = roadmap.detailed_roadmap.as_ref().and_then(|plan| {
            plan.unique_topics()
                .into_iter()
                .zip(1u32..)
                .find(|((_, name), _)| *name == topic)
                .map(|((phase, _), order)| (phase.to_string(), order))
        });
        let (phase, order) = match placed {
            Some(placed) => placed,
            None => {
                let existing = self.list_for_roadmap(email, roadmap_id).await?;
                let order = u32::try_from(existing.len()).unwrap_or(u32::MAX).saturating_add(1);
                (DEFAULT_PHASE.to_string(), order)
            }
        };
        self.ensure_shell(email, roadmap_id, topic, &phase, order).await
    }

    /// One shell per distinct topic of `plan`, in first-appearance order
    ///
    /// Existing shells are kept, so a partially applied plan can be resumed.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn create_shells_for_plan(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        plan: &DetailedPlan,
    ) -> Result<Vec<Assessment>, WaypointError> {
        let mut shells = Vec::new();
        for ((topic, phase), order) in plan.unique_topics().into_iter().zip(1u32..) {
            shells.push(self.ensure_shell(email, roadmap_id, topic, phase, order).await?);
        }
        tracing::debug!("roadmap {roadmap_id}: {} assessment shells in place", shells.len());
        Ok(shells)
    }

    async fn ensure_shell(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        topic: &str,
        phase: &str,
        order: u32,
    ) -> Result<Assessment, WaypointError> {
        let key = Assessment::sort_key(roadmap_id, topic);
        if let Some(existing) = self.repo.get::<Assessment>(email, &key).await? {
            return Ok(existing);
        }
        let mut shell = Assessment::shell(email, roadmap_id, topic, phase, order, Utc::now());
        match self.repo.insert(&mut shell).await {
            Ok(()) => {
                counter!("waypoint_assessment_shells_created_total").increment(1);
                Ok(shell)
            }
            Err(WaypointError::Conflict(_)) => {
                tracing::debug!("shell {key} created concurrently, using the stored one");
                self.repo.require(email, &key).await
            }
            Err(e) => Err(e),
        }
    }

    /// Every assessment of a roadmap, in plan order
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn list_for_roadmap(&self, email: &str, roadmap_id: RoadmapId) -> Result<Vec<Assessment>, WaypointError> {
        let mut assessments: Vec<Assessment> = self
            .repo
            .query(email, Some(&format!("{roadmap_id}#")))
            .await?;
        assessments.sort_by_key(|a| a.order);
        Ok(assessments)
    }

    /// Delete every assessment of a roadmap, returning how many went
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn delete_for_roadmap(&self, email: &str, roadmap_id: RoadmapId) -> Result<usize, WaypointError> {
        let mut removed = 0;
        for assessment in self.list_for_roadmap(email, roadmap_id).await? {
            let key = Assessment::sort_key(roadmap_id, &assessment.topic);
            if self.repo.delete::<Assessment>(email, &key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Assessment by id
    ///
    /// # Errors
    ///
    /// [`WaypointError::NotFound`]; store failures.
    pub async fn find(&self, email: &str, assessment_id: AssessmentId) -> Result<Assessment, WaypointError> {
        let all: Vec<Assessment> = self.repo.query(email, None).await?;
        all.into_iter()
            .find(|a| a.id == assessment_id)
            .ok_or_else(|| WaypointError::not_found("assessment", assessment_id))
    }

    /// Generate the quiz of an assessment
    ///
    /// Asks for `assessment_question_count` questions; a different count is
    /// logged and accepted.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] for a terminal assessment; generation,
    /// parse, conflict and store failures.
    #[tracing::instrument(skip(self, profile_context))]
    pub async fn generate_questions(
        &self,
        email: &str,
        assessment_id: AssessmentId,
        profile_context: &str,
    ) -> Result<Assessment, WaypointError> {
        let mut assessment = self.find(email, assessment_id).await?;
        if assessment.status.is_terminal() {
            return Err(WaypointError::Validation(format!(
                "assessment is {}; questions can no longer change",
                assessment.status
            )));
        }

        let count = self.config.assessment_question_count;
        let request = GenerationRequest::new(prompts::assessment_questions(&assessment.topic, profile_context, count))
            .with_system(prompts::SYSTEM)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens.assessment);
        let payload: QuestionsPayload = self
            .generator
            .generate_json("assessment_questions", request, QuestionsPayload::check)
            .await?;
        let questions = payload.into_questions();
        if questions.len() != count {
            tracing::warn!(
                "assessment {assessment_id}: asked for {count} questions, got {}",
                questions.len()
            );
        }

        assessment.total_questions = u32::try_from(questions.len()).unwrap_or(u32::MAX);
        assessment.user_answers = vec![None; questions.len()];
        assessment.questions = questions;
        assessment.questions_answered = 0;
        assessment.current_question = 0;
        assessment.updated_at = Utc::now();
        self.repo.update(&mut assessment).await?;
        Ok(assessment)
    }

    /// Assessment of a plan topic, with questions
    ///
    /// Creates the shell and the quiz when missing; returns the stored
    /// assessment unchanged otherwise.
    ///
    /// # Errors
    ///
    /// [`WaypointError::NotFound`] when the plan has no such topic;
    /// generation, parse, conflict and store failures.
    pub async fn generate_topic_assessment(
        &self,
        email: &str,
        roadmap_id: RoadmapId,
        topic: &str,
    ) -> Result<Assessment, WaypointError> {
        let roadmap: Roadmap = self.repo.require(email, &roadmap_id.to_string()).await?;
        let plan = roadmap.detailed_roadmap.as_ref().ok_or_else(|| {
            WaypointError::Validation(format!("roadmap {roadmap_id} has no detailed plan yet"))
        })?;
        let (phase, plan_topic) = plan
            .find_topic(topic)
            .ok_or_else(|| WaypointError::not_found("topic", topic))?;

        let assessment = self.create_shell(email, roadmap_id, topic).await?;
        if !assessment.questions.is_empty() {
            return Ok(assessment);
        }

        let mut context = match load_current_profile(&self.repo, email).await? {
            Some(profile) => prompts::profile_context(&profile),
            None => format!("Career goal: {}", roadmap.career_goal),
        };
        context.push_str(&format!(
            "\nCareer path: {}\nPhase: {}\nSubtopics: {}",
            plan.career_title,
            phase.phase,
            plan_topic.subtopics.join(", ")
        ));
        self.generate_questions(email, assessment.id, &context).await
    }

    /// Record the answer to question `index`
    ///
    /// The first answer starts the assessment.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] for a terminal assessment, a quiz
    /// without questions or an out-of-range index; conflict and store failures.
    pub async fn submit_answer(
        &self,
        email: &str,
        assessment_id: AssessmentId,
        index: usize,
        answer: &str,
    ) -> Result<Assessment, WaypointError> {
        let mut assessment = self.find(email, assessment_id).await?;
        if assessment.status.is_terminal() {
            return Err(WaypointError::Validation(format!(
                "assessment is {}; answers are closed",
                assessment.status
            )));
        }
        let len = assessment.questions.len();
        if index >= len {
            return Err(WaypointError::Validation(format!(
                "answer index {index} out of range for {len} questions"
            )));
        }

        let now = Utc::now();
        assessment.user_answers.resize(len, None);
        assessment.user_answers[index] = non_empty(answer);
        recount(&mut assessment, Some(index));
        if assessment.status == AssessmentStatus::Created {
            assessment.transition(AssessmentStatus::InProgress, now)?;
        }
        assessment.updated_at = now;
        self.repo.update(&mut assessment).await?;
        Ok(assessment)
    }

    /// Score the answer set and complete the assessment
    ///
    /// `answers` replaces stored answers position by position; pass an empty
    /// slice to evaluate what was submitted. Evaluating a completed
    /// assessment only repeats the plan sync, so an interrupted evaluation
    /// can be finished.
    ///
    /// Once the scored assessment is saved the call succeeds: a plan sync
    /// failure after that point is logged, and the plan catches up on the
    /// next evaluation of the same assessment.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] for an expired or abandoned assessment,
    /// too many answers, or no answer at all; generation, parse, conflict
    /// and store failures.
    #[tracing::instrument(skip(self, answers))]
    pub async fn evaluate(
        &self,
        email: &str,
        assessment_id: AssessmentId,
        answers: &[String],
    ) -> Result<Assessment, WaypointError> {
        let mut assessment = self.find(email, assessment_id).await?;
        match assessment.status {
            AssessmentStatus::Completed => {
                tracing::info!("assessment {assessment_id} already evaluated, re-syncing plan");
                self.after_evaluation(&assessment).await?;
                return Ok(assessment);
            }
            AssessmentStatus::Expired | AssessmentStatus::Abandoned => {
                return Err(WaypointError::Validation(format!(
                    "assessment is {}; it can no longer be evaluated",
                    assessment.status
                )))
            }
            AssessmentStatus::Created | AssessmentStatus::InProgress => {}
        }

        let len = assessment.questions.len();
        if len == 0 {
            return Err(WaypointError::Validation("assessment has no questions".into()));
        }
        if answers.len() > len {
            return Err(WaypointError::Validation(format!(
                "{} answers for {len} questions",
                answers.len()
            )));
        }
        assessment.user_answers.resize(len, None);
        for (slot, answer) in assessment.user_answers.iter_mut().zip(answers) {
            *slot = non_empty(answer);
        }
        recount(&mut assessment, None);
        if assessment.questions_answered == 0 {
            return Err(WaypointError::Validation(
                "at least one question must be answered".into(),
            ));
        }

        let request = GenerationRequest::new(prompts::evaluation(
            &assessment.topic,
            &assessment.questions,
            &assessment.user_answers,
        ))
        .with_system(prompts::SYSTEM)
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens.evaluation);
        let response: EvaluationResponse = self
            .generator
            .generate_json("evaluation", request, |_: &EvaluationResponse| Ok(()))
            .await?;

        let score = response.score(u32::try_from(len).unwrap_or(u32::MAX));
        let passed = score.percentage >= self.config.pass_threshold;
        let now = Utc::now();
        if assessment.status == AssessmentStatus::Created {
            assessment.transition(AssessmentStatus::InProgress, now)?;
        }
        assessment.transition(AssessmentStatus::Completed, now)?;
        assessment.total_questions = score.total;
        assessment.correct_answers = score.correct;
        assessment.percentage_score = Some(score.percentage);
        assessment.is_passed = Some(passed);
        assessment.evaluation = Some(response.evaluation());
        assessment.skill_gaps = response.skill_gaps;
        assessment.strengths = response.strengths;
        assessment.recommendations = response.recommendations;
        self.repo.update(&mut assessment).await?;

        counter!(
            "waypoint_assessments_evaluated_total",
            "result" => if passed { "passed" } else { "failed" }
        )
        .increment(1);
        tracing::info!(
            "assessment {assessment_id} ({}): {}% {}",
            assessment.topic,
            score.percentage,
            if passed { "passed" } else { "failed" }
        );

        if let Err(e) = self.after_evaluation(&assessment).await {
            tracing::warn!(
                "assessment {assessment_id}: evaluation saved but plan sync failed ({e}); evaluating again resumes it"
            );
        }
        Ok(assessment)
    }

    async fn after_evaluation(&self, assessment: &Assessment) -> Result<(), WaypointError> {
        let roadmap = self
            .progress
            .sync_topic_progress(
                &assessment.email,
                assessment.roadmap_id,
                &assessment.topic,
                assessment.correct_answers,
                assessment.total_questions,
            )
            .await?;

        self.stages
            .advance_best_effort(&assessment.email, JourneyStage::RoadmapActive, "assessment completed")
            .await;
        if roadmap
            .detailed_roadmap
            .as_ref()
            .is_some_and(DetailedPlan::all_topics_completed)
        {
            self.stages
                .advance_best_effort(&assessment.email, JourneyStage::JourneyCompleted, "all topics assessed")
                .await;
        }
        Ok(())
    }

    /// Close an unfinished assessment as expired
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] from a terminal state; conflict and store failures.
    pub async fn expire(&self, email: &str, assessment_id: AssessmentId) -> Result<Assessment, WaypointError> {
        self.close(email, assessment_id, AssessmentStatus::Expired).await
    }

    /// Close an unfinished assessment as abandoned
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] from a terminal state; conflict and store failures.
    pub async fn abandon(&self, email: &str, assessment_id: AssessmentId) -> Result<Assessment, WaypointError> {
        self.close(email, assessment_id, AssessmentStatus::Abandoned).await
    }

    async fn close(
        &self,
        email: &str,
        assessment_id: AssessmentId,
        to: AssessmentStatus,
    ) -> Result<Assessment, WaypointError> {
        let mut assessment = self.find(email, assessment_id).await?;
        assessment.transition(to, Utc::now())?;
        self.repo.update(&mut assessment).await?;
        tracing::info!("assessment {assessment_id} {to}");
        Ok(assessment)
    }
}

fn non_empty(answer: &str) -> Option<String> {
    let trimmed = answer.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Refresh `questions_answered` and move `current_question` past `answered`
fn recount(assessment: &mut Assessment, answered: Option<usize>) {
    let count = assessment.user_answers.iter().filter(|a| a.is_some()).count();
    assessment.questions_answered = u32::try_from(count).unwrap_or(u32::MAX);
    let len = assessment.questions.len();
    let next = match answered {
        Some(index) => (index + 1).min(len),
        None => assessment
            .user_answers
            .iter()
            .position(Option::is_none)
            .unwrap_or(len),
    };
    assessment.current_question = u32::try_from(next).unwrap_or(u32::MAX);
}
