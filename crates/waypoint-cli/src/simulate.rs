//! Scripted end-to-end journey
//!
//! Runs profile, questions, answers, path selection, plan and one topic
//! assessment against an in-memory store and canned generator replies.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use waypoint_core::{AppContext, RoadmapProgress, WaypointConfig};
use waypoint_model::{JourneyStage, ProfileChanges, QuestionAnswer, RoadmapId};
use waypoint_store::InMemoryStore;
use waypoint_test_utils::journey_backend;

/// Inputs of a simulated journey
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Configuration
    pub config: WaypointConfig,
    /// User identity
    pub email: String,
    /// Career goal written into the profile
    pub goal: String,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            config: WaypointConfig::default(),
            email: "learner@example.com".to_string(),
            goal: "Data Engineer".to_string(),
        }
    }
}

/// What a simulated journey went through
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// User identity
    pub email: String,
    /// Roadmap created
    pub roadmap_id: RoadmapId,
    /// Path that was selected
    pub career_path: String,
    /// Topic that was assessed
    pub assessed_topic: String,
    /// Its score
    pub score: f64,
    /// Its pass flag
    pub passed: bool,
    /// Stages visited, in order
    pub stages: Vec<JourneyStage>,
    /// Journey progress
    pub journey_progress: f64,
    /// Roadmap statistics
    pub progress: RoadmapProgress,
    /// Generation calls made
    pub generation_calls: u32,
}

impl SimulationReport {
    /// Plain-text rendering
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Journey for {}", self.email);
        let _ = writeln!(out, "  roadmap:     {}", self.roadmap_id);
        let _ = writeln!(out, "  career path: {}", self.career_path);
        let _ = writeln!(
            out,
            "  assessed:    {} ({}%, {})",
            self.assessed_topic,
            self.score,
            if self.passed { "passed" } else { "failed" }
        );
        let stages: Vec<&str> = self.stages.iter().map(|s| s.as_str()).collect();
        let _ = writeln!(out, "  stages:      {}", stages.join(" -> "));
        let _ = writeln!(out, "  journey:     {}%", self.journey_progress);
        let _ = writeln!(
            out,
            "  topics:      {}/{} completed, {} passed, average {}",
            self.progress.completed, self.progress.total, self.progress.passed, self.progress.average_score
        );
        let _ = writeln!(out, "  generations: {}", self.generation_calls);
        out
    }
}

/// Run one scripted journey
///
/// # Errors
///
/// Any step failing, with the step named in the context.
pub async fn run_simulation(options: SimulationOptions) -> Result<SimulationReport> {
    let backend = Arc::new(journey_backend(&options.config));
    let ctx = AppContext::new(options.config, Arc::new(InMemoryStore::new()), backend.clone())
        .context("building services")?;
    let email = options.email.as_str();
    tracing::info!("simulating journey for {email} towards {}", options.goal);

    let changes = ProfileChanges {
        name: Some("Simulated Learner".into()),
        career_goal: Some(options.goal.clone()),
        ..ProfileChanges::default()
    };
    let profile = ctx.profiles.update(email, &changes).await.context("saving profile")?.profile;

    let snapshot = ctx
        .pipeline
        .generate_questions(&profile)
        .await
        .context("generating questions")?;
    let roadmap_id = snapshot.roadmap_id;
    let answers: Vec<QuestionAnswer> = snapshot
        .roadmap
        .questions
        .unwrap_or_default()
        .into_iter()
        .map(|q| QuestionAnswer {
            question_id: q.id,
            answer: "Yes".into(),
        })
        .collect();

    let snapshot = ctx
        .pipeline
        .submit_answers(email, roadmap_id, answers)
        .await
        .context("submitting answers")?;
    let path = snapshot
        .roadmap
        .career_paths
        .and_then(|paths| paths.into_iter().next())
        .ok_or_else(|| anyhow!("no career path was recommended"))?;
    let career_path = path.title.clone();

    let snapshot = ctx
        .pipeline
        .select_path(email, roadmap_id, path)
        .await
        .context("selecting career path")?;
    let topic = snapshot
        .roadmap
        .detailed_roadmap
        .as_ref()
        .and_then(|plan| plan.unique_topics().first().map(|(topic, _)| (*topic).to_string()))
        .ok_or_else(|| anyhow!("detailed plan has no topics"))?;

    let assessment = ctx
        .assessments
        .generate_topic_assessment(email, roadmap_id, &topic)
        .await
        .with_context(|| format!("generating assessment for {topic}"))?;
    let answers: Vec<String> = assessment.questions.iter().map(|_| "A".to_string()).collect();
    let assessment = ctx
        .assessments
        .evaluate(email, assessment.id, &answers)
        .await
        .with_context(|| format!("evaluating {topic}"))?;

    let progress = ctx
        .progress
        .roadmap_progress(email, roadmap_id)
        .await
        .context("computing progress")?;
    let journey = ctx
        .stages
        .journey(email)
        .await?
        .ok_or_else(|| anyhow!("journey missing for {email}"))?;

    tracing::info!("simulation finished at {}", journey.current_stage);
    let mut stages = vec![JourneyStage::Authenticated];
    stages.extend(journey.transitions.iter().map(|t| t.to));

    Ok(SimulationReport {
        email: options.email,
        roadmap_id,
        career_path,
        assessed_topic: topic,
        score: assessment.percentage_score.unwrap_or_default(),
        passed: assessment.is_passed.unwrap_or(false),
        stages,
        journey_progress: journey.progress_percentage,
        progress,
        generation_calls: backend.call_count(),
    })
}
