//! Testing utilities for the Waypoint workspace
//!
//! Canned generator outputs, sample profiles and a ready-built [`Harness`]
//! over [`InMemoryStore`] and [`ScriptedBackend`].

#![allow(missing_docs)]

pub mod faults;

pub use faults::FaultyStore;

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use waypoint_core::{AppContext, WaypointConfig, WaypointError};
use waypoint_llm::{ScriptedBackend, ScriptedReply};
use waypoint_model::{CareerPath, Profile, QuestionAnswer};
use waypoint_store::InMemoryStore;

pub const EMAIL: &str = "ada@example.com";
pub const GOAL: &str = "Data Engineer";
pub const PRIMARY_PATH: &str = "Analytics Engineer";
pub const SECONDARY_PATH: &str = "ML Platform Engineer";

/// Services over a fresh in-memory store and a scripted backend
///
/// The services reach the store through `faults`, so a test can make
/// chosen operations fail.
#[derive(Debug, Clone)]
pub struct Harness {
    pub ctx: AppContext,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<InMemoryStore>,
    pub faults: Arc<FaultyStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(ScriptedBackend::new())
    }

    pub fn with_backend(backend: ScriptedBackend) -> Self {
        Self::with_parts(WaypointConfig::new(), backend)
    }

    pub fn with_config(config: WaypointConfig) -> Self {
        Self::with_parts(config, ScriptedBackend::new())
    }

    /// # Panics
    ///
    /// When `config` does not validate.
    pub fn with_parts(config: WaypointConfig, backend: ScriptedBackend) -> Self {
        let backend = Arc::new(backend);
        let store = Arc::new(InMemoryStore::new());
        let faults = Arc::new(FaultyStore::new(store.clone()));
        let ctx = AppContext::new(config, faults.clone(), backend.clone()).expect("valid test config");
        Self {
            ctx,
            backend,
            store,
            faults,
        }
    }

    pub fn reply(&self, value: &Value) {
        self.backend.push(ScriptedReply::Text(value.to_string()));
    }

    pub fn reply_text(&self, text: impl Into<String>) {
        self.backend.push(ScriptedReply::Text(text.into()));
    }

    /// Save [`sample_profile`] through the profile service
    pub async fn seed_profile(&self) -> Result<Profile, WaypointError> {
        let changes = waypoint_model::ProfileChanges {
            name: Some("Ada".into()),
            career_goal: Some(GOAL.into()),
            current_role: Some("Data Analyst".into()),
            experience: Some("3 years".into()),
            skills: Some(vec!["SQL".into(), "Excel".into()]),
            education: Some("BSc Mathematics".into()),
            interests: Some(vec!["pipelines".into()]),
        };
        Ok(self.ctx.profiles.update(EMAIL, &changes).await?.profile)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sample_profile() -> Profile {
    Profile::new(EMAIL, Utc::now())
        .with_career_goal(GOAL)
        .with_skills(vec!["SQL".into(), "Excel".into()])
}

pub fn career_questions_json(count: usize) -> Value {
    let questions: Vec<Value> = (1..=count)
        .map(|i| json!({"id": format!("q{i}"), "text": format!("Do you enjoy task {i}?")}))
        .collect();
    json!({ "questions": questions })
}

pub fn answers_for(count: usize) -> Vec<QuestionAnswer> {
    (1..=count)
        .map(|i| QuestionAnswer {
            question_id: format!("q{i}"),
            answer: if i % 2 == 0 { "No".into() } else { "Yes".into() },
        })
        .collect()
}

pub fn career_path_json(title: &str) -> Value {
    json!({
        "title": title,
        "description": format!("Build a career as {title}"),
        "timeToAchieve": "12 months",
        "averageSalary": "$110k",
        "keySkillsRequired": ["SQL", "Python"],
        "learningRoadmap": ["Foundations", "Projects"],
        "aiRecommendation": {"reason": "Matches your analytics background"}
    })
}

pub fn career_paths_json() -> Value {
    career_paths_json_for(3)
}

/// `count` paths, starting with [`PRIMARY_PATH`] and [`SECONDARY_PATH`]
pub fn career_paths_json_for(count: usize) -> Value {
    let paths: Vec<Value> = (1..=count)
        .map(|i| match i {
            1 => career_path_json(PRIMARY_PATH),
            2 => career_path_json(SECONDARY_PATH),
            _ => career_path_json(&format!("Data Role {i}")),
        })
        .collect();
    json!({ "careerPaths": paths })
}

/// # Panics
///
/// Never for the titles used in this crate.
pub fn career_path(title: &str) -> CareerPath {
    serde_json::from_value(career_path_json(title)).expect("fixture career path")
}

/// High-level plan where "Python Basics" appears in two phases
pub fn plan_json(title: &str) -> Value {
    json!({
        "careerTitle": title,
        "highLevelRoadmap": [
            {
                "phase": "Beginner",
                "duration": "2 months",
                "topics": ["Python Basics", "SQL Fundamentals"],
                "resources": [
                    {"title": "Python for Everybody", "url": "https://www.coursera.org/specializations/python"},
                    {"title": "Homepage", "url": "https://www.udemy.com/"},
                    {"title": "Blog", "url": "https://example.com/sql"}
                ],
                "outcomes": ["Write scripts"]
            },
            {
                "phase": "Intermediate",
                "duration": "3 months",
                "topics": ["Python Basics", {"name": "Data Modeling"}],
                "resources": ["https://docs.python.org/3/tutorial/"],
                "outcomes": ["Model a warehouse"]
            }
        ],
        "capstoneProjects": ["Build a batch pipeline"]
    })
}

pub fn subtopics_json() -> Value {
    json!({
        "subtopicsBreakdown": [
            {"phase": "Beginner", "topics": [
                {"topic": "Python Basics", "subtopics": ["Syntax", "Functions"]},
                {"topic": "SQL Fundamentals", "subtopics": ["SELECT", "JOIN"]}
            ]},
            {"phase": "Intermediate", "topics": [
                {"topic": "Python Basics", "subtopics": ["Modules"]},
                {"topic": "Data Modeling", "subtopics": ["Star schema"]}
            ]}
        ]
    })
}

pub fn assessment_questions_json(count: usize) -> Value {
    let questions: Vec<Value> = (1..=count)
        .map(|i| match i {
            1 => json!({"question": "Explain list comprehensions.", "type": "theory", "difficulty": "medium"}),
            2 => json!({"question": "A job fails nightly. What do you check?", "type": "scenario", "difficulty": "hard"}),
            _ => json!({
                "question": format!("Multiple choice {i}"),
                "type": "multiple_choice",
                "difficulty": "medium",
                "options": ["A. one", "B. two", "C. three", "D. four"],
                "correct_answer": "A"
            }),
        })
        .collect();
    Value::Array(questions)
}

pub fn evaluation_json(correct: u32, total: u32, overall: &str) -> Value {
    json!({
        "Skill": "Python Basics",
        "Total_Questions": total,
        "Correct_Answers": correct,
        "Intermediate_score": "70%",
        "Advanced_score": "40%",
        "theory_question_score": 50,
        "Overall": overall,
        "Summary": ["Good grasp of syntax"],
        "skill_gaps": ["error handling"],
        "strengths": ["comprehensions"],
        "recommendations": ["practice exceptions"]
    })
}

/// Replies for every generation call of one journey, in call order:
/// questions, paths, plan, subtopics, one quiz and its evaluation
pub fn journey_replies(config: &WaypointConfig) -> Vec<Value> {
    vec![
        career_questions_json(config.career_question_count),
        career_paths_json_for(config.career_path_count),
        plan_json(PRIMARY_PATH),
        subtopics_json(),
        assessment_questions_json(config.assessment_question_count),
        evaluation_json(3, 5, "60%"),
    ]
}

/// Backend preloaded with [`journey_replies`]
pub fn journey_backend(config: &WaypointConfig) -> ScriptedBackend {
    journey_replies(config)
        .into_iter()
        .fold(ScriptedBackend::new(), |backend, reply| backend.with_response(reply.to_string()))
}
