//! Roadmap aggregate and the planning artifacts it accumulates

use crate::error::ModelError;
use crate::ids::RoadmapId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline phase a roadmap has completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoadmapStatus {
    /// Discovery questions stored
    QuestionsGenerated,
    /// Answers and career paths stored
    CareerPathsGenerated,
    /// Legacy status: a path was selected but no detailed plan is guaranteed
    RoadmapCompleted,
    /// Detailed plan stored and assessment shells created
    DetailedRoadmapCompleted,
}

impl RoadmapStatus {
    /// Number of pipeline phases this status represents
    #[must_use]
    pub const fn phase(self) -> u8 {
        match self {
            Self::QuestionsGenerated => 1,
            Self::CareerPathsGenerated => 2,
            Self::RoadmapCompleted => 3,
            Self::DetailedRoadmapCompleted => 4,
        }
    }

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuestionsGenerated => "QUESTIONS_GENERATED",
            Self::CareerPathsGenerated => "CAREER_PATHS_GENERATED",
            Self::RoadmapCompleted => "ROADMAP_COMPLETED",
            Self::DetailedRoadmapCompleted => "DETAILED_ROADMAP_COMPLETED",
        }
    }
}

impl fmt::Display for RoadmapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoadmapStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::QuestionsGenerated,
            Self::CareerPathsGenerated,
            Self::RoadmapCompleted,
            Self::DetailedRoadmapCompleted,
        ]
        .into_iter()
        .find(|status| status.as_str() == s.trim())
        .ok_or_else(|| ModelError::UnknownStatus {
            kind: "roadmap",
            value: s.to_string(),
        })
    }
}

/// Discovery question shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerQuestion {
    /// Stable identifier ("q1", "q2", ...)
    pub id: String,
    /// Question text
    pub text: String,
}

/// User's answer to one discovery question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    /// Id of the answered question
    pub question_id: String,
    /// Chosen answer (Yes, No, Agree, Disagree, Not Sure)
    pub answer: String,
}

/// Why a path was recommended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiRecommendation {
    /// Short justification
    #[serde(default)]
    pub reason: String,
}

/// A recommended career path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPath {
    /// Path title; also the detailed-plan cache key
    pub title: String,
    /// Summary of the path
    pub description: String,
    /// Expected time to reach the goal
    #[serde(default)]
    pub time_to_achieve: String,
    /// Salary range
    #[serde(default)]
    pub average_salary: String,
    /// Skills the path relies on
    #[serde(default)]
    pub key_skills_required: Vec<String>,
    /// Coarse learning steps
    #[serde(default)]
    pub learning_roadmap: Vec<String>,
    /// Recommendation rationale
    #[serde(default)]
    pub ai_recommendation: AiRecommendation,
}

impl CareerPath {
    /// Check that title, description and key skills are present
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidRecord`] naming the first missing field.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::InvalidRecord("career path title is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(ModelError::InvalidRecord(
                "career path description is required".into(),
            ));
        }
        if self.key_skills_required.iter().all(|s| s.trim().is_empty()) {
            return Err(ModelError::InvalidRecord(
                "career path key skills are required".into(),
            ));
        }
        Ok(())
    }
}

/// Link to a learning resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Absolute URL
    pub url: String,
}

/// Topic inside a plan phase, with denormalized assessment progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTopic {
    /// Topic name; unique key for its assessment within the roadmap
    pub topic: String,
    /// Finer-grained subtopics
    #[serde(default)]
    pub subtopics: Vec<String>,
    /// Assessment completed
    #[serde(default)]
    pub is_completed: bool,
    /// Questions in the topic assessment
    #[serde(default)]
    pub total_questions: u32,
    /// Correct answers in the topic assessment
    #[serde(default)]
    pub correct_answers: u32,
    /// `correct / total * 100`, two decimals
    #[serde(default)]
    pub score: f64,
}

impl PlanTopic {
    /// Fresh, not yet assessed topic
    #[must_use]
    pub fn new(topic: impl Into<String>, subtopics: Vec<String>, total_questions: u32) -> Self {
        Self {
            topic: topic.into(),
            subtopics,
            is_completed: false,
            total_questions,
            correct_answers: 0,
            score: 0.0,
        }
    }
}

/// One phase of the detailed plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPhase {
    /// Phase name (Beginner, Intermediate, Advanced, Capstone Projects)
    pub phase: String,
    /// Expected duration
    #[serde(default)]
    pub duration: String,
    /// Topics in this phase
    #[serde(default)]
    pub topics: Vec<PlanTopic>,
    /// Domain-restricted resource links
    #[serde(default)]
    pub resources: Vec<ResourceLink>,
    /// Learning outcomes
    #[serde(default)]
    pub outcomes: Vec<String>,
}

/// Capstone project entry; generators emit either a bare name or an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapstoneProject {
    /// Just a project name
    Named(String),
    /// Name plus description
    Detailed {
        /// Project title
        title: String,
        /// What the project involves
        #[serde(default)]
        description: String,
    },
}

/// Detailed phased plan for the selected career path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedPlan {
    /// Title of the path the plan was generated for
    pub career_title: String,
    /// Ordered phases
    pub high_level_roadmap: Vec<PlanPhase>,
    /// Capstone projects
    #[serde(default)]
    pub capstone_projects: Vec<CapstoneProject>,
}

impl DetailedPlan {
    /// Topic names in first-appearance order with the phase they first appear in
    #[must_use]
    pub fn unique_topics(&self) -> Vec<(&str, &str)> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for phase in &self.high_level_roadmap {
            for topic in &phase.topics {
                if !seen.iter().any(|(name, _)| *name == topic.topic) {
                    seen.push((topic.topic.as_str(), phase.phase.as_str()));
                }
            }
        }
        seen
    }

    /// First phase containing `topic`, with the topic entry
    #[must_use]
    pub fn find_topic(&self, topic: &str) -> Option<(&PlanPhase, &PlanTopic)> {
        self.high_level_roadmap.iter().find_map(|phase| {
            phase
                .topics
                .iter()
                .find(|t| t.topic == topic)
                .map(|t| (phase, t))
        })
    }

    /// Every entry for `topic`, across all phases
    pub fn topics_named_mut<'a>(&'a mut self, topic: &'a str) -> impl Iterator<Item = &'a mut PlanTopic> + 'a {
        self.high_level_roadmap
            .iter_mut()
            .flat_map(|phase| phase.topics.iter_mut())
            .filter(move |t| t.topic == topic)
    }

    /// Whether every topic has a completed assessment
    #[must_use]
    pub fn all_topics_completed(&self) -> bool {
        let mut topics = self
            .high_level_roadmap
            .iter()
            .flat_map(|phase| phase.topics.iter())
            .peekable();
        topics.peek().is_some() && topics.all(|t| t.is_completed)
    }
}

/// The central aggregate: a user's planning artifacts across pipeline phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    /// Identifier; ULID so the latest roadmap sorts last
    pub id: RoadmapId,
    /// Owner
    pub email: String,
    /// Completed phase
    pub status: RoadmapStatus,
    /// Career goal the roadmap was generated for
    #[serde(default)]
    pub career_goal: String,
    /// Phase 1 output
    #[serde(default)]
    pub questions: Option<Vec<CareerQuestion>>,
    /// Phase 2 input
    #[serde(default)]
    pub answers: Option<Vec<QuestionAnswer>>,
    /// Phase 2 output
    #[serde(default)]
    pub career_paths: Option<Vec<CareerPath>>,
    /// Phase 3 input
    #[serde(default)]
    pub selected_career_path: Option<CareerPath>,
    /// Phase 3 output
    #[serde(default)]
    pub detailed_roadmap: Option<DetailedPlan>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
    /// Store revision stamp
    #[serde(skip)]
    pub revision: u64,
}

impl Roadmap {
    /// New roadmap holding freshly generated questions
    #[must_use]
    pub fn with_questions(
        email: impl Into<String>,
        career_goal: impl Into<String>,
        questions: Vec<CareerQuestion>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RoadmapId::new(),
            email: email.into(),
            status: RoadmapStatus::QuestionsGenerated,
            career_goal: career_goal.into(),
            questions: Some(questions),
            answers: None,
            career_paths: None,
            selected_career_path: None,
            detailed_roadmap: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Check that payload fields match the status
    ///
    /// A field belonging to a later phase may only be present once the
    /// status says that phase completed, and every field of a completed
    /// phase must be present.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidRecord`] describing the first mismatch.
    pub fn check_invariants(&self) -> Result<(), ModelError> {
        let phase = self.status.phase();
        let fields: [(&str, bool, u8); 5] = [
            ("questions", self.questions.is_some(), 1),
            ("answers", self.answers.is_some(), 2),
            ("career_paths", self.career_paths.is_some(), 2),
            ("selected_career_path", self.selected_career_path.is_some(), 3),
            ("detailed_roadmap", self.detailed_roadmap.is_some(), 4),
        ];

        for (name, present, needed) in fields {
            if present && needed > phase {
                return Err(ModelError::InvalidRecord(format!(
                    "{name} present while roadmap status is {}",
                    self.status
                )));
            }
            if !present && needed <= phase {
                return Err(ModelError::InvalidRecord(format!(
                    "{name} missing while roadmap status is {}",
                    self.status
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(title: &str) -> CareerPath {
        CareerPath {
            title: title.into(),
            description: "desc".into(),
            time_to_achieve: String::new(),
            average_salary: String::new(),
            key_skills_required: vec!["Rust".into()],
            learning_roadmap: Vec::new(),
            ai_recommendation: AiRecommendation::default(),
        }
    }

    fn topic(name: &str) -> PlanTopic {
        PlanTopic::new(name, Vec::new(), 5)
    }

    #[test]
    fn fresh_roadmap_satisfies_invariants() {
        let roadmap = Roadmap::with_questions("a@b.c", "goal", Vec::new(), Utc::now());
        assert!(roadmap.check_invariants().is_ok());
    }

    #[test]
    fn later_phase_field_without_status_is_rejected() {
        let mut roadmap = Roadmap::with_questions("a@b.c", "goal", Vec::new(), Utc::now());
        roadmap.career_paths = Some(vec![path("Engineer")]);
        let err = roadmap.check_invariants().unwrap_err();
        assert!(err.to_string().contains("career_paths present"));
    }

    #[test]
    fn completed_phase_field_must_be_present() {
        let mut roadmap = Roadmap::with_questions("a@b.c", "goal", Vec::new(), Utc::now());
        roadmap.status = RoadmapStatus::CareerPathsGenerated;
        let err = roadmap.check_invariants().unwrap_err();
        assert!(err.to_string().contains("answers missing"));
    }

    #[test]
    fn career_path_requires_key_skills() {
        let mut p = path("Engineer");
        p.key_skills_required = vec![" ".into()];
        assert!(p.validate().is_err());
        assert!(path("Engineer").validate().is_ok());
    }

    #[test]
    fn unique_topics_keep_first_phase() {
        let plan = DetailedPlan {
            career_title: "Engineer".into(),
            high_level_roadmap: vec![
                PlanPhase {
                    phase: "Beginner".into(),
                    duration: String::new(),
                    topics: vec![topic("Python Basics"), topic("Git")],
                    resources: Vec::new(),
                    outcomes: Vec::new(),
                },
                PlanPhase {
                    phase: "Intermediate".into(),
                    duration: String::new(),
                    topics: vec![topic("Python Basics"), topic("APIs")],
                    resources: Vec::new(),
                    outcomes: Vec::new(),
                },
            ],
            capstone_projects: Vec::new(),
        };

        assert_eq!(
            plan.unique_topics(),
            vec![
                ("Python Basics", "Beginner"),
                ("Git", "Beginner"),
                ("APIs", "Intermediate")
            ]
        );
        assert!(!plan.all_topics_completed());
    }

    #[test]
    fn capstone_accepts_strings_and_objects() {
        let json = r#"["Portfolio site", {"title": "ML pipeline", "description": "end to end"}]"#;
        let projects: Vec<CapstoneProject> = serde_json::from_str(json).unwrap();
        assert_eq!(projects[0], CapstoneProject::Named("Portfolio site".into()));
        assert!(matches!(projects[1], CapstoneProject::Detailed { .. }));
    }

    #[test]
    fn status_names_round_trip() {
        assert_eq!(
            "DETAILED_ROADMAP_COMPLETED".parse::<RoadmapStatus>().unwrap(),
            RoadmapStatus::DetailedRoadmapCompleted
        );
        assert!("DONE".parse::<RoadmapStatus>().is_err());
    }
}
