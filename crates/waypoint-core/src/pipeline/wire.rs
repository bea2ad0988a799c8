//! Generator response layouts for the roadmap pipeline
//!
//! These mirror what the prompts ask for and stay lenient where generators
//! are known to vary (bare strings vs objects for topics and resources).

use serde::Deserialize;
use waypoint_model::{CapstoneProject, CareerPath, CareerQuestion};

/// `{"questions": [...]}`
#[derive(Debug, Deserialize)]
pub struct QuestionsResponse {
    /// Discovery questions
    pub questions: Vec<CareerQuestion>,
}

/// `{"careerPaths": [...]}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPathsResponse {
    /// Recommended paths
    pub career_paths: Vec<CareerPath>,
}

/// Topic given either as a name or as an object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTopic {
    /// Bare name
    Name(String),
    /// Object form
    Object {
        /// Topic name
        #[serde(alias = "name", alias = "title")]
        topic: String,
    },
}

impl WireTopic {
    /// Topic name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { topic: name } => name.trim(),
        }
    }
}

/// Resource given either as a URL or as an object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireResource {
    /// Bare URL
    Url(String),
    /// Object form
    Link {
        /// Display title
        #[serde(default, alias = "name")]
        title: String,
        /// Target URL
        #[serde(alias = "link")]
        url: String,
    },
}

/// One phase of the high-level plan
#[derive(Debug, Clone, Deserialize)]
pub struct WirePhase {
    /// Phase name
    pub phase: String,
    /// Expected duration
    #[serde(default)]
    pub duration: String,
    /// Topics
    #[serde(default)]
    pub topics: Vec<WireTopic>,
    /// Resource links
    #[serde(default)]
    pub resources: Vec<WireResource>,
    /// Learning outcomes
    #[serde(default)]
    pub outcomes: Vec<String>,
}

/// High-level plan call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighLevelPlanResponse {
    /// Career the plan targets
    #[serde(default)]
    pub career_title: String,
    /// Phases in order
    pub high_level_roadmap: Vec<WirePhase>,
    /// Capstone projects
    #[serde(default)]
    pub capstone_projects: Vec<CapstoneProject>,
}

impl HighLevelPlanResponse {
    /// Reject plans without phases or with a phase lacking topics
    ///
    /// # Errors
    ///
    /// Description of the first problem.
    pub fn check(&self) -> Result<(), String> {
        if self.high_level_roadmap.is_empty() {
            return Err("plan has no phases".into());
        }
        for phase in &self.high_level_roadmap {
            if phase.phase.trim().is_empty() {
                return Err("plan phase without a name".into());
            }
            if phase.topics.iter().all(|t| t.name().is_empty()) {
                return Err(format!("phase {} has no topics", phase.phase));
            }
        }
        Ok(())
    }

    /// `(phase, topic names)` outline fed to the subtopic call
    #[must_use]
    pub fn outline(&self) -> Vec<(String, Vec<String>)> {
        self.high_level_roadmap
            .iter()
            .map(|phase| {
                let topics = phase
                    .topics
                    .iter()
                    .map(WireTopic::name)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect();
                (phase.phase.clone(), topics)
            })
            .collect()
    }
}

/// Subtopics of one topic
#[derive(Debug, Clone, Deserialize)]
pub struct WireTopicSubtopics {
    /// Topic name as given in the outline
    #[serde(alias = "name")]
    pub topic: String,
    /// Subtopics
    #[serde(default)]
    pub subtopics: Vec<String>,
}

/// Subtopics grouped by phase
#[derive(Debug, Clone, Deserialize)]
pub struct WireSubtopicPhase {
    /// Phase name as given in the outline
    pub phase: String,
    /// Topics in the phase
    #[serde(default)]
    pub topics: Vec<WireTopicSubtopics>,
}

/// Subtopic expansion call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtopicsResponse {
    /// Breakdown by phase
    pub subtopics_breakdown: Vec<WireSubtopicPhase>,
}
