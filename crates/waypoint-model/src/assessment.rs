//! Topic assessments

use crate::error::ModelError;
use crate::ids::{AssessmentId, RoadmapId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Assessment lifecycle
///
/// `Created -> InProgress -> Completed`; `Expired` and `Abandoned` are
/// terminal states set from outside. Nothing leaves `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Shell created, nothing answered
    Created,
    /// At least one answer recorded
    InProgress,
    /// Evaluated
    Completed,
    /// Timed out
    Expired,
    /// Given up
    Abandoned,
}

impl AssessmentStatus {
    /// States reachable from `self`
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [AssessmentStatus] {
        use AssessmentStatus::{Abandoned, Completed, Created, Expired, InProgress};
        match self {
            Created => &[InProgress, Expired, Abandoned],
            InProgress => &[Completed, Expired, Abandoned],
            Completed | Expired | Abandoned => &[],
        }
    }

    /// Whether `self -> to` is legal
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, to: AssessmentStatus) -> bool {
        (self == to && self == AssessmentStatus::InProgress)
            || self.allowed_transitions().contains(&to)
    }

    /// Whether no further changes are accepted
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// Question format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Options A-D with a single correct answer
    #[serde(alias = "mcq", alias = "MCQ", alias = "multiple-choice")]
    MultipleChoice,
    /// Open-ended conceptual question
    #[serde(alias = "Theory", alias = "theoretical")]
    Theory,
    /// Applied, situation-based question
    #[serde(alias = "Scenario", alias = "scenario-based")]
    Scenario,
}

/// Question difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Medium difficulty
    #[serde(alias = "Medium")]
    Medium,
    /// Hard difficulty
    #[serde(alias = "Hard")]
    Hard,
}

/// One generated assessment question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    /// Question text
    pub question: String,
    /// Format
    #[serde(alias = "type")]
    pub kind: QuestionKind,
    /// Difficulty
    pub difficulty: Difficulty,
    /// Answer options, empty for open questions
    #[serde(default)]
    pub options: Vec<String>,
    /// Expected answer for multiple choice questions
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// Qualitative scoring returned by the evaluator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    /// Score on medium questions
    pub intermediate_score: f64,
    /// Score on hard questions
    pub advanced_score: f64,
    /// Score on the theory question
    pub theory_score: f64,
    /// Overall percentage as reported ("72%")
    pub overall: String,
    /// Narrative summary
    pub summary: Vec<String>,
}

/// Scored quiz bound to one topic of one roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Identifier
    pub id: AssessmentId,
    /// Owner
    pub email: String,
    /// Roadmap the topic belongs to
    pub roadmap_id: RoadmapId,
    /// Topic name, unique within the roadmap
    pub topic: String,
    /// Skill being assessed
    pub skill_name: String,
    /// First plan phase the topic appears in
    pub phase: String,
    /// 1-based position in topic first-appearance order
    pub order: u32,
    /// Lifecycle status
    pub status: AssessmentStatus,
    /// Generated questions
    #[serde(default)]
    pub questions: Vec<AssessmentQuestion>,
    /// Answers by question index
    #[serde(default)]
    pub user_answers: Vec<Option<String>>,
    /// Count of non-empty answers
    #[serde(default)]
    pub questions_answered: u32,
    /// Next question to show
    #[serde(default)]
    pub current_question: u32,
    /// Questions scored
    #[serde(default)]
    pub total_questions: u32,
    /// Correct answers
    #[serde(default)]
    pub correct_answers: u32,
    /// Percentage score, set on evaluation
    #[serde(default)]
    pub percentage_score: Option<f64>,
    /// Pass flag, set on evaluation
    #[serde(default)]
    pub is_passed: Option<bool>,
    /// Evaluator breakdown
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
    /// Identified gaps
    #[serde(default)]
    pub skill_gaps: Vec<String>,
    /// Identified strengths
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Suggested follow-ups
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
    /// First answer time
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Evaluation time
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Store revision stamp
    #[serde(skip)]
    pub revision: u64,
}

impl Assessment {
    /// Empty shell for `topic`
    #[must_use]
    pub fn shell(
        email: impl Into<String>,
        roadmap_id: RoadmapId,
        topic: impl Into<String>,
        phase: impl Into<String>,
        order: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let topic = topic.into();
        Self {
            id: AssessmentId::new(),
            email: email.into(),
            roadmap_id,
            skill_name: topic.clone(),
            topic,
            phase: phase.into(),
            order,
            status: AssessmentStatus::Created,
            questions: Vec::new(),
            user_answers: Vec::new(),
            questions_answered: 0,
            current_question: 0,
            total_questions: 0,
            correct_answers: 0,
            percentage_score: None,
            is_passed: None,
            evaluation: None,
            skill_gaps: Vec::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            revision: 0,
        }
    }

    /// Move to `to` if the lifecycle allows it
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidRecord`] for an illegal transition.
    pub fn transition(&mut self, to: AssessmentStatus, now: DateTime<Utc>) -> Result<(), ModelError> {
        if !self.status.can_transition_to(to) {
            return Err(ModelError::InvalidRecord(format!(
                "assessment {} cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        if to == AssessmentStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if to == AssessmentStatus::Completed {
            self.completed_at = Some(now);
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Sort key unique per (roadmap, topic)
    #[must_use]
    pub fn sort_key(roadmap_id: RoadmapId, topic: &str) -> String {
        format!("{roadmap_id}#{topic}")
    }
}
