//! Shapes the evaluator and question generator answer with
//!
//! Evaluator output is loose: counts arrive as numbers or strings, scores as
//! `"72%"`, summaries as a string or a list. Unreadable numbers become 0.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use waypoint_model::{AssessmentQuestion, Evaluation};

/// Generated quiz, bare or wrapped in `{"questions": [...]}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuestionsPayload {
    /// `[...]`
    List(Vec<AssessmentQuestion>),
    /// `{"questions": [...]}`
    Wrapped {
        /// Questions
        questions: Vec<AssessmentQuestion>,
    },
}

impl QuestionsPayload {
    /// Borrow the questions
    #[must_use]
    pub fn questions(&self) -> &[AssessmentQuestion] {
        match self {
            Self::List(questions) | Self::Wrapped { questions } => questions,
        }
    }

    /// Take the questions
    #[must_use]
    pub fn into_questions(self) -> Vec<AssessmentQuestion> {
        match self {
            Self::List(questions) | Self::Wrapped { questions } => questions,
        }
    }

    /// Hard checks; a count mismatch is only logged by the caller
    pub(crate) fn check(&self) -> Result<(), String> {
        let questions = self.questions();
        if questions.is_empty() {
            return Err("no assessment questions".into());
        }
        for (index, question) in questions.iter().enumerate() {
            if question.question.trim().is_empty() {
                return Err(format!("question {} has no text", index + 1));
            }
        }
        Ok(())
    }
}

/// Evaluator output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationResponse {
    /// Questions the evaluator scored
    #[serde(rename = "Total_Questions", alias = "total_questions", default, deserialize_with = "lenient_count")]
    pub total_questions: Option<u32>,
    /// Questions judged correct
    #[serde(rename = "Correct_Answers", alias = "correct_answers", default, deserialize_with = "lenient_count")]
    pub correct_answers: Option<u32>,
    /// Score on medium questions
    #[serde(
        rename = "Intermediate_score",
        alias = "Intermidiate_score",
        alias = "intermediate_score",
        default,
        deserialize_with = "lenient_score"
    )]
    pub intermediate_score: f64,
    /// Score on hard questions
    #[serde(rename = "Advanced_score", alias = "advanced_score", default, deserialize_with = "lenient_score")]
    pub advanced_score: f64,
    /// Score on the theory question
    #[serde(
        rename = "theory_question_score",
        alias = "theory_score",
        default,
        deserialize_with = "lenient_score"
    )]
    pub theory_score: f64,
    /// Overall percentage, usually `"72%"`
    #[serde(rename = "Overall", alias = "overall", default, deserialize_with = "lenient_text")]
    pub overall: String,
    /// Narrative
    #[serde(rename = "Summary", alias = "summary", default, deserialize_with = "lenient_list")]
    pub summary: Vec<String>,
    /// Gaps found
    #[serde(default, deserialize_with = "lenient_list")]
    pub skill_gaps: Vec<String>,
    /// Strengths found
    #[serde(default, deserialize_with = "lenient_list")]
    pub strengths: Vec<String>,
    /// Suggested next steps
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
}

/// Numbers derived from an evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Correct answers, never above `total`
    pub correct: u32,
    /// Questions scored
    pub total: u32,
    /// Percentage in `0..=100`
    pub percentage: f64,
}

impl EvaluationResponse {
    /// Score against a quiz of `question_count` questions
    ///
    /// The percentage comes from `overall` when readable, else from the
    /// counts, else 0.
    #[must_use]
    pub fn score(&self, question_count: u32) -> Score {
        let total = self.total_questions.filter(|t| *t > 0).unwrap_or(question_count);
        let correct = self.correct_answers.unwrap_or(0).min(total);
        let percentage = parse_percentage(&self.overall)
            .or_else(|| (total > 0).then(|| f64::from(correct) / f64::from(total) * 100.0))
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        Score {
            correct,
            total,
            percentage: waypoint_model::round2(percentage),
        }
    }

    /// Qualitative part stored on the assessment
    #[must_use]
    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            intermediate_score: self.intermediate_score,
            advanced_score: self.advanced_score,
            theory_score: self.theory_score,
            overall: self.overall.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Read `"72%"`, `"72 %"` or `"72.5"`
#[must_use]
pub fn parse_percentage(text: &str) -> Option<f64> {
    let number = text.trim().trim_end_matches('%').trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_percentage(s),
        _ => None,
    }
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number_from(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(number_from(&Value::deserialize(deserializer)?)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v.round() as u32))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => format!("{n}%"),
        _ => String::new(),
    })
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn response(value: Value) -> EvaluationResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn percentage_forms() {
        assert_eq!(parse_percentage("72%"), Some(72.0));
        assert_eq!(parse_percentage(" 72.5 % "), Some(72.5));
        assert_eq!(parse_percentage("seventy"), None);
        assert_eq!(parse_percentage(""), None);
    }

    #[test]
    fn three_of_five_scores_sixty() {
        let r = response(json!({"Total_Questions": 5, "Correct_Answers": 3, "Overall": "60%"}));
        let score = r.score(5);
        assert_eq!(score.correct, 3);
        assert_eq!(score.total, 5);
        assert!((score.percentage - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unreadable_overall_falls_back_to_counts() {
        let r = response(json!({"Total_Questions": "5", "Correct_Answers": "4", "Overall": "n/a"}));
        assert!((r.score(5).percentage - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_readable_scores_zero() {
        let r = response(json!({"Overall": {"nested": true}, "Correct_Answers": "many"}));
        let score = r.score(0);
        assert_eq!(score.correct, 0);
        assert!(score.percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn misspelled_and_loose_fields_are_accepted() {
        let r = response(json!({
            "Intermidiate_score": "40%",
            "Advanced_score": 20,
            "theory_question_score": null,
            "Overall": 55,
            "Summary": "solid basics",
            "skill_gaps": ["joins", null],
        }));
        assert!((r.intermediate_score - 40.0).abs() < f64::EPSILON);
        assert!((r.advanced_score - 20.0).abs() < f64::EPSILON);
        assert!(r.theory_score.abs() < f64::EPSILON);
        assert_eq!(r.overall, "55%");
        assert_eq!(r.summary, vec!["solid basics".to_string()]);
        assert_eq!(r.skill_gaps, vec!["joins".to_string()]);
    }

    #[test]
    fn correct_is_capped_at_total() {
        let r = response(json!({"Total_Questions": 5, "Correct_Answers": 9}));
        let score = r.score(5);
        assert_eq!(score.correct, 5);
        assert!((score.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wrapped_questions_are_accepted() {
        let payload: QuestionsPayload = serde_json::from_value(json!({"questions": [
            {"question": "What is a list?", "type": "theory", "difficulty": "medium"}
        ]}))
        .unwrap();
        assert!(payload.check().is_ok());
        assert_eq!(payload.into_questions().len(), 1);
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let payload: QuestionsPayload = serde_json::from_value(json!([])).unwrap();
        assert!(payload.check().is_err());
    }
}
