//! Instructions sent to the generation backend
//!
//! Each builder embeds the exact JSON layout the matching wire type in
//! [`crate::pipeline::wire`] or [`crate::assessment::wire`] decodes.

use std::fmt::Write;
use waypoint_model::{AssessmentQuestion, CareerPath, CareerQuestion, Profile, QuestionAnswer};

/// System prompt shared by every call
pub const SYSTEM: &str = "You are a career coach. You always answer with a single JSON document and nothing else.";

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "none given".to_string()
    } else {
        items.join(", ")
    }
}

/// Profile summary embedded in prompts
#[must_use]
pub fn profile_context(profile: &Profile) -> String {
    format!(
        "Career goal: {}\nCurrent role: {}\nExperience: {}\nSkills: {}\nEducation: {}\nInterests: {}",
        profile.career_goal,
        profile.current_role,
        profile.experience,
        list(&profile.skills),
        profile.education,
        list(&profile.interests),
    )
}

/// Discovery questions
#[must_use]
pub fn career_questions(profile: &Profile, count: usize) -> String {
    format!(
        "{context}\n\nWrite exactly {count} short discovery questions that help choose a career path \
towards the goal above. Each question must be answerable with Yes, No, Agree, Disagree or Not Sure.\n\
Return JSON in this format:\n\
{{\"questions\": [{{\"id\": \"q1\", \"text\": \"...\"}}]}}",
        context = profile_context(profile),
    )
}

/// Career-path recommendations from answered questions
#[must_use]
pub fn career_paths(
    profile: &Profile,
    questions: &[CareerQuestion],
    answers: &[QuestionAnswer],
    count: usize,
) -> String {
    let mut qa = String::new();
    for question in questions {
        let answer = answers
            .iter()
            .find(|a| a.question_id == question.id)
            .map_or("Not answered", |a| a.answer.as_str());
        let _ = writeln!(qa, "- {} -> {}", question.text, answer);
    }
    format!(
        "{context}\n\nAnswers to discovery questions:\n{qa}\n\
Recommend exactly {count} career paths. Return JSON in this format:\n\
{{\"careerPaths\": [{{\"title\": \"...\", \"description\": \"...\", \"timeToAchieve\": \"...\", \
\"averageSalary\": \"...\", \"keySkillsRequired\": [\"...\"], \"learningRoadmap\": [\"...\"], \
\"aiRecommendation\": {{\"reason\": \"...\"}}}}]}}",
        context = profile_context(profile),
    )
}

/// High-level phased plan for the selected path
#[must_use]
pub fn high_level_plan(profile: &Profile, path: &CareerPath, allowed_domains: &[String]) -> String {
    format!(
        "{context}\n\nSelected career path: {title}\n{description}\nKey skills: {skills}\n\n\
Create a learning roadmap with the phases Beginner, Intermediate, Advanced and Capstone Projects. \
For each phase give a duration, 3 to 6 topics, 2 or 3 resources and the expected outcomes. \
Resources must be specific pages (never a homepage) on one of: {domains}.\n\
Return JSON in this format:\n\
{{\"careerTitle\": \"{title}\", \"highLevelRoadmap\": [{{\"phase\": \"Beginner\", \"duration\": \"...\", \
\"topics\": [\"...\"], \"resources\": [{{\"title\": \"...\", \"url\": \"https://...\"}}], \
\"outcomes\": [\"...\"]}}], \"capstoneProjects\": [\"...\"]}}",
        context = profile_context(profile),
        title = path.title,
        description = path.description,
        skills = list(&path.key_skills_required),
        domains = allowed_domains.join(", "),
    )
}

/// Subtopic expansion for every topic of the high-level plan
#[must_use]
pub fn subtopics(career_title: &str, phases: &[(String, Vec<String>)]) -> String {
    let mut outline = String::new();
    for (phase, topics) in phases {
        let _ = writeln!(outline, "{phase}: {}", topics.join("; "));
    }
    format!(
        "Career path: {career_title}\nRoadmap topics by phase:\n{outline}\n\
For every topic above list 4 to 5 specific subtopics. Keep phase and topic names exactly as given.\n\
Return JSON in this format:\n\
{{\"subtopicsBreakdown\": [{{\"phase\": \"...\", \"topics\": [{{\"topic\": \"...\", \"subtopics\": [\"...\"]}}]}}]}}"
    )
}

/// Topic quiz questions
#[must_use]
pub fn assessment_questions(topic: &str, context: &str, count: usize) -> String {
    format!(
        "Learner context:\n{context}\n\nWrite exactly {count} assessment questions on \"{topic}\". \
About 70% must be medium and 30% hard. Include exactly one theory question and one scenario question; \
the rest are multiple choice with options A to D and one correct answer.\n\
Return a JSON array in this format:\n\
[{{\"question\": \"...\", \"kind\": \"multiple_choice\", \"difficulty\": \"medium\", \
\"options\": [\"A. ...\", \"B. ...\", \"C. ...\", \"D. ...\"], \"correct_answer\": \"A\"}}, \
{{\"question\": \"...\", \"kind\": \"theory\", \"difficulty\": \"hard\"}}]"
    )
}

/// Evaluation of a submitted answer set
#[must_use]
pub fn evaluation(topic: &str, questions: &[AssessmentQuestion], answers: &[Option<String>]) -> String {
    let mut transcript = String::new();
    for (index, question) in questions.iter().enumerate() {
        let answer = answers
            .get(index)
            .and_then(Option::as_deref)
            .unwrap_or("(no answer)");
        let _ = writeln!(transcript, "Q{}: {}\nAnswer: {}", index + 1, question.question, answer);
        if let Some(expected) = &question.correct_answer {
            let _ = writeln!(transcript, "Expected: {expected}");
        }
    }
    format!(
        "Evaluate this assessment on \"{topic}\".\n{transcript}\n\
Return JSON in this format:\n\
{{\"Skill\": \"{topic}\", \"Total_Questions\": {total}, \"Correct_Answers\": 0, \"Intermediate_score\": 0, \
\"Advanced_score\": 0, \"theory_question_score\": 0, \"Overall\": \"0%\", \"Summary\": [\"...\"], \
\"skill_gaps\": [\"...\"], \"strengths\": [\"...\"], \"recommendations\": [\"...\"]}}",
        total = questions.len(),
    )
}
