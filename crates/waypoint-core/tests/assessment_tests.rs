//! Assessments, scoring and progress sync

use pretty_assertions::assert_eq;
use waypoint_core::repo::tables;
use waypoint_core::WaypointError;
use waypoint_model::{AssessmentStatus, JourneyStage, RoadmapId};
use waypoint_test_utils::*;

async fn planned(h: &Harness) -> RoadmapId {
    let profile = h.seed_profile().await.unwrap();
    h.reply(&career_questions_json(5));
    h.reply(&career_paths_json());
    h.reply(&plan_json(PRIMARY_PATH));
    h.reply(&subtopics_json());
    let id = h.ctx.pipeline.generate_questions(&profile).await.unwrap().roadmap_id;
    h.ctx.pipeline.submit_answers(EMAIL, id, answers_for(5)).await.unwrap();
    h.ctx
        .pipeline
        .select_path(EMAIL, id, career_path(PRIMARY_PATH))
        .await
        .unwrap();
    id
}

fn answers(n: usize) -> Vec<String> {
    (0..n).map(|_| "A".to_string()).collect()
}

#[tokio::test]
async fn shell_creation_is_idempotent() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;

    let first = h.ctx.assessments.create_shell(EMAIL, roadmap_id, "Python Basics").await.unwrap();
    let again = h.ctx.assessments.create_shell(EMAIL, roadmap_id, "Python Basics").await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.order, 1);

    let extra = h.ctx.assessments.create_shell(EMAIL, roadmap_id, "Spark").await.unwrap();
    assert_eq!(extra.phase, "General");
    assert_eq!(extra.order, 4);
}

#[tokio::test]
async fn topic_assessment_generates_questions_once() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));

    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();
    let calls = h.backend.call_count();
    let b = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();

    assert_eq!(a.questions.len(), 5);
    assert_eq!(a.total_questions, 5);
    assert_eq!(a.status, AssessmentStatus::Created);
    assert_eq!(a.questions, b.questions);
    assert_eq!(h.backend.call_count(), calls);

    let prompt = &h.backend.requests()[4].instruction;
    assert!(prompt.contains("Syntax, Functions"));
    assert!(prompt.contains("Data Engineer"));
}

#[tokio::test]
async fn short_quiz_is_accepted() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(3));

    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "SQL Fundamentals")
        .await
        .unwrap();

    assert_eq!(a.questions.len(), 3);
    assert_eq!(a.user_answers, vec![None, None, None]);
}

#[tokio::test]
async fn unknown_topic_is_not_found() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;

    let err = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Cobol")
        .await
        .unwrap_err();

    assert!(matches!(err, WaypointError::NotFound { kind: "topic", .. }));
}

#[tokio::test]
async fn answering_starts_the_assessment() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();

    let a = h.ctx.assessments.submit_answer(EMAIL, a.id, 2, "B").await.unwrap();
    assert_eq!(a.status, AssessmentStatus::InProgress);
    assert!(a.started_at.is_some());
    assert_eq!(a.questions_answered, 1);
    assert_eq!(a.current_question, 3);
    assert_eq!(a.user_answers[2].as_deref(), Some("B"));

    let a = h.ctx.assessments.submit_answer(EMAIL, a.id, 2, "C").await.unwrap();
    assert_eq!(a.questions_answered, 1);
    assert_eq!(a.user_answers[2].as_deref(), Some("C"));

    let err = h.ctx.assessments.submit_answer(EMAIL, a.id, 5, "A").await.unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[tokio::test]
async fn three_of_five_passes_and_syncs_the_plan() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    h.reply(&evaluation_json(3, 5, "60%"));
    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();

    let done = h.ctx.assessments.evaluate(EMAIL, a.id, &answers(5)).await.unwrap();

    assert_eq!(done.status, AssessmentStatus::Completed);
    assert_eq!(done.percentage_score, Some(60.0));
    assert_eq!(done.is_passed, Some(true));
    assert_eq!(done.correct_answers, 3);
    assert_eq!(done.questions_answered, 5);
    assert!(done.completed_at.is_some());
    assert_eq!(done.skill_gaps, vec!["error handling".to_string()]);
    assert_eq!(done.evaluation.as_ref().map(|e| e.overall.as_str()), Some("60%"));

    let plan = h
        .ctx
        .pipeline
        .roadmap(EMAIL, roadmap_id)
        .await
        .unwrap()
        .detailed_roadmap
        .unwrap();
    let synced: Vec<_> = plan
        .high_level_roadmap
        .iter()
        .flat_map(|phase| &phase.topics)
        .filter(|t| t.topic == "Python Basics")
        .collect();
    assert_eq!(synced.len(), 2);
    for topic in synced {
        assert!(topic.is_completed);
        assert_eq!(topic.correct_answers, 3);
        assert_eq!(topic.total_questions, 5);
        assert!((topic.score - 60.0).abs() < f64::EPSILON);
    }

    assert_eq!(
        h.ctx.stages.get_stage(EMAIL).await.unwrap(),
        Some(JourneyStage::RoadmapActive)
    );
}

#[tokio::test]
async fn saved_evaluation_survives_a_failed_plan_sync() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    h.reply(&evaluation_json(3, 5, "60%"));
    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();

    h.faults.fail_writes(tables::ROADMAPS);
    let done = h.ctx.assessments.evaluate(EMAIL, a.id, &answers(5)).await.unwrap();
    assert_eq!(done.status, AssessmentStatus::Completed);
    assert_eq!(done.percentage_score, Some(60.0));

    let topic = h
        .ctx
        .progress
        .topic_progress(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();
    assert!(!topic.plan_topic.is_completed);
    assert_eq!(topic.assessment.status, AssessmentStatus::Completed);

    h.faults.heal();
    let calls = h.backend.call_count();
    h.ctx.assessments.evaluate(EMAIL, a.id, &[]).await.unwrap();
    assert_eq!(h.backend.call_count(), calls);

    let topic = h
        .ctx
        .progress
        .topic_progress(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();
    assert!(topic.plan_topic.is_completed);
    assert!((topic.plan_topic.score - 60.0).abs() < f64::EPSILON);
    assert_eq!(
        h.ctx.stages.get_stage(EMAIL).await.unwrap(),
        Some(JourneyStage::RoadmapActive)
    );
}

#[tokio::test]
async fn unreadable_evaluation_scores_zero() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    h.reply_text(r#"{"Overall": "excellent", "Correct_Answers": "lots"}"#);
    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "SQL Fundamentals")
        .await
        .unwrap();

    let done = h.ctx.assessments.evaluate(EMAIL, a.id, &answers(2)).await.unwrap();

    assert_eq!(done.percentage_score, Some(0.0));
    assert_eq!(done.is_passed, Some(false));
    assert_eq!(done.status, AssessmentStatus::Completed);
}

#[tokio::test]
async fn evaluation_needs_an_answer() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();
    let calls = h.backend.call_count();

    let err = h.ctx.assessments.evaluate(EMAIL, a.id, &[]).await.unwrap_err();

    assert!(matches!(err, WaypointError::Validation(_)));
    assert_eq!(h.backend.call_count(), calls);
    let stored = h.ctx.assessments.find(EMAIL, a.id).await.unwrap();
    assert_eq!(stored.status, AssessmentStatus::Created);
}

#[tokio::test]
async fn completed_assessment_is_not_rescored() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    h.reply(&evaluation_json(4, 5, "80%"));
    let a = h
        .ctx
        .assessments
        .generate_topic_assessment(EMAIL, roadmap_id, "Python Basics")
        .await
        .unwrap();
    let first = h.ctx.assessments.evaluate(EMAIL, a.id, &answers(5)).await.unwrap();
    let calls = h.backend.call_count();

    let second = h.ctx.assessments.evaluate(EMAIL, a.id, &[]).await.unwrap();

    assert_eq!(second.percentage_score, first.percentage_score);
    assert_eq!(h.backend.call_count(), calls);
    let err = h.ctx.assessments.submit_answer(EMAIL, a.id, 0, "B").await.unwrap_err();
    assert!(matches!(err, WaypointError::Validation(_)));
}

#[tokio::test]
async fn expired_assessments_are_closed() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    let shell = h.ctx.assessments.create_shell(EMAIL, roadmap_id, "Data Modeling").await.unwrap();

    let expired = h.ctx.assessments.expire(EMAIL, shell.id).await.unwrap();
    assert_eq!(expired.status, AssessmentStatus::Expired);

    assert!(h.ctx.assessments.abandon(EMAIL, shell.id).await.is_err());
    assert!(h.ctx.assessments.evaluate(EMAIL, shell.id, &answers(1)).await.is_err());
}

#[tokio::test]
async fn progress_counts_completed_and_passed() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    h.reply(&assessment_questions_json(5));
    h.reply(&evaluation_json(3, 5, "60%"));
    h.reply(&assessment_questions_json(5));
    h.reply(&evaluation_json(2, 5, "40%"));
    for topic in ["Python Basics", "SQL Fundamentals"] {
        let a = h
            .ctx
            .assessments
            .generate_topic_assessment(EMAIL, roadmap_id, topic)
            .await
            .unwrap();
        h.ctx.assessments.evaluate(EMAIL, a.id, &answers(5)).await.unwrap();
    }

    let progress = h.ctx.progress.roadmap_progress(EMAIL, roadmap_id).await.unwrap();
    assert_eq!(progress.total, 3);
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.passed, 1);
    assert!((progress.completion_rate - 66.67).abs() < 1e-9);
    assert!((progress.pass_rate - 33.33).abs() < 1e-9);
    assert!((progress.average_score - 50.0).abs() < 1e-9);
    assert_eq!(progress.topics[2].percentage_score, None);

    let topic = h
        .ctx
        .progress
        .topic_progress(EMAIL, roadmap_id, "SQL Fundamentals")
        .await
        .unwrap();
    assert_eq!(topic.phase, "Beginner");
    assert_eq!(topic.phase_duration, "2 months");
    assert!(topic.plan_topic.is_completed);
    assert_eq!(topic.assessment.is_passed, Some(false));
}

#[tokio::test]
async fn assessing_every_topic_completes_the_journey() {
    let h = Harness::new();
    let roadmap_id = planned(&h).await;
    for topic in ["Python Basics", "SQL Fundamentals", "Data Modeling"] {
        h.reply(&assessment_questions_json(5));
        h.reply(&evaluation_json(5, 5, "100%"));
        let a = h
            .ctx
            .assessments
            .generate_topic_assessment(EMAIL, roadmap_id, topic)
            .await
            .unwrap();
        h.ctx.assessments.evaluate(EMAIL, a.id, &answers(5)).await.unwrap();
    }

    let journey = h.ctx.stages.journey(EMAIL).await.unwrap().unwrap();
    assert_eq!(journey.current_stage, JourneyStage::JourneyCompleted);
    assert!(journey.completed_at.is_some());
    assert!((journey.progress_percentage - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn progress_needs_a_detailed_plan() {
    let h = Harness::new();
    let profile = h.seed_profile().await.unwrap();
    h.reply(&career_questions_json(5));
    let id = h.ctx.pipeline.generate_questions(&profile).await.unwrap().roadmap_id;

    let err = h.ctx.progress.roadmap_progress(EMAIL, id).await.unwrap_err();
    assert!(matches!(err, WaypointError::Validation(_)));
}
