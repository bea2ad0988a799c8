//! Profile versioning and the career-change cascade

use pretty_assertions::assert_eq;
use waypoint_model::{JourneyStage, ProfileChanges};
use waypoint_test_utils::*;

async fn with_plan(h: &Harness) {
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
}

#[tokio::test]
async fn first_profile_advances_the_journey() {
    let h = Harness::new();
    let profile = h.seed_profile().await.unwrap();

    assert_eq!(profile.version, 1);
    assert!(profile.is_current);
    assert_eq!(
        h.ctx.stages.get_stage(EMAIL).await.unwrap(),
        Some(JourneyStage::ProfileCompleted)
    );
}

#[tokio::test]
async fn profile_without_goal_stops_at_basic_registration() {
    let h = Harness::new();
    let changes = ProfileChanges {
        name: Some("Ada".into()),
        ..ProfileChanges::default()
    };

    h.ctx.profiles.update(EMAIL, &changes).await.unwrap();

    assert_eq!(
        h.ctx.stages.get_stage(EMAIL).await.unwrap(),
        Some(JourneyStage::BasicRegistered)
    );
}

#[tokio::test]
async fn updates_keep_exactly_one_current_version() {
    let h = Harness::new();
    h.seed_profile().await.unwrap();
    let rename = ProfileChanges {
        name: Some("Ada L.".into()),
        ..ProfileChanges::default()
    };

    let update = h.ctx.profiles.update(EMAIL, &rename).await.unwrap();

    assert_eq!(update.profile.version, 2);
    assert_eq!(update.profile.name, "Ada L.");
    assert_eq!(update.cascade, None);
    let history = h.ctx.profiles.history(EMAIL).await.unwrap();
    assert_eq!(history.iter().map(|p| p.version).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(history.iter().filter(|p| p.is_current).count(), 1);
    assert_eq!(h.ctx.profiles.current(EMAIL).await.unwrap().map(|p| p.version), Some(2));
}

#[tokio::test]
async fn cosmetic_change_keeps_roadmaps() {
    let h = Harness::new();
    with_plan(&h).await;
    let rename = ProfileChanges {
        name: Some("Ada L.".into()),
        ..ProfileChanges::default()
    };

    h.ctx.profiles.update(EMAIL, &rename).await.unwrap();

    assert_eq!(h.ctx.pipeline.list_roadmaps(EMAIL).await.unwrap().len(), 1);
}

#[tokio::test]
async fn career_change_deletes_roadmaps_and_assessments() {
    let h = Harness::new();
    with_plan(&h).await;
    let roadmap_id = h.ctx.pipeline.latest_roadmap(EMAIL).await.unwrap().unwrap().id;
    let stage_before = h.ctx.stages.get_stage(EMAIL).await.unwrap();
    let change = ProfileChanges {
        career_goal: Some("Product Manager".into()),
        ..ProfileChanges::default()
    };

    let update = h.ctx.profiles.update(EMAIL, &change).await.unwrap();

    let cascade = update.cascade.unwrap();
    assert_eq!(cascade.roadmaps, 1);
    assert_eq!(cascade.assessments, 3);
    assert!(h.ctx.pipeline.list_roadmaps(EMAIL).await.unwrap().is_empty());
    assert!(h
        .ctx
        .assessments
        .list_for_roadmap(EMAIL, roadmap_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(h.ctx.stages.get_stage(EMAIL).await.unwrap(), stage_before);
}

#[tokio::test]
async fn same_value_is_not_a_career_change() {
    let h = Harness::new();
    with_plan(&h).await;
    let same = ProfileChanges {
        career_goal: Some(GOAL.into()),
        ..ProfileChanges::default()
    };

    let update = h.ctx.profiles.update(EMAIL, &same).await.unwrap();

    assert_eq!(update.cascade, None);
    assert_eq!(h.ctx.pipeline.list_roadmaps(EMAIL).await.unwrap().len(), 1);
}
