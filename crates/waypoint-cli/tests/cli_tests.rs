//! Simulated journey end to end

use pretty_assertions::assert_eq;
use std::io::Write;
use waypoint_cli::{run_simulation, SimulationOptions};
use waypoint_core::WaypointConfig;
use waypoint_model::JourneyStage;

#[tokio::test]
async fn simulation_walks_the_whole_pipeline() {
    let report = run_simulation(SimulationOptions::default()).await.unwrap();

    assert_eq!(report.career_path, "Analytics Engineer");
    assert_eq!(report.assessed_topic, "Python Basics");
    assert!((report.score - 60.0).abs() < f64::EPSILON);
    assert!(report.passed);
    assert_eq!(report.generation_calls, 6);
    assert_eq!(report.progress.total, 3);
    assert_eq!(report.progress.completed, 1);
    assert_eq!(
        report.stages,
        vec![
            JourneyStage::Authenticated,
            JourneyStage::BasicRegistered,
            JourneyStage::ProfileCompleted,
            JourneyStage::CareerPathsGenerated,
            JourneyStage::CareerPathSelected,
            JourneyStage::RoadmapGenerated,
            JourneyStage::RoadmapActive,
        ]
    );
    assert!((report.journey_progress - 87.5).abs() < f64::EPSILON);
    assert!(report.to_text().contains("AUTHENTICATED -> BASIC_REGISTERED"));
}

#[tokio::test]
async fn simulation_follows_configured_counts() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "career_question_count = 3\ncareer_path_count = 2\nassessment_question_count = 4").unwrap();
    let config = WaypointConfig::load(file.path()).unwrap();

    let report = run_simulation(SimulationOptions {
        config,
        ..SimulationOptions::default()
    })
    .await
    .unwrap();

    assert_eq!(report.generation_calls, 6);
    assert_eq!(report.progress.total, 3);
}

#[tokio::test]
async fn empty_goal_fails_the_simulation() {
    let err = run_simulation(SimulationOptions {
        goal: String::new(),
        ..SimulationOptions::default()
    })
    .await
    .unwrap_err();

    assert!(format!("{err:#}").contains("career goal is required"));
}
