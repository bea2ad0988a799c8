//! Stage table

use serde::Serialize;
use std::fmt::Write;
use waypoint_core::{allowed_transitions, StageMachine};
use waypoint_model::JourneyStage;

/// One line of the stage table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRow {
    /// Stage name
    pub stage: &'static str,
    /// Position in the journey (paused sits outside the ordering)
    pub order: u8,
    /// Human-readable description
    pub description: &'static str,
    /// Stages reachable in one step
    pub next: Vec<&'static str>,
}

/// Every stage with its order, description and successors
#[must_use]
pub fn stage_table() -> Vec<StageRow> {
    JourneyStage::ALL
        .into_iter()
        .map(|stage| {
            let info = StageMachine::describe_stage(stage);
            StageRow {
                stage: stage.as_str(),
                order: info.order,
                description: info.description,
                next: allowed_transitions(stage).into_iter().map(JourneyStage::as_str).collect(),
            }
        })
        .collect()
}

/// Plain-text rendering of [`stage_table`]
#[must_use]
pub fn render(rows: &[StageRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let next = if row.next.is_empty() {
            "-".to_string()
        } else {
            row.next.join(", ")
        };
        let _ = writeln!(out, "{:>2}  {:<24} {}\n    next: {next}", row.order, row.stage, row.description);
    }
    out
}
