//! Journey stages
//!
//! Eight ordered milestones plus [`JourneyStage::JourneyPaused`], which sits
//! outside the linear order and is only entered from (and left to)
//! [`JourneyStage::RoadmapActive`].

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named milestone in a user's journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStage {
    /// Signed in, nothing else known yet
    Authenticated,
    /// Basic registration details captured
    BasicRegistered,
    /// Full profile including a career goal
    ProfileCompleted,
    /// Career-path recommendations produced
    CareerPathsGenerated,
    /// A career path was chosen
    CareerPathSelected,
    /// Detailed plan produced for the chosen path
    RoadmapGenerated,
    /// User is working through topic assessments
    RoadmapActive,
    /// Every topic completed
    JourneyCompleted,
    /// Temporarily paused while the roadmap is active
    JourneyPaused,
}

/// Display information for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    /// Position used for display; the paused stage reports 9
    pub order: u8,
    /// Human readable description
    pub description: &'static str,
}

impl JourneyStage {
    /// Number of ordered stages
    pub const TOTAL_STEPS: u8 = 8;

    /// Every stage, ordered ones first
    pub const ALL: [JourneyStage; 9] = [
        JourneyStage::Authenticated,
        JourneyStage::BasicRegistered,
        JourneyStage::ProfileCompleted,
        JourneyStage::CareerPathsGenerated,
        JourneyStage::CareerPathSelected,
        JourneyStage::RoadmapGenerated,
        JourneyStage::RoadmapActive,
        JourneyStage::JourneyCompleted,
        JourneyStage::JourneyPaused,
    ];

    /// Position in the linear progression, `None` for the paused stage
    #[inline]
    #[must_use]
    pub const fn order(self) -> Option<u8> {
        match self {
            Self::Authenticated => Some(1),
            Self::BasicRegistered => Some(2),
            Self::ProfileCompleted => Some(3),
            Self::CareerPathsGenerated => Some(4),
            Self::CareerPathSelected => Some(5),
            Self::RoadmapGenerated => Some(6),
            Self::RoadmapActive => Some(7),
            Self::JourneyCompleted => Some(8),
            Self::JourneyPaused => None,
        }
    }

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authenticated => "AUTHENTICATED",
            Self::BasicRegistered => "BASIC_REGISTERED",
            Self::ProfileCompleted => "PROFILE_COMPLETED",
            Self::CareerPathsGenerated => "CAREER_PATHS_GENERATED",
            Self::CareerPathSelected => "CAREER_PATH_SELECTED",
            Self::RoadmapGenerated => "ROADMAP_GENERATED",
            Self::RoadmapActive => "ROADMAP_ACTIVE",
            Self::JourneyCompleted => "JOURNEY_COMPLETED",
            Self::JourneyPaused => "JOURNEY_PAUSED",
        }
    }

    /// Order and description for display
    #[must_use]
    pub const fn describe(self) -> StageInfo {
        let description = match self {
            Self::Authenticated => "User has signed in",
            Self::BasicRegistered => "Basic registration details provided",
            Self::ProfileCompleted => "Profile completed with a career goal",
            Self::CareerPathsGenerated => "Career path recommendations generated",
            Self::CareerPathSelected => "Career path selected",
            Self::RoadmapGenerated => "Detailed learning roadmap generated",
            Self::RoadmapActive => "Working through roadmap assessments",
            Self::JourneyCompleted => "All roadmap topics completed",
            Self::JourneyPaused => "Journey paused",
        };
        let order = match self.order() {
            Some(order) => order,
            None => Self::TOTAL_STEPS + 1,
        };
        StageInfo { order, description }
    }

    /// Stage whose position is used for progress reporting
    ///
    /// A paused journey reports the progress it had while active.
    #[inline]
    #[must_use]
    pub const fn progress_order(self) -> u8 {
        match self.order() {
            Some(order) => order,
            None => 7,
        }
    }
}

impl fmt::Display for JourneyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JourneyStage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| ModelError::UnknownStage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_stages_are_strictly_increasing() {
        let orders: Vec<u8> = JourneyStage::ALL.iter().filter_map(|s| s.order()).collect();
        assert_eq!(orders, (1..=8).collect::<Vec<u8>>());
    }

    #[test]
    fn names_parse_back() {
        for stage in JourneyStage::ALL {
            assert_eq!(stage.as_str().parse::<JourneyStage>().unwrap(), stage);
        }
    }

    #[test]
    fn unknown_name_fails() {
        assert_eq!(
            "ROADMAP_FINISHED".parse::<JourneyStage>(),
            Err(ModelError::UnknownStage("ROADMAP_FINISHED".into()))
        );
    }

    #[test]
    fn paused_describes_as_ninth() {
        let info = JourneyStage::JourneyPaused.describe();
        assert_eq!(info.order, 9);
        assert_eq!(JourneyStage::JourneyPaused.progress_order(), 7);
    }

    #[test]
    fn serde_uses_upper_snake_names() {
        let json = serde_json::to_string(&JourneyStage::CareerPathSelected).unwrap();
        assert_eq!(json, "\"CAREER_PATH_SELECTED\"");
    }
}
