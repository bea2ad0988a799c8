//! Waypoint configuration
//!
//! Loaded from TOML; every key is optional and falls back to the default.
//!
//! ```toml
//! generation_timeout_ms = 60000
//! pass_threshold = 60.0
//!
//! [max_tokens]
//! career_paths = 3072
//! ```

use crate::error::WaypointError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Waypoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointConfig {
    /// Bound on one generation attempt, in milliseconds
    pub generation_timeout_ms: u64,
    /// Bound on one store call, in milliseconds
    pub store_timeout_ms: u64,
    /// Discovery questions per roadmap
    pub career_question_count: usize,
    /// Career paths recommended per roadmap
    pub career_path_count: usize,
    /// Questions per topic assessment
    pub assessment_question_count: usize,
    /// Minimum percentage that passes an assessment (inclusive)
    pub pass_threshold: f64,
    /// Temperature of the first attempt
    pub temperature: f32,
    /// Temperature of the strict retry
    pub strict_temperature: f32,
    /// Output length bounds per call
    pub max_tokens: MaxTokens,
    /// Hosts resource links may point to
    pub allowed_resource_domains: Vec<String>,
    /// Re-reads allowed when an internal snapshot sync loses a revision race
    pub max_sync_attempts: u32,
}

/// Output length bounds per generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxTokens {
    /// Discovery questions
    pub questions: u32,
    /// Career paths
    pub career_paths: u32,
    /// High-level plan
    pub plan: u32,
    /// Subtopic expansion
    pub subtopics: u32,
    /// Assessment questions
    pub assessment: u32,
    /// Assessment evaluation
    pub evaluation: u32,
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self {
            questions: 2048,
            career_paths: 3072,
            plan: 4096,
            subtopics: 4096,
            assessment: 2048,
            evaluation: 2048,
        }
    }
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            generation_timeout_ms: 60_000,
            store_timeout_ms: 5_000,
            career_question_count: 5,
            career_path_count: 3,
            assessment_question_count: 5,
            pass_threshold: 60.0,
            temperature: 0.7,
            strict_temperature: 0.3,
            max_tokens: MaxTokens::default(),
            allowed_resource_domains: ["coursera.org", "udemy.com", "youtube.com", "tensorflow.org", "python.org"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_sync_attempts: 3,
        }
    }
}

impl WaypointConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With generation timeout
    #[inline]
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_ms = duration_ms(timeout);
        self
    }

    /// With store timeout
    #[inline]
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = duration_ms(timeout);
        self
    }

    /// With pass threshold
    #[inline]
    #[must_use]
    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    /// With assessment question count
    #[inline]
    #[must_use]
    pub fn with_assessment_question_count(mut self, count: usize) -> Self {
        self.assessment_question_count = count;
        self
    }

    /// Generation timeout as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Store timeout as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    ///
    /// [`WaypointError::Config`] on syntax errors or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, WaypointError> {
        let config: Self = toml::from_str(text).map_err(|e| WaypointError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// [`WaypointError::Config`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WaypointError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WaypointError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// [`WaypointError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), WaypointError> {
        let fail = |msg: &str| Err(WaypointError::Config(msg.to_string()));

        if self.generation_timeout_ms == 0 || self.store_timeout_ms == 0 {
            return fail("timeouts must be greater than zero");
        }
        if self.career_question_count == 0
            || self.career_path_count == 0
            || self.assessment_question_count == 0
        {
            return fail("question and path counts must be greater than zero");
        }
        if !(0.0..=100.0).contains(&self.pass_threshold) {
            return fail("pass_threshold must be between 0 and 100");
        }
        if !(0.0..=2.0).contains(&self.temperature) || !(0.0..=2.0).contains(&self.strict_temperature) {
            return fail("temperatures must be between 0.0 and 2.0");
        }
        if self.max_sync_attempts == 0 {
            return fail("max_sync_attempts must be at least 1");
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
