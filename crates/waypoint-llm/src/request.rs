//! Generation request parameters

use serde::{Deserialize, Serialize};

/// Appended to the instruction on the strict retry
pub const STRICT_MODE_INSTRUCTION: &str = " STRICT MODE: No markdown, no explanations, no extra text. \
Return ONLY valid JSON matching exactly the above format.";

/// One call to a generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language instruction
    pub instruction: String,
    /// Optional system prompt
    pub system: Option<String>,
    /// Randomness, 0.0-2.0
    pub temperature: f32,
    /// Output length bound
    pub max_tokens: u32,
    /// Whether this is the strict retry variant
    pub strict: bool,
}

impl GenerationRequest {
    /// Request with default parameters (temperature 0.7, 2048 tokens)
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            system: None,
            temperature: 0.7,
            max_tokens: 2048,
            strict: false,
        }
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature, clamped to 0.0-2.0
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set the output length bound
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Strict variant: JSON-only instruction and lower temperature
    ///
    /// The temperature never goes up; a request already colder than
    /// `strict_temperature` keeps its own value.
    #[must_use]
    pub fn strict_variant(&self, strict_temperature: f32) -> Self {
        let mut strict = self.clone();
        if !strict.strict {
            strict.instruction.push_str(STRICT_MODE_INSTRUCTION);
        }
        strict.temperature = self.temperature.min(strict_temperature.clamp(0.0, 2.0));
        strict.strict = true;
        strict
    }
}
