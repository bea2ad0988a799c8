//! Waypoint generation layer
//!
//! - [`GenerationBackend`]: the external text generator, returning a stream of chunks
//! - [`RetryCoordinator`]: one normal attempt, then exactly one strict-mode retry
//! - [`ScriptedBackend`]: queued replies for tests and offline runs
//! - [`OpenAiCompatibleBackend`]: HTTP backend for OpenAI-style chat APIs
//!
//! All backend text passes through [`waypoint_parser::ResponseParser`]
//! before callers see it.

pub mod backend;
pub mod error;
pub mod request;
pub mod retry;

pub use backend::{collect_chunks, ChunkStream, GenerationBackend, OpenAiCompatibleBackend, ScriptedBackend, ScriptedReply};
pub use error::GenerationError;
pub use request::{GenerationRequest, STRICT_MODE_INSTRUCTION};
pub use retry::RetryCoordinator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
