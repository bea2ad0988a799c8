//! Generation backends

mod openai;
mod scripted;

pub use openai::OpenAiCompatibleBackend;
pub use scripted::{ScriptedBackend, ScriptedReply};

use crate::error::GenerationError;
use crate::request::GenerationRequest;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

/// Stream of text chunks making up one completion
pub type ChunkStream = BoxStream<'static, Result<String, GenerationError>>;

/// External text generator
///
/// Output carries no structural guarantee; callers go through
/// [`crate::RetryCoordinator`].
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier (model name)
    fn id(&self) -> &str;

    /// Start a completion; chunks arrive on the returned stream
    async fn generate(&self, request: &GenerationRequest) -> Result<ChunkStream, GenerationError>;
}

/// Concatenate every chunk of `stream`
///
/// # Errors
///
/// The first chunk error.
pub async fn collect_chunks(mut stream: ChunkStream) -> Result<String, GenerationError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}
