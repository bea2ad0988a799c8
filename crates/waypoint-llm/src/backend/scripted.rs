//! Scripted backend for tests and offline runs

use super::{ChunkStream, GenerationBackend};
use crate::error::GenerationError;
use crate::request::GenerationRequest;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

/// One queued backend behaviour
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Whole completion in a single chunk
    Text(String),
    /// Completion split into chunks
    Chunks(Vec<String>),
    /// Request fails with a backend error
    Fail(String),
    /// Never answers; exercises caller timeouts
    Hang,
}

/// Backend replaying queued replies in order
///
/// Once the queue is drained the fallback reply is used if set, otherwise
/// calls fail.
#[derive(Debug)]
pub struct ScriptedBackend {
    id: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<ScriptedReply>,
    requests: Mutex<Vec<GenerationRequest>>,
    call_count: AtomicU32,
}

impl ScriptedBackend {
    /// Backend with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: "scripted".to_string(),
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Queue a text reply
    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue an arbitrary reply
    #[must_use]
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.push(reply);
        self
    }

    /// Reply used once the queue is empty
    #[must_use]
    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Queue a reply on a shared backend
    pub fn push(&self, reply: ScriptedReply) {
        self.replies.lock().push_back(reply);
    }

    /// Number of `generate` calls so far
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Replies still queued
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ChunkStream, GenerationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let reply = self.replies.lock().pop_front().or_else(|| self.fallback.clone());
        match reply {
            Some(ScriptedReply::Text(text)) => Ok(stream::once(async move { Ok(text) }).boxed()),
            Some(ScriptedReply::Chunks(chunks)) => Ok(stream::iter(chunks.into_iter().map(Ok)).boxed()),
            Some(ScriptedReply::Fail(message)) => Err(GenerationError::Backend(message)),
            Some(ScriptedReply::Hang) => {
                futures::future::pending::<()>().await;
                Err(GenerationError::Backend("unreachable".into()))
            }
            None => Err(GenerationError::Backend("script exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::collect_chunks;

    #[tokio::test]
    async fn replies_are_served_in_order() {
        let backend = ScriptedBackend::new()
            .with_response("first")
            .with_reply(ScriptedReply::Chunks(vec!["sec".into(), "ond".into()]));

        let req = GenerationRequest::new("x");
        let a = collect_chunks(backend.generate(&req).await.unwrap()).await.unwrap();
        let b = collect_chunks(backend.generate(&req).await.unwrap()).await.unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("first", "second"));
        assert_eq!(backend.call_count(), 2);
        assert!(backend.generate(&req).await.is_err());
    }

    #[tokio::test]
    async fn fallback_is_reused() {
        let backend = ScriptedBackend::new().with_fallback(ScriptedReply::Text("{}".into()));
        let req = GenerationRequest::new("x");
        for _ in 0..3 {
            let text = collect_chunks(backend.generate(&req).await.unwrap()).await.unwrap();
            assert_eq!(text, "{}");
        }
        assert_eq!(backend.requests().len(), 3);
    }
}
