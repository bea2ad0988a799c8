//! Single strict-mode retry around one logical generation call

use crate::backend::{collect_chunks, GenerationBackend};
use crate::error::GenerationError;
use crate::request::GenerationRequest;
use metrics::counter;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use waypoint_parser::{ParseError, ResponseParser};

/// Runs a generation call with at most one strict retry
///
/// The first attempt uses the caller's request. Any failure (backend
/// error, timeout, empty text, unparseable or mis-shaped output) triggers
/// exactly one more attempt with [`GenerationRequest::strict_variant`].
/// A second failure is returned as-is. There is no backoff.
#[derive(Clone)]
pub struct RetryCoordinator {
    backend: Arc<dyn GenerationBackend>,
    parser: ResponseParser,
    timeout: Duration,
    strict_temperature: f32,
}

impl std::fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("backend", &self.backend.id())
            .field("timeout", &self.timeout)
            .field("strict_temperature", &self.strict_temperature)
            .finish_non_exhaustive()
    }
}

impl RetryCoordinator {
    /// Coordinator bounding each attempt by `timeout`
    #[must_use]
    pub fn new(backend: Arc<dyn GenerationBackend>, timeout: Duration, strict_temperature: f32) -> Self {
        Self {
            backend,
            parser: ResponseParser::new(),
            timeout,
            strict_temperature,
        }
    }

    /// Backend identifier
    #[must_use]
    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    /// Generate, parse into `T` and check with `validate`
    ///
    /// `validate` rejects structurally valid JSON that is still unusable
    /// (wrong item count, missing fields); its message becomes a
    /// [`ParseError::Shape`].
    ///
    /// # Errors
    ///
    /// The error of the strict attempt when both attempts fail.
    pub async fn generate_json<T, F>(
        &self,
        call: &'static str,
        request: GenerationRequest,
        validate: F,
    ) -> Result<T, GenerationError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), String>,
    {
        match self.attempt(call, &request, &validate).await {
            Ok(value) => Ok(value),
            Err(first) => {
                tracing::warn!("{call}: first attempt failed ({first}), retrying in strict mode");
                counter!("waypoint_generation_strict_retries_total", "call" => call).increment(1);

                let strict = request.strict_variant(self.strict_temperature);
                self.attempt(call, &strict, &validate).await.map_err(|second| {
                    tracing::error!("{call}: strict retry failed: {second}");
                    second
                })
            }
        }
    }

    async fn attempt<T, F>(
        &self,
        call: &'static str,
        request: &GenerationRequest,
        validate: &F,
    ) -> Result<T, GenerationError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), String>,
    {
        counter!("waypoint_generation_attempts_total", "call" => call).increment(1);

        let text = tokio::time::timeout(self.timeout, async {
            let stream = self.backend.generate(request).await?;
            collect_chunks(stream).await
        })
        .await
        .map_err(|_| GenerationError::Timeout {
            duration_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                backend: self.backend.id().to_string(),
            });
        }

        let value: T = self.parser.parse(&text)?;
        validate(&value).map_err(|reason| ParseError::shape(reason, text.as_str()))?;
        tracing::debug!("{call}: parsed {} chars from {}", text.len(), self.backend.id());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ScriptedBackend, ScriptedReply};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn coordinator(backend: &Arc<ScriptedBackend>) -> RetryCoordinator {
        RetryCoordinator::new(backend.clone(), Duration::from_millis(200), 0.3)
    }

    fn accept(_: &Value) -> Result<(), String> {
        Ok(())
    }

    #[tokio::test]
    async fn success_needs_one_call() {
        let backend = Arc::new(ScriptedBackend::new().with_response("{\"ok\": true}"));
        let value: Value = coordinator(&backend)
            .generate_json("test", GenerationRequest::new("x"), accept)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn parse_failure_triggers_one_strict_retry() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response("Sure! Here you go.")
                .with_response("{\"ok\": true}"),
        );
        let _: Value = coordinator(&backend)
            .generate_json("test", GenerationRequest::new("x").with_temperature(0.7), accept)
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].strict);
        assert!(requests[1].strict);
        assert!(requests[1].temperature < requests[0].temperature);
    }

    #[tokio::test]
    async fn second_failure_is_terminal() {
        let backend = Arc::new(ScriptedBackend::new().with_response("").with_response("still nothing"));
        let err = coordinator(&backend)
            .generate_json::<Value, _>("test", GenerationRequest::new("x"), accept)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(ParseError::Unparseable { .. })));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_response_is_reported() {
        let backend = Arc::new(ScriptedBackend::new().with_response("   ").with_response("\n"));
        let err = coordinator(&backend)
            .generate_json::<Value, _>("test", GenerationRequest::new("x"), accept)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn hanging_backend_times_out_then_retries() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply(ScriptedReply::Hang)
                .with_response("[1, 2]"),
        );
        let value: Vec<u8> = coordinator(&backend)
            .generate_json("test", GenerationRequest::new("x"), |_: &Vec<u8>| Ok(()))
            .await
            .unwrap();
        assert_eq!(value, vec![1, 2]);
    }

    #[tokio::test]
    async fn validation_failure_counts_as_shape_error() {
        let backend = Arc::new(ScriptedBackend::new().with_fallback(ScriptedReply::Text("[1]".into())));
        let err = coordinator(&backend)
            .generate_json("test", GenerationRequest::new("x"), |v: &Vec<u8>| {
                if v.len() == 2 {
                    Ok(())
                } else {
                    Err(format!("expected 2 items, got {}", v.len()))
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(ParseError::Shape { .. })));
        assert_eq!(backend.call_count(), 2);
    }
}
