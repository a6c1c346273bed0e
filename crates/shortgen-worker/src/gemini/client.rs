//! Generation client with rate-limit backoff and ungrounded fallback.
//!
//! One `generate` call is a small state machine:
//!
//! ```text
//! Attempting --429, attempts left--> Backoff --sleep--> Attempting
//! Attempting --400 while grounded--> FallbackRetry --no sleep--> Attempting (ungrounded)
//! Attempting --2xx--> Success | Failed(malformed)
//! Attempting --anything else--> Failed
//! ```
//!
//! The ungrounded fallback happens at most once per call and does not use
//! up an attempt, so a rejected tool is recovered even on the last one. With
//! `fallback_after_attempts` set, any non-success status at or past that
//! attempt also takes the fallback, and earlier ones back off.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Sleeper;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics::{
    record_backoff, record_fallback, record_generation_attempt, record_generation_failure,
};

use super::transport::{GeminiTransport, GenerateContentRequest, RawReply, ResponseClass};

/// Retry and fallback policy for one `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPolicy {
    /// Attempts allowed for backoff retries. The ungrounded resend repeats
    /// the current attempt instead of starting a new one.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub backoff_base: Duration,
    /// Added to the wait for every further retry.
    pub backoff_step: Duration,
    /// Attempt from which any failure triggers the ungrounded resend.
    pub fallback_after_attempts: Option<u32>,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(10),
            backoff_step: Duration::from_secs(10),
            fallback_after_attempts: None,
        }
    }
}

impl GenerationPolicy {
    /// Wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base + self.backoff_step.saturating_mul(attempt.saturating_sub(1))
    }
}

#[derive(Debug)]
enum State {
    Attempting { attempt: u32, grounded: bool },
    Backoff { attempt: u32, grounded: bool, wait: Duration },
    FallbackRetry { attempt: u32 },
    Success(String),
    Failed(WorkerError),
}

/// What came back from one send.
struct Outcome {
    class: ResponseClass,
    status: Option<u16>,
    reply: Option<RawReply>,
    message: String,
}

impl Outcome {
    fn from_result(result: WorkerResult<RawReply>) -> Self {
        match result {
            Ok(reply) => Self {
                class: reply.class(),
                status: Some(reply.status),
                message: if reply.class() == ResponseClass::Success {
                    String::new()
                } else {
                    reply.error_message()
                },
                reply: Some(reply),
            },
            Err(e) => Self {
                class: ResponseClass::OtherFailure,
                status: None,
                reply: None,
                message: e.to_string(),
            },
        }
    }
}

/// Text generation against one resolved model.
pub struct GenerationClient {
    transport: Arc<dyn GeminiTransport>,
    sleeper: Arc<dyn Sleeper>,
    model: String,
    policy: GenerationPolicy,
}

impl GenerationClient {
    pub fn new(
        transport: Arc<dyn GeminiTransport>,
        sleeper: Arc<dyn Sleeper>,
        model: impl Into<String>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            model: model.into(),
            policy,
        }
    }

    /// Generate text for `prompt`. With `search_grounded`, the first send
    /// carries the web-retrieval tool.
    pub async fn generate(&self, prompt: &str, search_grounded: bool) -> WorkerResult<String> {
        let mut fallback_used = false;
        let mut sends = 0u32;
        let mut state = State::Attempting {
            attempt: 1,
            grounded: search_grounded,
        };

        loop {
            state = match state {
                State::Attempting { attempt, grounded } => {
                    let request = GenerateContentRequest::new(prompt, grounded);
                    debug!(model = %self.model, attempt, grounded, "Sending generation request");
                    record_generation_attempt(&self.model, grounded);
                    sends += 1;

                    let result = self.transport.generate_content(&self.model, &request).await;
                    self.transition(
                        attempt,
                        sends,
                        grounded,
                        fallback_used,
                        Outcome::from_result(result),
                    )
                }
                State::Backoff {
                    attempt,
                    grounded,
                    wait,
                } => {
                    record_backoff(&self.model);
                    self.sleeper.sleep(wait).await;
                    State::Attempting {
                        attempt: attempt + 1,
                        grounded,
                    }
                }
                State::FallbackRetry { attempt } => {
                    fallback_used = true;
                    record_fallback(&self.model);
                    State::Attempting {
                        attempt,
                        grounded: false,
                    }
                }
                State::Success(text) => {
                    return Ok(text);
                }
                State::Failed(error) => {
                    if let WorkerError::Generation { status, .. } = &error {
                        record_generation_failure(*status);
                    } else {
                        record_generation_failure(None);
                    }
                    return Err(error);
                }
            };
        }
    }

    fn transition(
        &self,
        attempt: u32,
        sends: u32,
        grounded: bool,
        fallback_used: bool,
        outcome: Outcome,
    ) -> State {
        let can_fallback = grounded && !fallback_used;
        let attempts_left = attempt < self.policy.max_attempts;

        if outcome.class == ResponseClass::Success {
            let extracted = outcome
                .reply
                .as_ref()
                .map(RawReply::first_text)
                .unwrap_or_else(|| Err(WorkerError::malformed("empty reply")));
            return match extracted {
                Ok(text) => {
                    if sends > 1 {
                        info!(model = %self.model, sends, grounded, "Generation succeeded after retry");
                    }
                    State::Success(text)
                }
                Err(e) => State::Failed(e),
            };
        }

        if let Some(threshold) = self.policy.fallback_after_attempts {
            if attempt >= threshold && can_fallback {
                warn!(
                    model = %self.model,
                    attempt,
                    status = ?outcome.status,
                    "Generation still failing, resending without search grounding: {}",
                    outcome.message
                );
                return State::FallbackRetry { attempt };
            }
            if attempt < threshold && attempts_left {
                return self.backoff(attempt, grounded, &outcome);
            }
        }

        match outcome.class {
            ResponseClass::RateLimited if attempts_left => self.backoff(attempt, grounded, &outcome),
            ResponseClass::ToolUnsupported if can_fallback => {
                warn!(
                    model = %self.model,
                    attempt,
                    "Search grounding rejected, resending without it: {}",
                    outcome.message
                );
                State::FallbackRetry { attempt }
            }
            _ => State::Failed(WorkerError::generation(
                outcome.status,
                outcome.message,
                sends,
            )),
        }
    }

    fn backoff(&self, attempt: u32, grounded: bool, outcome: &Outcome) -> State {
        let wait = self.policy.backoff_for(attempt);
        warn!(
            model = %self.model,
            attempt,
            max_attempts = self.policy.max_attempts,
            status = ?outcome.status,
            delay_ms = wait.as_millis() as u64,
            "Generation request failed, backing off"
        );
        State::Backoff {
            attempt,
            grounded,
            wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSleeper, ScriptedReply, ScriptedTransport};

    fn client(
        transport: &Arc<ScriptedTransport>,
        sleeper: &Arc<RecordingSleeper>,
        policy: GenerationPolicy,
    ) -> GenerationClient {
        GenerationClient::new(
            transport.clone(),
            sleeper.clone(),
            "gemini-2.0-flash",
            policy,
        )
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = GenerationPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(20));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(40));

        let policy = GenerationPolicy {
            backoff_base: Duration::from_secs(60),
            backoff_step: Duration::from_secs(30),
            ..Default::default()
        };
        assert_eq!(policy.backoff_for(3), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![ScriptedReply::text("hello")]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let text = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", true)
            .await
            .unwrap();

        assert_eq!(text, "hello");
        let requests = transport.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].grounded);
        assert_eq!(requests[0].model, "gemini-2.0-flash");
        assert!(sleeper.waits().await.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_backs_off_then_fails() {
        let replies = (0..5).map(|_| ScriptedReply::status(429, "quota")).collect();
        let transport = Arc::new(ScriptedTransport::new().with_replies(replies));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Generation {
                status: Some(429),
                attempts: 5,
                ..
            }
        ));
        assert_eq!(transport.requests().await.len(), 5);

        let waits = sleeper.waits().await;
        assert_eq!(waits.len(), 4);
        assert!(waits.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_rate_limit_recovers() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(429, "quota"),
            ScriptedReply::status(429, "quota"),
            ScriptedReply::text("ok"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let text = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", true)
            .await
            .unwrap();

        assert_eq!(text, "ok");
        assert_eq!(
            sleeper.waits().await,
            vec![Duration::from_secs(10), Duration::from_secs(20)]
        );
        // Backoff keeps the grounding mode.
        assert!(transport.requests().await.iter().all(|r| r.grounded));
    }

    #[tokio::test]
    async fn test_tool_unsupported_resends_once_ungrounded() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(400, "Search Grounding is not supported."),
            ScriptedReply::text("plain"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let text = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", true)
            .await
            .unwrap();

        assert_eq!(text, "plain");
        let requests = transport.requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests[0].grounded);
        assert!(!requests[1].grounded);
        assert_eq!(requests[1].prompt, "prompt");
        assert!(sleeper.waits().await.is_empty());
    }

    #[tokio::test]
    async fn test_tool_unsupported_recovered_with_single_attempt() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(400, "Search Grounding is not supported."),
            ScriptedReply::text("plain"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = GenerationPolicy {
            max_attempts: 1,
            ..Default::default()
        };

        let text = client(&transport, &sleeper, policy)
            .generate("prompt", true)
            .await
            .unwrap();

        assert_eq!(text, "plain");
        let grounded: Vec<bool> = transport.requests().await.iter().map(|r| r.grounded).collect();
        assert_eq!(grounded, vec![true, false]);
    }

    #[tokio::test]
    async fn test_tool_unsupported_on_last_attempt_still_resends() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(429, "quota"),
            ScriptedReply::status(400, "Search Grounding is not supported."),
            ScriptedReply::text("plain"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = GenerationPolicy {
            max_attempts: 2,
            ..Default::default()
        };

        let text = client(&transport, &sleeper, policy)
            .generate("prompt", true)
            .await
            .unwrap();

        assert_eq!(text, "plain");
        let grounded: Vec<bool> = transport.requests().await.iter().map(|r| r.grounded).collect();
        assert_eq!(grounded, vec![true, true, false]);
        assert_eq!(sleeper.waits().await, vec![Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_rate_limit_after_fallback_keeps_budget() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(400, "bad tool"),
            ScriptedReply::status(429, "quota"),
            ScriptedReply::status(429, "quota"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = GenerationPolicy {
            max_attempts: 2,
            ..Default::default()
        };

        let err = client(&transport, &sleeper, policy)
            .generate("prompt", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Generation {
                status: Some(429),
                attempts: 3,
                ..
            }
        ));
        assert_eq!(sleeper.waits().await, vec![Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_fallback_happens_at_most_once() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(400, "bad tool"),
            ScriptedReply::status(400, "bad request"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Generation {
                status: Some(400),
                attempts: 2,
                ..
            }
        ));
        assert_eq!(transport.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_ungrounded_400_fails_without_resend() {
        let transport = Arc::new(
            ScriptedTransport::new().with_replies(vec![ScriptedReply::status(400, "bad request")]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("bad request"));
        assert_eq!(transport.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_not_retried_by_default() {
        let transport = Arc::new(
            ScriptedTransport::new().with_replies(vec![ScriptedReply::status(503, "overloaded")]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Generation {
                status: Some(503),
                attempts: 1,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert!(sleeper.waits().await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_other_failure() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_replies(vec![ScriptedReply::TransportError("connection refused".into())]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", true)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Generation { status: None, .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fallback_after_attempts_threshold() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![
            ScriptedReply::status(500, "boom"),
            ScriptedReply::status(500, "boom"),
            ScriptedReply::text("recovered"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = GenerationPolicy {
            fallback_after_attempts: Some(2),
            ..Default::default()
        };

        let text = client(&transport, &sleeper, policy)
            .generate("prompt", true)
            .await
            .unwrap();

        assert_eq!(text, "recovered");
        let grounded: Vec<bool> = transport.requests().await.iter().map(|r| r.grounded).collect();
        assert_eq!(grounded, vec![true, true, false]);
        // One backoff before the threshold, none for the fallback itself.
        assert_eq!(sleeper.waits().await, vec![Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_success_without_text_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new().with_replies(vec![ScriptedReply::Reply {
            status: 200,
            body: r#"{"candidates":[]}"#.to_string(),
        }]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(&transport, &sleeper, GenerationPolicy::default())
            .generate("prompt", false)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::MalformedResponse(_)));
        assert_eq!(transport.requests().await.len(), 1);
    }
}
