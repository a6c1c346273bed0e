//! Test doubles for the sleep and transport seams.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use crate::clock::Sleeper;
use crate::error::{WorkerError, WorkerResult};
use crate::gemini::{GeminiTransport, GenerateContentRequest, ModelInfo, RawReply};

/// Sleeper that records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub async fn waits(&self) -> Vec<Duration> {
        self.waits.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().await.push(duration);
    }
}

/// One canned reply of a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Reply { status: u16, body: String },
    TransportError(String),
}

impl ScriptedReply {
    /// 200 envelope carrying `text`.
    pub fn text(text: impl Into<String>) -> Self {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": text.into()}]}}]
        });
        Self::Reply {
            status: 200,
            body: body.to_string(),
        }
    }

    /// Error envelope with the given status.
    pub fn status(status: u16, message: &str) -> Self {
        let body = json!({"error": {"code": status, "message": message}});
        Self::Reply {
            status,
            body: body.to_string(),
        }
    }
}

/// A request seen by a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub grounded: bool,
    pub prompt: String,
}

/// Transport replaying a fixed queue of replies.
///
/// Once the queue is empty every call fails as a transport error. Without
/// [`with_models`](Self::with_models) the catalog call fails.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    models: Option<Vec<ModelInfo>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(mut self, replies: Vec<ScriptedReply>) -> Self {
        self.replies.get_mut().extend(replies);
        self
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = Some(models);
        self
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl GeminiTransport for ScriptedTransport {
    async fn list_models(&self) -> WorkerResult<Vec<ModelInfo>> {
        self.models
            .clone()
            .ok_or_else(|| WorkerError::ai_failed("model catalog unavailable"))
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> WorkerResult<RawReply> {
        self.requests.lock().await.push(RecordedRequest {
            model: model.to_string(),
            grounded: request.is_grounded(),
            prompt: request.prompt().to_string(),
        });

        match self.replies.lock().await.pop_front() {
            Some(ScriptedReply::Reply { status, body }) => Ok(RawReply { status, body }),
            Some(ScriptedReply::TransportError(message)) => Err(WorkerError::ai_failed(message)),
            None => Err(WorkerError::ai_failed("no scripted reply left")),
        }
    }
}
