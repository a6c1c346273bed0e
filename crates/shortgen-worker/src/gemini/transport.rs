//! Gemini API wire types and transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::{WorkerError, WorkerResult};

// =============================================================================
// Request
// =============================================================================

/// `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    google_search_retrieval: GoogleSearchRetrieval,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSearchRetrieval {}

impl GenerateContentRequest {
    /// Build a single-turn request; `grounded` attaches the web-retrieval tool.
    pub fn new(prompt: &str, grounded: bool) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            tools: grounded.then(|| {
                vec![Tool {
                    google_search_retrieval: GoogleSearchRetrieval {},
                }]
            }),
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.tools.is_some()
    }

    pub fn prompt(&self) -> &str {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Model entry from the `models` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Name without the `models/` resource prefix.
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    /// True if the model can serve `generateContent`.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Raw HTTP reply of a generation call.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

/// Status class of a generation reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    /// 400: typically the retrieval tool is not enabled for this key/model
    ToolUnsupported,
    /// 429
    RateLimited,
    /// 5xx
    ServerError,
    OtherFailure,
}

impl ResponseClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => ResponseClass::Success,
            400 => ResponseClass::ToolUnsupported,
            429 => ResponseClass::RateLimited,
            500..=599 => ResponseClass::ServerError,
            _ => ResponseClass::OtherFailure,
        }
    }
}

impl RawReply {
    pub fn class(&self) -> ResponseClass {
        ResponseClass::from_status(self.status)
    }

    /// First generated text span of a success envelope.
    pub fn first_text(&self) -> WorkerResult<String> {
        let response: GenerateContentResponse = serde_json::from_str(&self.body)
            .map_err(|e| WorkerError::malformed(format!("Failed to parse Gemini response: {}", e)))?;

        response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| WorkerError::malformed("No content in Gemini response"))
    }

    /// Structured `error.message`, falling back to the raw body.
    pub fn error_message(&self) -> String {
        serde_json::from_str::<ErrorEnvelope>(&self.body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| {
                let body = self.body.trim();
                if body.is_empty() {
                    "Unknown Error".to_string()
                } else {
                    body.chars().take(300).collect()
                }
            })
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Request/response access to the generation API.
#[async_trait]
pub trait GeminiTransport: Send + Sync {
    /// List the model catalog.
    async fn list_models(&self) -> WorkerResult<Vec<ModelInfo>>;

    /// Submit a generation request. Non-2xx statuses are returned as replies,
    /// not errors; `Err` means the request never got a reply.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> WorkerResult<RawReply>;
}

/// Gemini API client over HTTPS.
pub struct HttpGeminiTransport {
    api_key: String,
    base_url: String,
    client: Client,
}

impl HttpGeminiTransport {
    pub fn new(config: &GeminiConfig) -> WorkerResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(WorkerError::config_error("GEMINI_API_KEY not set"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("shortgen-worker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl GeminiTransport for HttpGeminiTransport {
    async fn list_models(&self) -> WorkerResult<Vec<ModelInfo>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("pageSize", "1000")])
            .send()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("Model listing request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WorkerError::ai_failed(format!(
                "Model listing returned {}: {}",
                status, error_text
            )));
        }

        let listing: ListModelsResponse = response.json().await.map_err(|e| {
            WorkerError::ai_failed(format!("Failed to parse model listing: {}", e))
        })?;

        Ok(listing.models)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> WorkerResult<RawReply> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("Gemini API request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(model, status, grounded = request.is_grounded(), "Gemini reply received");

        Ok(RawReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            model_override: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_request_serialization_grounded() {
        let request = GenerateContentRequest::new("hello", true);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["tools"][0]["google_search_retrieval"], json!({}));
        assert!(request.is_grounded());
    }

    #[test]
    fn test_request_serialization_ungrounded() {
        let request = GenerateContentRequest::new("hello", false);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(request.prompt(), "hello");
    }

    #[test]
    fn test_response_class_from_status() {
        assert_eq!(ResponseClass::from_status(200), ResponseClass::Success);
        assert_eq!(ResponseClass::from_status(400), ResponseClass::ToolUnsupported);
        assert_eq!(ResponseClass::from_status(429), ResponseClass::RateLimited);
        assert_eq!(ResponseClass::from_status(503), ResponseClass::ServerError);
        assert_eq!(ResponseClass::from_status(403), ResponseClass::OtherFailure);
    }

    #[test]
    fn test_first_text_skips_non_text_parts() {
        let reply = RawReply {
            status: 200,
            body: json!({
                "candidates": [{
                    "content": {"parts": [{"functionCall": {}}, {"text": "猫が踊る"}]}
                }]
            })
            .to_string(),
        };
        assert_eq!(reply.first_text().unwrap(), "猫が踊る");
    }

    #[test]
    fn test_first_text_missing_is_malformed() {
        let reply = RawReply {
            status: 200,
            body: json!({"candidates": [{"finishReason": "SAFETY"}]}).to_string(),
        };
        assert!(matches!(
            reply.first_text(),
            Err(WorkerError::MalformedResponse(_))
        ));

        let reply = RawReply {
            status: 200,
            body: "not json".to_string(),
        };
        assert!(matches!(
            reply.first_text(),
            Err(WorkerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        let reply = RawReply {
            status: 400,
            body: json!({"error": {"code": 400, "message": "Search Grounding is not supported."}})
                .to_string(),
        };
        assert_eq!(reply.error_message(), "Search Grounding is not supported.");

        let reply = RawReply {
            status: 502,
            body: String::new(),
        };
        assert_eq!(reply.error_message(), "Unknown Error");
    }

    #[test]
    fn test_model_info_helpers() {
        let info = ModelInfo {
            name: "models/gemini-2.5-flash".into(),
            supported_generation_methods: vec!["countTokens".into(), "generateContent".into()],
        };
        assert_eq!(info.short_name(), "gemini-2.5-flash");
        assert!(info.supports_generation());
    }

    #[test]
    fn test_new_requires_api_key() {
        let mut config = test_config("http://localhost");
        config.api_key = String::new();
        assert!(matches!(
            HttpGeminiTransport::new(&config),
            Err(WorkerError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_models_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{
                    "name": "models/gemini-2.0-flash",
                    "supportedGenerationMethods": ["generateContent"]
                }]
            })))
            .mount(&server)
            .await;

        let transport = HttpGeminiTransport::new(&test_config(&server.uri())).unwrap();
        let models = transport.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].short_name(), "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_list_models_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpGeminiTransport::new(&test_config(&server.uri())).unwrap();
        assert!(matches!(
            transport.list_models().await,
            Err(WorkerError::AiFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_content_returns_error_status_as_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(body_partial_json(json!({"tools": [{"google_search_retrieval": {}}]})))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Resource has been exhausted"}
            })))
            .mount(&server)
            .await;

        let transport = HttpGeminiTransport::new(&test_config(&server.uri())).unwrap();
        let reply = transport
            .generate_content("gemini-2.0-flash", &GenerateContentRequest::new("hi", true))
            .await
            .unwrap();

        assert_eq!(reply.class(), ResponseClass::RateLimited);
        assert_eq!(reply.error_message(), "Resource has been exhausted");
    }
}
