//! OpenAI-compatible chat completions generator
//!
//! Sends the system and user prompts to `{base_url}/chat/completions` with a
//! JSON-object response format. When the primary model is reported missing
//! the fallback model is tried once; every other failure is returned as is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::GenerationError;
use crate::generator::{GeneratedDraft, Generator, RegenerateRequest};
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};

pub const DEFAULT_MODEL: &str = "gpt-5-turbo-preview";
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Chat completions endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Primary model
    pub model: String,
    /// Tried once when the primary model is not found
    pub fallback_model: Option<String>,
    /// API root, without the trailing `/chat/completions`
    pub base_url: String,
    pub temperature: f32,
}

impl OpenAiConfig {
    /// Config with the given key and default model settings
    pub fn new(api_key: &str) -> Self {
        OpenAiConfig {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - OPENAI_API_KEY (required)
    /// - MODEL_NAME (optional, default: "gpt-5-turbo-preview")
    /// - OPENAI_FALLBACK_MODEL (optional, default: "gpt-4o"; empty disables)
    /// - OPENAI_BASE_URL (optional, default: "https://api.openai.com/v1")
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::NotConfigured("OPENAI_API_KEY not set".to_string()))?;

        let mut config = Self::new(&api_key);
        if let Ok(model) = std::env::var("MODEL_NAME") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        if let Ok(fallback) = std::env::var("OPENAI_FALLBACK_MODEL") {
            config.fallback_model = Some(fallback).filter(|f| !f.trim().is_empty());
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_fallback_model(mut self, model: Option<&str>) -> Self {
        self.fallback_model = model.map(str::to_string);
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Generator backed by an OpenAI-compatible HTTP API
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("criteria-regen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(OpenAiGenerator {
            config,
            http_client,
        })
    }

    /// Create a generator from environment variables
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::new(OpenAiConfig::from_env()?)
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// One chat completion call against `model`, returning the response body.
    async fn complete(&self, model: &str, user_prompt: &str) -> Result<Value, GenerationError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
        });

        debug!(model, url = %url, "sending chat completion");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(payload);
        }
        if status == reqwest::StatusCode::NOT_FOUND || error_code(&payload) == Some("model_not_found")
        {
            return Err(GenerationError::ModelNotFound {
                model: model.to_string(),
            });
        }

        let message = payload["error"]["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or(text);
        Err(GenerationError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    #[instrument(skip(self, request), fields(criterion_id = %request.criterion_id, mode = %request.mode))]
    async fn generate(
        &self,
        request: &RegenerateRequest,
    ) -> Result<GeneratedDraft, GenerationError> {
        let user_prompt = build_user_prompt(request)?;

        let body = match self.complete(&self.config.model, &user_prompt).await {
            Ok(body) => body,
            Err(GenerationError::ModelNotFound { model }) => match &self.config.fallback_model {
                Some(fallback) => {
                    warn!(model = %model, fallback = %fallback, "model not available, falling back");
                    self.complete(fallback, &user_prompt).await?
                }
                None => return Err(GenerationError::ModelNotFound { model }),
            },
            Err(e) => return Err(e),
        };

        let draft = parse_completion(&body)?;
        info!(rationale_len = draft.edit_rationale.len(), "completion parsed");
        Ok(draft)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn error_code(payload: &Value) -> Option<&str> {
    payload["error"]["code"].as_str()
}

/// Extract the draft from a chat completion response body.
///
/// The first choice's message content must be a JSON object carrying a
/// `problem_statement_json` object and a non-empty `edit_rationale`.
pub fn parse_completion(body: &Value) -> Result<GeneratedDraft, GenerationError> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .filter(|c| !c.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)?;

    let parsed: Value = serde_json::from_str(content)
        .map_err(|e| GenerationError::MalformedOutput(format!("content is not JSON: {e}")))?;

    let problem_statement_json = match parsed.get("problem_statement_json") {
        Some(v) if v.is_object() => v.clone(),
        _ => {
            return Err(GenerationError::MalformedOutput(
                "missing problem_statement_json object".to_string(),
            ))
        }
    };
    let edit_rationale = parsed
        .get("edit_rationale")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| GenerationError::MalformedOutput("missing edit_rationale".to_string()))?
        .to_string();

    Ok(GeneratedDraft {
        problem_statement_json,
        edit_rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[test]
    fn parses_well_formed_completion() {
        let body = completion(
            r#"{"problem_statement_json": {"problem_statement": "x"}, "edit_rationale": "tightened rules"}"#,
        );
        let draft = parse_completion(&body).unwrap();
        assert_eq!(draft.edit_rationale, "tightened rules");
        assert_eq!(draft.problem_statement_json["problem_statement"], "x");
    }

    #[test]
    fn empty_content_is_empty_response() {
        assert!(matches!(
            parse_completion(&completion("")),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(&json!({ "choices": [] })),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let no_rationale = completion(r#"{"problem_statement_json": {}}"#);
        assert!(matches!(
            parse_completion(&no_rationale),
            Err(GenerationError::MalformedOutput(_))
        ));

        let not_object = completion(r#"{"problem_statement_json": "text", "edit_rationale": "r"}"#);
        assert!(matches!(
            parse_completion(&not_object),
            Err(GenerationError::MalformedOutput(_))
        ));

        assert!(matches!(
            parse_completion(&completion("not json")),
            Err(GenerationError::MalformedOutput(_))
        ));
    }

    #[test]
    fn builder_trims_base_url() {
        let cfg = OpenAiConfig::new("sk-test")
            .with_base_url("http://localhost:8080/v1/")
            .with_fallback_model(None);
        assert_eq!(cfg.base_url, "http://localhost:8080/v1");
        assert!(cfg.fallback_model.is_none());
        assert_eq!(cfg.model, DEFAULT_MODEL);
    }
}
