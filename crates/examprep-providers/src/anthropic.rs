//! Anthropic Messages API grader.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use examprep_core::model::Evaluation;
use examprep_core::traits::{GradeRequest, Grader};
use examprep_core::ProviderError;

use crate::http::{build_client, check_status, read_json, send_error};
use crate::prompt::{build_prompt, parse_evaluation, SYSTEM_PROMPT};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

pub struct AnthropicGrader {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicGrader {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: build_client()?,
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: &'static str,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<AnthropicError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl Grader for AnthropicGrader {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn evaluate(&self, request: &GradeRequest) -> anyhow::Result<Evaluation> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(self.name().to_string()).into());
        }

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: 0.2,
            system: SYSTEM_PROMPT,
            messages: vec![AnthropicMessage {
                role: "user",
                content: build_prompt(request),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response, &self.model, error_message).await?;
        let api_response: AnthropicResponse = read_json(response).await?;

        let text: String = api_response.content.into_iter().map(|c| c.text).collect();
        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("empty response".into()).into());
        }

        Ok(parse_evaluation(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GradeRequest {
        GradeRequest {
            question_text: "Explain ownership.".into(),
            reference_answer: "Each value has one owner.".into(),
            candidate_answer: "Values have a single owner and are dropped with it.".into(),
        }
    }

    #[tokio::test]
    async fn successful_evaluation() {
        let server = MockServer::start().await;
        let text = "```json\n{\"score\": 95, \"grade\": \"A\", \"dimensions\": {\"conceptualKnowledge\": 5, \"accuracy\": 5, \"depthAndReasoning\": 4, \"practicalApplication\": 5, \"edgeCases\": 4, \"clarity\": 5}, \"feedback\": \"Excellent.\"}\n```";
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": text}],
                "model": "claude-test"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grader =
            AnthropicGrader::new("test-key", Some("claude-test".into()), Some(server.uri()))
                .unwrap();
        let eval = grader.evaluate(&request()).await.unwrap();
        assert_eq!(eval.score, 95.0);
        assert_eq!(eval.grade, "A");
        assert!(eval.strengths.is_empty());
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let grader = AnthropicGrader::new("bad-key", None, Some(server.uri())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("authentication"));
    }

    #[tokio::test]
    async fn api_error_uses_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let grader = AnthropicGrader::new("k", None, Some(server.uri())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "API error (HTTP 529): Overloaded");
    }

    #[tokio::test]
    async fn blank_key_is_missing_credentials() {
        let grader = AnthropicGrader::new("  ", None, Some("http://127.0.0.1:9".into())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("missing API key for provider 'anthropic'"));
    }
}
