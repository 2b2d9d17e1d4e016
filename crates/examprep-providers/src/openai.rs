//! OpenAI-compatible chat completions grader.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use examprep_core::model::Evaluation;
use examprep_core::traits::{GradeRequest, Grader};
use examprep_core::ProviderError;

use crate::http::{build_client, check_status, read_json, send_error};
use crate::prompt::{build_prompt, parse_evaluation, SYSTEM_PROMPT};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

pub struct OpenAiGrader {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiGrader {
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
struct OpenAiRequest {
    model: String,
    temperature: f64,
    response_format: ResponseFormat,
    messages: Vec<OpenAiMessage>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<OpenAiError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl Grader for OpenAiGrader {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn evaluate(&self, request: &GradeRequest) -> anyhow::Result<Evaluation> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(self.name().to_string()).into());
        }

        let body = OpenAiRequest {
            model: self.model.clone(),
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                OpenAiMessage {
                    role: "user",
                    content: build_prompt(request),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response, &self.model, error_message).await?;
        let api_response: OpenAiResponse = read_json(response).await?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("empty response".into()).into());
        }

        Ok(parse_evaluation(&text)?)
    }
}
