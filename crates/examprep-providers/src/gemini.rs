//! Google Gemini grader.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use examprep_core::model::Evaluation;
use examprep_core::traits::{GradeRequest, Grader};
use examprep_core::ProviderError;

use crate::http::{build_client, check_status, read_json, send_error};
use crate::prompt::{build_prompt, parse_evaluation, SYSTEM_PROMPT};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiGrader {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiGrader {
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
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GeminiError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl Grader for GeminiGrader {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn evaluate(&self, request: &GradeRequest) -> anyhow::Result<Evaluation> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(self.name().to_string()).into());
        }

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: build_prompt(request),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response, &self.model, error_message).await?;
        let api_response: GeminiResponse = read_json(response).await?;

        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("empty response".into()).into());
        }

        Ok(parse_evaluation(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EVALUATION: &str = r#"{"score": 85, "grade": "B", "dimensions": {"conceptualKnowledge": 5, "accuracy": 4, "depthAndReasoning": 4, "practicalApplication": 4, "edgeCases": 3, "clarity": 5}, "feedback": "Good answer.", "strengths": ["clear"], "improvements": []}"#;

    fn request() -> GradeRequest {
        GradeRequest {
            question_text: "What is the event loop?".into(),
            reference_answer: "It schedules callbacks.".into(),
            candidate_answer: "It runs queued tasks.".into(),
        }
    }

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
    }

    #[tokio::test]
    async fn successful_evaluation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(query_param_is_missing("key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(EVALUATION)))
            .expect(1)
            .mount(&server)
            .await;

        let grader =
            GeminiGrader::new("test-key", Some("gemini-test".into()), Some(server.uri())).unwrap();
        let eval = grader.evaluate(&request()).await.unwrap();
        assert_eq!(eval.score, 85.0);
        assert_eq!(eval.grade, "B");
        assert_eq!(eval.dimensions.conceptual_knowledge, 5.0);
    }

    #[tokio::test]
    async fn fenced_reply_is_unwrapped() {
        let server = MockServer::start().await;
        let fenced = format!("```json\n{EVALUATION}\n```");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(&fenced)))
            .mount(&server)
            .await;

        let grader = GeminiGrader::new("k", None, Some(server.uri())).unwrap();
        assert_eq!(grader.evaluate(&request()).await.unwrap().score, 85.0);
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let grader = GeminiGrader::new("", None, Some(server.uri())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::MissingCredentials(_))
        ));
    }

    #[tokio::test]
    async fn rejected_key_is_not_echoed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let grader = GeminiGrader::new("secret-key-123", None, Some(server.uri())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert!(!format!("{err:#}").contains("secret-key-123"));
    }

    #[tokio::test]
    async fn server_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"code": 500, "message": "backend overloaded"}
            })))
            .mount(&server)
            .await;

        let grader = GeminiGrader::new("k", None, Some(server.uri())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("backend overloaded"));
    }

    #[tokio::test]
    async fn prose_reply_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Looks fine to me.")))
            .mount(&server)
            .await;

        let grader = GeminiGrader::new("k", None, Some(server.uri())).unwrap();
        let err = grader.evaluate(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::MalformedResponse(_))
        ));
    }
}
