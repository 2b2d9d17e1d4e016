//! Mock grader for tests and offline use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use examprep_core::model::{letter_grade, Evaluation, RubricDimensions};
use examprep_core::traits::{GradeRequest, Grader};
use examprep_core::ProviderError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Score(f64),
    /// Fail the call as an API error with this message.
    Fail(String),
    /// Reply with text that cannot be parsed as an evaluation.
    Malformed,
}

/// A grader that answers from a script instead of calling a service.
///
/// Replies are consumed in call order; once the script runs out every call
/// gets the default score.
pub struct MockGrader {
    script: Vec<MockReply>,
    default_score: f64,
    call_count: AtomicUsize,
    last_request: Mutex<Option<GradeRequest>>,
}

impl MockGrader {
    pub fn new(script: Vec<MockReply>) -> Self {
        Self {
            script,
            default_score: 75.0,
            call_count: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Every call scores `score`.
    pub fn with_fixed_score(score: f64) -> Self {
        Self {
            default_score: score,
            ..Self::new(Vec::new())
        }
    }

    /// Succeed with the default score except at call `index` (0-based).
    pub fn failing_at(index: usize) -> Self {
        let mut script = vec![MockReply::Score(75.0); index];
        script.push(MockReply::Fail("mock failure".into()));
        Self::new(script)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GradeRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn evaluation(score: f64, request: &GradeRequest) -> Evaluation {
    let dim = (score / 20.0).clamp(0.0, RubricDimensions::MAX);
    Evaluation {
        score,
        grade: letter_grade(score).to_string(),
        dimensions: RubricDimensions {
            conceptual_knowledge: dim,
            accuracy: dim,
            depth_and_reasoning: dim,
            practical_application: dim,
            edge_cases: dim,
            clarity: dim,
        },
        feedback: format!("Mock evaluation of a {}-character answer.", request.candidate_answer.len()),
        strengths: vec![],
        improvements: vec![],
        sample_answer: Some(request.reference_answer.clone()),
    }
}

#[async_trait]
impl Grader for MockGrader {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-grader"
    }

    async fn evaluate(&self, request: &GradeRequest) -> anyhow::Result<Evaluation> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        match self.script.get(n) {
            Some(MockReply::Score(score)) => Ok(evaluation(*score, request)),
            Some(MockReply::Fail(message)) => Err(ProviderError::ApiError {
                status: 500,
                message: message.clone(),
            }
            .into()),
            Some(MockReply::Malformed) => {
                Err(ProviderError::MalformedResponse("mock reply is not JSON".into()).into())
            }
            None => Ok(evaluation(self.default_score, request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(answer: &str) -> GradeRequest {
        GradeRequest {
            question_text: "Q".into(),
            reference_answer: "R".into(),
            candidate_answer: answer.into(),
        }
    }

    #[tokio::test]
    async fn fixed_score() {
        let grader = MockGrader::with_fixed_score(92.0);
        let eval = grader.evaluate(&request("hello")).await.unwrap();
        assert_eq!(eval.score, 92.0);
        assert_eq!(eval.grade, "A");
        assert!(eval.dimensions.in_range());
        assert_eq!(grader.call_count(), 1);
        assert_eq!(grader.last_request().unwrap().candidate_answer, "hello");
    }

    #[tokio::test]
    async fn script_then_default() {
        let grader = MockGrader::new(vec![MockReply::Score(10.0), MockReply::Malformed]);
        assert_eq!(grader.evaluate(&request("a")).await.unwrap().score, 10.0);
        assert!(grader.evaluate(&request("b")).await.is_err());
        assert_eq!(grader.evaluate(&request("c")).await.unwrap().score, 75.0);
    }

    #[tokio::test]
    async fn failing_at_index() {
        let grader = MockGrader::failing_at(1);
        assert!(grader.evaluate(&request("a")).await.is_ok());
        let err = grader.evaluate(&request("b")).await.unwrap_err();
        assert!(err.to_string().contains("mock failure"));
    }
}
