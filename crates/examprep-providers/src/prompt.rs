//! Grading prompt construction and evaluation parsing, shared by every
//! HTTP provider.

use serde::Deserialize;

use examprep_core::model::{letter_grade, Evaluation, RubricDimensions};
use examprep_core::traits::{extract_json_from_markdown, GradeRequest};
use examprep_core::ProviderError;

pub const SYSTEM_PROMPT: &str = "You are an expert technical interviewer. You grade candidate answers strictly against the rubric you are given and reply with a single JSON object and nothing else.";

pub const RUBRIC: &str = r#"# Rubric dimensions (each scored 0-5)

1. Conceptual knowledge (weight 25%)
   - 0: missing or incorrect
   - 3: correct explanation
   - 5: deep understanding, relates concepts to each other
2. Accuracy and correctness (weight 25%)
   - 0: major errors
   - 3: minor inaccuracies
   - 5: fully correct, aligned with standards
3. Depth and reasoning (weight 15%)
   - 0: definitions only
   - 3: basic reasoning
   - 5: explains why, tradeoffs and implications
4. Practical application (weight 20%)
   - 0: theoretical only
   - 3: basic use cases
   - 5: real-world examples (frameworks, APIs, libraries)
5. Edge cases and pitfalls (weight 10%)
   - 0: none mentioned
   - 3: mentions common pitfalls
   - 5: explains how to avoid them
6. Clarity and precision (weight 5%)
   - 0: confusing
   - 3: understandable
   - 5: precise, professional

# Final score (0-100)
((conceptual * 0.25) + (accuracy * 0.25) + (reasoning * 0.15) + (practical * 0.20) + (edgeCases * 0.10) + (clarity * 0.05)) * 20"#;

const RESPONSE_SHAPE: &str = r#"{
  "score": number,
  "grade": "string",
  "dimensions": {
    "conceptualKnowledge": number,
    "accuracy": number,
    "depthAndReasoning": number,
    "practicalApplication": number,
    "edgeCases": number,
    "clarity": number
  },
  "feedback": "string",
  "strengths": ["string"],
  "improvements": ["string"],
  "sampleAnswer": "string"
}"#;

/// Build the user prompt for one answer.
pub fn build_prompt(request: &GradeRequest) -> String {
    format!(
        "Evaluate the candidate answer below using the rubric.\n\n\
         Question: {question}\n\
         Reference answer: {reference}\n\
         Candidate answer: {candidate}\n\n\
         {RUBRIC}\n\n\
         Instructions:\n\
         1. Score each dimension from 0 to 5 using the anchors.\n\
         2. Compute the weighted final score (0-100).\n\
         3. Assign a letter grade (A, B, C, D, F).\n\
         4. Give constructive feedback, strengths, improvements and a model answer.\n\n\
         Respond with JSON only, in exactly this shape:\n{RESPONSE_SHAPE}",
        question = request.question_text,
        reference = request.reference_answer,
        candidate = request.candidate_answer,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    score: Option<f64>,
    #[serde(default)]
    grade: Option<String>,
    dimensions: Option<RubricDimensions>,
    feedback: Option<String>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    sample_answer: Option<String>,
}

/// Turn a model's text reply into an [`Evaluation`].
///
/// A missing score, dimensions or feedback, or any value outside its range,
/// is a [`ProviderError::MalformedResponse`]. A missing grade is derived from
/// the score.
pub fn parse_evaluation(text: &str) -> Result<Evaluation, ProviderError> {
    let json = extract_json_from_markdown(text);
    let raw: RawEvaluation = serde_json::from_str(&json)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let score = raw
        .score
        .ok_or_else(|| ProviderError::MalformedResponse("missing score".into()))?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(ProviderError::MalformedResponse(format!(
            "score {score} is outside 0-100"
        )));
    }

    let dimensions = raw
        .dimensions
        .ok_or_else(|| ProviderError::MalformedResponse("missing dimensions".into()))?;
    if !dimensions.in_range() {
        return Err(ProviderError::MalformedResponse(
            "dimension scores must be between 0 and 5".into(),
        ));
    }

    let feedback = raw
        .feedback
        .ok_or_else(|| ProviderError::MalformedResponse("missing feedback".into()))?;

    let grade = match raw.grade {
        Some(g) if !g.trim().is_empty() => g.trim().to_string(),
        _ => letter_grade(score).to_string(),
    };

    Ok(Evaluation {
        score,
        grade,
        dimensions,
        feedback,
        strengths: raw.strengths,
        improvements: raw.improvements,
        sample_answer: raw.sample_answer.filter(|s| !s.trim().is_empty()),
    })
}
