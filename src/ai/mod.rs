// src/ai/mod.rs
//
// AI provider abstraction. Consumers never talk to a concrete backend;
// they hold an `Arc<dyn AiProvider>` built from configuration at startup.

pub mod gemini;
pub mod openrouter;

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, ProviderKind};
use crate::models::quiz::{Difficulty, QuizQuestion};

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

#[derive(Debug)]
pub enum AiError {
    /// The provider's API key is absent from the environment; the
    /// capability is non-functional until it is configured.
    MissingApiKey {
        provider: &'static str,
    },
    Request {
        provider: &'static str,
        source: reqwest::Error,
    },
    /// Non-success transport status from the backing service.
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },
    EmptyResponse {
        provider: &'static str,
    },
    /// The response parsed but failed structural validation, or did not
    /// parse at all. Never coerced into a usable quiz.
    InvalidResponse {
        reason: String,
    },
    Unsupported {
        provider: &'static str,
        capability: &'static str,
    },
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiError::MissingApiKey { provider } => {
                write!(f, "{} API key is not configured", provider)
            }
            AiError::Request { provider, source } => {
                write!(f, "{} request failed: {}", provider, source)
            }
            AiError::Http {
                provider,
                status,
                body,
            } => write!(f, "{} API error ({}): {}", provider, status, body),
            AiError::EmptyResponse { provider } => {
                write!(f, "no content returned from {}", provider)
            }
            AiError::InvalidResponse { reason } => {
                write!(f, "invalid quiz response from AI: {}", reason)
            }
            AiError::Unsupported {
                provider,
                capability,
            } => write!(f, "{} not implemented for the {} provider", capability, provider),
        }
    }
}

impl std::error::Error for AiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AiError::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// What the quiz should be generated from: the raw document (transported
/// base64-encoded with its media type) or already-extracted text.
#[derive(Debug, Clone)]
pub enum QuizSource {
    Document {
        bytes: Vec<u8>,
        media_type: String,
        filename: String,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct GenerateQuizParams {
    pub source: QuizSource,
    pub num_questions: u32,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone)]
pub struct GenerateStoryCardsParams {
    pub context: String,
    pub num_cards: u32,
}

#[derive(Debug, Clone)]
pub struct GenerateSummaryParams {
    pub context: String,
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GenerateEmbeddingParams {
    pub text: String,
}

/// The quiz shape the backing service must return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl GeneratedQuiz {
    /// Structural validation: non-empty title, non-empty question list,
    /// and every question with four options and an in-bounds answer.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("missing quiz title".to_string());
        }
        if self.questions.is_empty() {
            return Err("quiz has no questions".to_string());
        }
        for (i, question) in self.questions.iter().enumerate() {
            question
                .validate()
                .map_err(|reason| format!("question {}: {}", i + 1, reason))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryCard {
    pub headline: String,
    pub body: String,
    pub visual_prompt: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedStoryDeck {
    pub title: String,
    pub cards: Vec<StoryCard>,
}

/// Capability surface of an AI backend.
///
/// Only `generate_quiz` has production implementations; the remaining
/// capabilities default to `Unsupported` until a provider grows them.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate_quiz(&self, params: GenerateQuizParams) -> Result<GeneratedQuiz, AiError>;

    async fn generate_story_cards(
        &self,
        _params: GenerateStoryCardsParams,
    ) -> Result<GeneratedStoryDeck, AiError> {
        Err(AiError::Unsupported {
            provider: self.name(),
            capability: "story cards",
        })
    }

    async fn generate_summary(&self, _params: GenerateSummaryParams) -> Result<String, AiError> {
        Err(AiError::Unsupported {
            provider: self.name(),
            capability: "summaries",
        })
    }

    async fn generate_embedding(
        &self,
        _params: GenerateEmbeddingParams,
    ) -> Result<Vec<f32>, AiError> {
        Err(AiError::Unsupported {
            provider: self.name(),
            capability: "embeddings",
        })
    }
}

/// Builds the configured provider. The choice is an injected configuration
/// value, not process-wide state, so tests and callers can construct any
/// provider directly.
pub fn provider_from_config(config: &AiConfig) -> Arc<dyn AiProvider> {
    match config.provider {
        ProviderKind::OpenRouter => Arc::new(OpenRouterProvider::new(config)),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config)),
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence regex"))
}

fn brace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("brace regex"))
}

/// Pulls the JSON payload out of a model response that may wrap it in a
/// code fence or surrounding prose. Returns the input unchanged when no
/// wrapper is recognized.
pub fn extract_json(text: &str) -> &str {
    if let Some(m) = fence_re().captures(text).and_then(|caps| caps.get(1)) {
        return m.as_str().trim();
    }
    if let Some(m) = brace_re().find(text) {
        return m.as_str();
    }
    text
}

/// Parses and validates a quiz response. Any parse or shape failure is an
/// `InvalidResponse`, reported to the pipeline as a generation failure.
pub(crate) fn parse_quiz_response(text: &str) -> Result<GeneratedQuiz, AiError> {
    let json = extract_json(text);
    let quiz: GeneratedQuiz = serde_json::from_str(json)
        .map_err(|e| AiError::InvalidResponse {
            reason: e.to_string(),
        })?;
    quiz.validate()
        .map_err(|reason| AiError::InvalidResponse { reason })?;
    Ok(quiz)
}

pub(crate) fn quiz_prompt_for_document(num_questions: u32, difficulty: Difficulty) -> String {
    format!(
        r#"You are an expert educator. Analyze this PDF document and generate a quiz to test comprehension.

Requirements:
- Generate exactly {num_questions} multiple-choice questions
- Difficulty level: {difficulty}
- Each question should have exactly 4 options
- Questions should cover the most important concepts in the document
- Explanations should be concise but educational

You MUST respond with ONLY valid JSON in this exact structure, no other text:
{{
  "title": "Quiz title based on the document topic",
  "questions": [
    {{
      "question": "The question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "explanation": "Brief explanation of why this is correct"
    }}
  ]
}}"#
    )
}

pub(crate) fn quiz_prompt_for_context(
    context: &str,
    num_questions: u32,
    difficulty: Difficulty,
) -> String {
    format!(
        r#"You are an expert educator. Based on the following content, generate a quiz.

Content:
{context}

Requirements:
- Generate exactly {num_questions} multiple-choice questions
- Difficulty: {difficulty}
- Each question has exactly 4 options
- Cover the most important concepts

You MUST respond with ONLY valid JSON in this exact structure, no other text:
{{
  "title": "Quiz title",
  "questions": [
    {{
      "question": "The question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "explanation": "Brief explanation"
    }}
  ]
}}"#
    )
}
