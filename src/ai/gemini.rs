// src/ai/gemini.rs
//
// Google Gemini generateContent client. Documents travel as inline base64
// data; JSON mode asks the model for an application/json response, and the
// shared extraction still strips any wrapper it adds anyway.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

use super::{
    AiError, AiProvider, GenerateQuizParams, GeneratedQuiz, QuizSource, parse_quiz_response,
    quiz_prompt_for_context, quiz_prompt_for_document,
};

const PROVIDER: &str = "Gemini";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline_data(mime_type: String, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type, data }),
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn call(&self, parts: Vec<GeminiPart>) -> Result<String, AiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AiError::MissingApiKey { provider: PROVIDER })?;

        let url = format!(
            "{}/{}:generateContent?key={}",
            BASE_URL, self.model, api_key
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent { parts }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        tracing::debug!("Calling Gemini with model {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Request {
                provider: PROVIDER,
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AiError::Http {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let payload: GeminiResponse = response.json().await.map_err(|e| AiError::Request {
            provider: PROVIDER,
            source: e,
        })?;

        payload
            .candidates
            .and_then(|mut candidates| {
                if candidates.is_empty() {
                    None
                } else {
                    candidates.swap_remove(0).content
                }
            })
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().find_map(|part| part.text))
            .filter(|text| !text.trim().is_empty())
            .ok_or(AiError::EmptyResponse { provider: PROVIDER })
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate_quiz(&self, params: GenerateQuizParams) -> Result<GeneratedQuiz, AiError> {
        let parts = match params.source {
            QuizSource::Document {
                bytes, media_type, ..
            } => vec![
                GeminiPart::inline_data(media_type, BASE64.encode(&bytes)),
                GeminiPart::text(quiz_prompt_for_document(
                    params.num_questions,
                    params.difficulty,
                )),
            ],
            QuizSource::Text(context) => vec![GeminiPart::text(quiz_prompt_for_context(
                &context,
                params.num_questions,
                params.difficulty,
            ))],
        };

        let text = self.call(parts).await?;
        parse_quiz_response(&text)
    }
}
