// src/ai/openrouter.rs
//
// OpenRouter chat-completions client. Documents travel as base64 data URLs
// in a file content part, with the file-parser plugin extracting PDF text
// on the OpenRouter side.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

use super::{
    AiError, AiProvider, GenerateQuizParams, GeneratedQuiz, QuizSource, parse_quiz_response,
    quiz_prompt_for_context, quiz_prompt_for_document,
};

const PROVIDER: &str = "OpenRouter";
const BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const APP_TITLE: &str = "LearnAnything";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugins: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    File { file: FilePayload },
}

#[derive(Serialize)]
struct FilePayload {
    filename: String,
    file_data: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterProvider {
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

    async fn call(
        &self,
        messages: Vec<ChatMessage>,
        plugins: Option<serde_json::Value>,
    ) -> Result<String, AiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AiError::MissingApiKey { provider: PROVIDER })?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            plugins,
        };

        tracing::debug!("Calling OpenRouter with model {}", self.model);

        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(api_key)
            .header("X-Title", APP_TITLE)
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

        let payload: ChatResponse = response.json().await.map_err(|e| AiError::Request {
            provider: PROVIDER,
            source: e,
        })?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AiError::EmptyResponse { provider: PROVIDER })
    }
}

#[async_trait]
impl AiProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn generate_quiz(&self, params: GenerateQuizParams) -> Result<GeneratedQuiz, AiError> {
        let (messages, plugins) = match params.source {
            QuizSource::Document {
                bytes,
                media_type,
                filename,
            } => {
                let prompt = quiz_prompt_for_document(params.num_questions, params.difficulty);
                let data_url = format!("data:{};base64,{}", media_type, BASE64.encode(&bytes));
                let messages = vec![ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text { text: prompt },
                        ContentPart::File {
                            file: FilePayload {
                                filename,
                                file_data: data_url,
                            },
                        },
                    ]),
                }];
                let plugins = serde_json::json!([
                    { "id": "file-parser", "pdf": { "engine": "pdf-text" } }
                ]);
                (messages, Some(plugins))
            }
            QuizSource::Text(context) => {
                let prompt =
                    quiz_prompt_for_context(&context, params.num_questions, params.difficulty);
                let messages = vec![ChatMessage {
                    role: "user",
                    content: MessageContent::Text(prompt),
                }];
                (messages, None)
            }
        };

        let text = self.call(messages, plugins).await?;
        parse_quiz_response(&text)
    }
}
