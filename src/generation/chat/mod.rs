// Chat completion client
// Answers, explanations and section titles, each degrading to fixed text on failure


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::prompt::build_explanation_prompt;
use crate::config::{ApiKey, Config};
use crate::http::{HttpClient, endpoint};
use crate::retrieval::truncate_chars;

pub const ANSWER_FALLBACK: &str = "I'm sorry, I couldn't generate an answer right now.";
const SYSTEM_PROMPT: &str = "You are a knowledgeable AI assistant.";
const TITLE_PROMPT: &str =
    "Summarize this content into a short, descriptive title (5-10 words max).";
const TITLE_TEMPERATURE: f32 = 0.3;
const TITLE_MAX_TOKENS: u32 = 20;
const TITLE_FALLBACK_CHARS: usize = 80;

/// Generated text, or the stand-in used when the service could not produce it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Completed(String),
    Fallback { text: String, reason: String },
}

impl Generated {
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            Self::Completed(text) | Self::Fallback { text, .. } => text,
        }
    }

    #[inline]
    pub fn into_text(self) -> String {
        match self {
            Self::Completed(text) | Self::Fallback { text, .. } => text,
        }
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: Url,
    model: String,
    temperature: f32,
    max_tokens: u32,
    explanation_temperature: f32,
    explanation_max_tokens: u32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    #[inline]
    pub fn new(config: &Config, api_key: ApiKey) -> Result<Self> {
        let endpoint = endpoint(&config.api.base_url, "chat/completions")
            .context("Failed to generate chat completions URL from config")?;

        Ok(Self {
            endpoint,
            model: config.chat.model.clone(),
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
            explanation_temperature: config.chat.explanation_temperature,
            explanation_max_tokens: config.chat.explanation_max_tokens,
            http: HttpClient::new(api_key, config.timeout()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http = self.http.with_retry_attempts(attempts);
        self
    }

    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.http = self.http.with_backoff(backoff);
        self
    }

    /// Override the sampling settings used for answers
    #[inline]
    pub fn with_answer_settings(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as the user message and return the trimmed reply
    #[inline]
    pub fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        self.chat(SYSTEM_PROMPT, prompt, temperature, max_tokens)
    }

    #[inline]
    pub fn generate_answer(&self, prompt: &str) -> Generated {
        match self.complete(prompt, self.temperature, self.max_tokens) {
            Ok(answer) => Generated::Completed(answer),
            Err(e) => {
                warn!("Answer generation failed: {:#}", e);
                Generated::Fallback {
                    text: ANSWER_FALLBACK.to_string(),
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// Explain why `answer` follows from the prompt it was generated from
    #[inline]
    pub fn explain_answer(&self, answer: &str, prompt: &str) -> Generated {
        let explanation_prompt = build_explanation_prompt(answer, prompt);
        match self.complete(
            &explanation_prompt,
            self.explanation_temperature,
            self.explanation_max_tokens,
        ) {
            Ok(explanation) => Generated::Completed(explanation),
            Err(e) => {
                warn!("Explanation generation failed: {:#}", e);
                Generated::Fallback {
                    text: ANSWER_FALLBACK.to_string(),
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// A short title for a section of an uploaded document
    #[inline]
    pub fn generate_section_title(&self, text: &str) -> Generated {
        match self.chat(TITLE_PROMPT, text, TITLE_TEMPERATURE, TITLE_MAX_TOKENS) {
            Ok(title) => Generated::Completed(title),
            Err(e) => {
                warn!("Section title generation failed: {:#}", e);
                Generated::Fallback {
                    text: fallback_title(text),
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    fn chat(&self, system: &str, user: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        debug!(
            "Requesting chat completion from {} (prompt length: {})",
            self.model,
            user.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        let response_text = self
            .http
            .post_json(&self.endpoint, &request_json)
            .context("Failed to request chat completion")?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("Chat response contained no message"))
    }
}

/// The first 80 characters of `text` followed by `...`
#[inline]
pub fn fallback_title(text: &str) -> String {
    format!("{}...", truncate_chars(text, TITLE_FALLBACK_CHARS))
}
