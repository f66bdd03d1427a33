//! Client for the chat-completions LLM endpoint.
//!
//! One POST per call: `{model, messages, temperature, max_tokens}` against
//! `{base_url}/chat/completions` with bearer auth. The response's first
//! choice carries the generated text. Plan generation is the single
//! long-running call in the system and gets an extended timeout budget.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default per-request budget for short calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
/// Total budget for meal plan generation.
pub const PLAN_TIMEOUT: Duration = Duration::from_secs(240);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("invalid API key (HTTP 401)")]
    InvalidApiKey,

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("upstream failure (HTTP {0})")]
    Upstream(u16),

    #[error("unexpected status {0}: {1}")]
    Api(u16, String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Settings for the chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
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
    content: String,
}

pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Send a system + user message pair and return the first choice's text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, "Sending chat-completions request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        match status.as_u16() {
            200 => {
                let parsed: ChatResponse = serde_json::from_str(&body)
                    .map_err(|e| LlmError::Parse(e.to_string()))?;
                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| LlmError::Parse("response contains no choices".to_string()))?;
                info!("Chat-completions request succeeded");
                Ok(content)
            }
            401 => Err(LlmError::InvalidApiKey),
            429 => Err(LlmError::RateLimited),
            s if s >= 500 => Err(LlmError::Upstream(s)),
            s => Err(LlmError::Api(s, body)),
        }
    }

    /// Opening question for the training interview, LLM-generated with a
    /// fixed fallback so the interview never stalls on an LLM outage.
    pub async fn training_question(&self) -> String {
        self.interview_opener(
            "Generate a short friendly question asking how many training sessions per \
             week the athlete does. Ask them to answer with a number.",
            "💪 Tell me about your training. How many sessions per week do you do \
             (enter a number)?",
        )
        .await
    }

    /// Opening question for the activity sub-chain, same fallback scheme.
    pub async fn activity_question(&self) -> String {
        self.interview_opener(
            "Generate a short friendly question asking how many steps per day the \
             athlete walks. Ask them to answer with a number.",
            "🚶 How many steps per day do you take (enter a number)?",
        )
        .await
    }

    async fn interview_opener(&self, instruction: &str, fallback: &str) -> String {
        let result = self
            .complete(
                "You are an AI nutrition coach helping athletes prepare for competitions. \
                 Ask one natural, friendly question.",
                instruction,
                REQUEST_TIMEOUT,
            )
            .await;

        match result {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Falling back to the fixed interview question");
                fallback.to_string()
            }
        }
    }
}

/// Extract the JSON payload from an LLM response.
///
/// Precedence: ```json fenced block, then any fenced block, then a greedy
/// first-`{`-to-last-`}` scan, then the whole trimmed text. The caller's
/// deserializer decides whether the candidate is actually valid JSON.
pub fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        let start = start + "```json".len();
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        // Skip a language identifier on the fence line if present.
        let content_start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_fenced_json_block() {
        let input = "Here is your plan:\n```json\n{\"total_calories\": 2000}\n```\nEnjoy!";
        assert_eq!(extract_json(input), "{\"total_calories\": 2000}");
    }

    #[test]
    fn test_extract_json_plain_fence() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(input), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_fence_with_language_tag() {
        let input = "```javascript\n{\"a\": 1}\n```";
        assert_eq!(extract_json(input), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_brace_scan() {
        let input = "The plan is {\"a\": {\"b\": 2}} as requested.";
        assert_eq!(extract_json(input), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_extract_json_whole_text_fallback() {
        let input = "  no json here  ";
        assert_eq!(extract_json(input), "no json here");
    }

    #[test]
    fn test_extract_json_prefers_fence_over_braces() {
        let input = "ignore {\"x\": 1} this\n```json\n{\"y\": 2}\n```";
        assert_eq!(extract_json(input), "{\"y\": 2}");
    }

    #[test]
    fn test_client_rejects_empty_api_key() {
        let config = LlmConfig {
            api_key: String::new(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        };
        assert!(matches!(
            LlmClient::new(config),
            Err(LlmError::MissingApiKey)
        ));
    }
}
