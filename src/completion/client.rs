// SPDX-License-Identifier: MIT
// Suggestion client — one-shot call to the Sonar chat-completions API.
//
// Stateless apart from the pooled HTTP client: (context, language, mode) in,
// raw model text out. Timeouts are enforced here per operating profile, not
// by the coordinator. Every failure maps onto the small ClientError taxonomy
// and is downgraded to "no suggestion" by the provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::CURSOR_SENTINEL;
use super::model::{CompletionMode, ModelReply};
use crate::config::SonarModel;

/// Perplexity chat-completions endpoint.
pub const SONAR_API_URL: &str = "https://api.perplexity.ai/chat/completions";

const INLINE_SYSTEM_PROMPT: &str = "You are an inline code completion engine. \
    Continue the code exactly at the <|cursor|> marker. Output only code: no prose, \
    no explanations, no markdown fences, no reasoning markup.";

const PROMPT_SYSTEM_PROMPT: &str = "You are a code generation engine. Write the code \
    the task describes, matching the style of the surrounding file. Output only code: \
    no prose, no explanations, no markdown fences, no reasoning markup.";

/// Failure taxonomy for one completion attempt. None of these surface to the
/// user as hard errors; `ConfigMissing` additionally suppresses requests.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no API key configured or completions disabled")]
    ConfigMissing,
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("response contained no usable content")]
    InvalidResponse,
}

/// Everything the backend needs for one fetch. Owned, so a request survives
/// config changes made while it is in flight.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub api_key: String,
    pub model: SonarModel,
    pub context: String,
    pub language: String,
    pub mode: CompletionMode,
    /// Prompt-mode user intent extracted from the trigger comment.
    pub intent: Option<String>,
    /// Prompt-mode file metadata.
    pub file_name: Option<String>,
}

/// Seam between the provider and the completion service. Tests substitute a
/// mock; production uses `SuggestionClient`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn fetch(&self, req: &BackendRequest) -> Result<ModelReply, ClientError>;
}

// ─── Operating profiles ───────────────────────────────────────────────────────

/// Token budget, sampling temperature, and deadline for one mode.
#[derive(Debug, Clone, Copy)]
struct RequestProfile {
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl RequestProfile {
    fn for_mode(mode: CompletionMode) -> Self {
        match mode {
            // Short budget, low randomness, tight deadline.
            CompletionMode::Inline => Self {
                max_tokens: 128,
                temperature: 0.1,
                timeout: Duration::from_secs(10),
            },
            // Larger budget for whole blocks; longer deadline.
            CompletionMode::PromptGenerated => Self {
                max_tokens: 1024,
                temperature: 0.2,
                timeout: Duration::from_secs(15),
            },
        }
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// HTTP client for the Sonar API.
pub struct SuggestionClient {
    http: reqwest::Client,
    base_url: String,
}

impl SuggestionClient {
    pub fn new() -> Self {
        Self::with_base_url(SONAR_API_URL)
    }

    /// Point the client at a different endpoint (self-hosted gateways).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // No global timeout on the pooled client; each request carries the
        // deadline of its mode's profile.
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for SuggestionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for SuggestionClient {
    async fn fetch(&self, req: &BackendRequest) -> Result<ModelReply, ClientError> {
        if req.api_key.is_empty() {
            return Err(ClientError::ConfigMissing);
        }

        let profile = RequestProfile::for_mode(req.mode);
        let body = ChatRequest {
            model: req.model.as_str(),
            messages: build_messages(req),
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
            stream: false,
        };

        let started = Instant::now();
        let resp = self
            .http
            .post(&self.base_url)
            .bearer_auth(&req.api_key)
            .timeout(profile.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(profile.timeout)
                } else {
                    ClientError::Network(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "server returned {}",
                resp.status()
            )));
        }

        let reply: ChatResponse = resp.json().await.map_err(|_| ClientError::InvalidResponse)?;
        let latency = started.elapsed();

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClientError::InvalidResponse)?;

        debug!(
            model = %req.model.as_str(),
            mode = %req.mode.as_str(),
            latency_ms = latency.as_millis() as u64,
            "completion received"
        );

        Ok(ModelReply {
            raw_text: content,
            model_name: reply
                .model
                .unwrap_or_else(|| req.model.as_str().to_string()),
            latency,
        })
    }
}

/// Role-structured prompt: a system instruction fixing output discipline and
/// a user instruction embedding the sentinel-marked context (plus intent and
/// file metadata in prompt mode).
fn build_messages(req: &BackendRequest) -> Vec<ChatMessage> {
    match req.mode {
        CompletionMode::Inline => vec![
            ChatMessage {
                role: "system",
                content: INLINE_SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!(
                    "Complete the {} code at the {CURSOR_SENTINEL} marker:\n\n{}",
                    req.language, req.context
                ),
            },
        ],
        CompletionMode::PromptGenerated => {
            let intent = req.intent.as_deref().unwrap_or("complete the code");
            let file = req.file_name.as_deref().unwrap_or("untitled");
            vec![
                ChatMessage {
                    role: "system",
                    content: PROMPT_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Task: {intent}\nFile: {file} ({})\n\nSurrounding code:\n{}",
                        req.language, req.context
                    ),
                },
            ]
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: CompletionMode) -> BackendRequest {
        BackendRequest {
            api_key: "pplx-test".to_string(),
            model: SonarModel::Sonar,
            context: format!("let x = {CURSOR_SENTINEL}"),
            language: "rust".to_string(),
            mode,
            intent: Some("sum two numbers".to_string()),
            file_name: Some("math.rs".to_string()),
        }
    }

    #[test]
    fn inline_profile_is_tight() {
        let p = RequestProfile::for_mode(CompletionMode::Inline);
        assert_eq!(p.max_tokens, 128);
        assert_eq!(p.timeout, Duration::from_secs(10));
    }

    #[test]
    fn prompt_profile_is_roomier() {
        let p = RequestProfile::for_mode(CompletionMode::PromptGenerated);
        assert_eq!(p.max_tokens, 1024);
        assert_eq!(p.timeout, Duration::from_secs(15));
    }

    #[test]
    fn inline_messages_embed_context() {
        let msgs = build_messages(&request(CompletionMode::Inline));
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains("Output only code"));
        assert!(msgs[1].content.contains(CURSOR_SENTINEL));
    }

    #[test]
    fn prompt_messages_embed_intent_and_file() {
        let msgs = build_messages(&request(CompletionMode::PromptGenerated));
        assert!(msgs[1].content.contains("Task: sum two numbers"));
        assert!(msgs[1].content.contains("math.rs"));
        assert!(msgs[1].content.contains("(rust)"));
    }

    #[test]
    fn chat_request_serializes_expected_shape() {
        let body = ChatRequest {
            model: "sonar",
            messages: build_messages(&request(CompletionMode::Inline)),
            max_tokens: 128,
            temperature: 0.1,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "sonar");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn chat_response_parses_choices() {
        let raw = r#"{"model":"sonar","choices":[{"message":{"content":"return a + b;"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            resp.choices[0].message.content.as_deref(),
            Some("return a + b;")
        );
    }

    #[test]
    fn chat_response_tolerates_missing_content() {
        let raw = r#"{"choices":[{"message":{}}]}"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.choices[0].message.content.is_none());
    }
}
