use super::{Brain, render_history, system_prompt};
use crate::core::action::Action;
use crate::core::ledger::{LedgerEntry, latest_context};
use crate::error::BrainError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-backed brain: one structured-output chat completion per turn.
///
/// Owns its client and credential explicitly — built once at bootstrap and
/// passed down, never a process-global. Every failure mode (missing key,
/// transport, malformed response) degrades to an `error` action.
pub struct OpenAiBrain {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    client: Client,
    base_url: String,
    model: String,
    history_window: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
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
    content: Option<String>,
}

/// The strict-mode shape the model is asked to produce. Tool arguments ride
/// inside `payload_str` as a JSON string; `Action::parse` does the rest.
#[derive(Debug, Deserialize)]
struct RawAction {
    thought: String,
    tool_name: String,
    payload_str: String,
}

impl OpenAiBrain {
    pub fn new(api_key: Option<&str>, model: &str, history_window: usize) -> Self {
        Self {
            cached_auth_header: api_key.map(|key| format!("Bearer {key}")),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            history_window,
        }
    }

    /// Point at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn response_schema() -> Value {
        serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": "action",
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "thought": {
                            "type": "string",
                            "description": "Internal reasoning: why am I taking this action?"
                        },
                        "tool_name": {
                            "type": "string",
                            "description": "Exact name of the tool to execute."
                        },
                        "payload_str": {
                            "type": "string",
                            "description": "Tool arguments as a valid JSON string."
                        }
                    },
                    "required": ["thought", "tool_name", "payload_str"],
                    "additionalProperties": false
                }
            }
        })
    }

    fn build_request(&self, history: &[LedgerEntry]) -> ChatRequest {
        let (state, memory) = latest_context(history);
        let rendered = render_history(history, self.history_window);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt(state, &memory),
                },
                Message {
                    role: "user",
                    content: format!("History:\n{rendered}\n\nNext step?"),
                },
            ],
            response_format: Self::response_schema(),
        }
    }

    async fn request_action(&self, history: &[LedgerEntry]) -> Result<Action, BrainError> {
        let auth_header = self
            .cached_auth_header
            .as_deref()
            .ok_or(BrainError::MissingApiKey)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", auth_header)
            .json(&self.build_request(history))
            .send()
            .await
            .map_err(|error| BrainError::Backend(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrainError::Backend(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| BrainError::Response(error.to_string()))?;

        let content = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| BrainError::Response("no content in first choice".to_string()))?;

        let raw: RawAction = serde_json::from_str(content)
            .map_err(|error| BrainError::Response(error.to_string()))?;

        Ok(Action::parse(&raw.tool_name, &raw.payload_str, &raw.thought))
    }
}

#[async_trait]
impl Brain for OpenAiBrain {
    async fn decide(&self, history: &[LedgerEntry]) -> Action {
        match self.request_action(history).await {
            Ok(action) => action,
            Err(error) => {
                tracing::warn!(%error, "brain degraded to error action");
                Action::error(format!("LLM error: {error}"))
            }
        }
    }
}
