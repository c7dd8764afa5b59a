/// LLM Client — the single point of entry for all chat-completion calls.
///
/// No other module may call the provider API directly; the screening pipeline
/// talks to `dyn ChatModel` so it can be driven by a scripted model in tests.
///
/// The response handed back is deliberately loose (`serde_json::Value`): the
/// screening extractors are written to cope with whatever shape comes back.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A named JSON Schema the reply is asked to conform to.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

/// One invocation: model id, role-tagged turns, optional structured format hint.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: Option<ResponseSchema>,
}

/// The invocation seam. Implementations return an implementation-defined
/// response object; callers must not assume a fixed shape.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, request: &ChatRequest) -> Result<Value, LlmError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn invoke(&self, request: &ChatRequest) -> Result<Value, LlmError> {
        let response_format = request.response_format.as_ref().map(|f| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": f.name,
                    "strict": false,
                    "schema": f.schema,
                }
            })
        });

        let body = CompletionRequest {
            model: &request.model,
            temperature: 0.0,
            messages: &request.messages,
            response_format,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)?;

        debug!(
            "LLM call succeeded: model={}, chars={}",
            request.model,
            content.len()
        );

        Ok(build_response_object(
            content,
            request.response_format.is_some(),
            completion.model,
            completion.usage,
        ))
    }
}

/// Wraps a completion into the agent-style response object the screening
/// extractors consume. `structured_response` is only set when a schema was
/// requested and the reply is strict JSON.
fn build_response_object(
    content: String,
    structured_requested: bool,
    model: Option<String>,
    usage: Option<Value>,
) -> Value {
    let mut response = json!({
        "messages": [{ "role": "assistant", "content": content }],
    });
    if structured_requested {
        if let Ok(parsed) = serde_json::from_str::<Value>(&content) {
            response["structured_response"] = parsed;
        }
    }
    if let Some(model) = model {
        response["model"] = Value::String(model);
    }
    if let Some(usage) = usage {
        response["usage"] = usage;
    }
    response
}
