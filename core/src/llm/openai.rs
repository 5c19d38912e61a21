use super::{GenerationRequest, LanguageModelProvider, LlmProviderKind, ModelSelection, ProviderError};
use crate::config::ProviderSettings;
use crate::transcript::MessageRole;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const PROVIDER: LlmProviderKind = LlmProviderKind::OpenAi;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Structured chat adapter speaking the `/chat/completions` protocol.
pub struct OpenAiChatAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    models: ModelSelection,
    timeout: Duration,
}

impl OpenAiChatAdapter {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            models: settings.models.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn chat_body(request: &GenerationRequest) -> ChatCompletionRequest<'_> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(WireMessage {
        role: "system",
        content: &request.system_prompt,
    });
    messages.extend(request.history.iter().map(|message| WireMessage {
        role: match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        },
        content: &message.content,
    }));
    messages.push(WireMessage {
        role: "user",
        content: &request.user_message,
    });
    ChatCompletionRequest {
        model: &request.model,
        messages,
        temperature: request.params.temperature,
        max_tokens: request.params.max_output_tokens,
    }
}

#[async_trait]
impl LanguageModelProvider for OpenAiChatAdapter {
    fn kind(&self) -> LlmProviderKind {
        PROVIDER
    }

    fn model_for(&self, research_mode: bool) -> String {
        self.models.for_mode(research_mode).to_string()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential { provider: PROVIDER })?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&chat_body(request))
            .send()
            .await
            .map_err(|err| ProviderError::from_transport(PROVIDER, &err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(target: "openai::chat", "API error status={} body={}", status, body);
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), body));
        }

        let body_text = response
            .text()
            .await
            .map_err(|err| ProviderError::from_transport(PROVIDER, &err, self.timeout))?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body_text).map_err(|e| {
            error!(target: "openai::chat", "Failed to parse response: {} body={}", e, body_text);
            ProviderError::ResponseParsing {
                provider: PROVIDER,
                details: e.to_string(),
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ResponseParsing {
                provider: PROVIDER,
                details: "no choices in response".to_string(),
            })
    }
}
