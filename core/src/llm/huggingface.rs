use super::{GenerationRequest, LanguageModelProvider, LlmProviderKind, ModelSelection, ProviderError};
use crate::config::ProviderSettings;
use crate::transcript::MessageRole;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const PROVIDER: LlmProviderKind = LlmProviderKind::HuggingFace;

#[derive(Debug, Serialize)]
struct CompletionRequest {
    inputs: String,
    parameters: CompletionParameters,
}

#[derive(Debug, Serialize)]
struct CompletionParameters {
    max_length: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generated {
    generated_text: String,
}

/// The inference API answers with a list for text-generation models and a bare
/// object for some conversational ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionResponse {
    Batch(Vec<Generated>),
    Single(Generated),
}

/// Free-text completion adapter for hosted inference models.
pub struct HuggingFaceAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    models: ModelSelection,
    timeout: Duration,
}

impl HuggingFaceAdapter {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            models: settings.models.clone(),
            timeout,
        })
    }

    pub fn endpoint_for(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }
}

/// Flattens the conversation into a single prompt ending with an open assistant turn.
fn completion_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!("{}\n\n=== CONVERSATION ===\n\n", request.system_prompt);
    for message in &request.history {
        let speaker = match message.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        };
        prompt.push_str(&format!("{speaker}: {}\n", message.content));
    }
    prompt.push_str(&format!("User: {}\n", request.user_message));
    prompt.push_str("Assistant: ");
    prompt
}

fn completion_body(request: &GenerationRequest) -> CompletionRequest {
    CompletionRequest {
        inputs: completion_prompt(request),
        parameters: CompletionParameters {
            max_length: request.params.max_output_tokens,
            temperature: request.params.temperature,
            return_full_text: false,
        },
    }
}

#[async_trait]
impl LanguageModelProvider for HuggingFaceAdapter {
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
            .post(self.endpoint_for(&request.model))
            .bearer_auth(api_key)
            .json(&completion_body(request))
            .send()
            .await
            .map_err(|err| ProviderError::from_transport(PROVIDER, &err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(target: "huggingface::inference", "API error status={} body={}", status, body);
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), body));
        }

        let body_text = response
            .text()
            .await
            .map_err(|err| ProviderError::from_transport(PROVIDER, &err, self.timeout))?;
        let parsed: CompletionResponse = serde_json::from_str(&body_text).map_err(|e| {
            error!(
                target: "huggingface::inference",
                "Failed to parse response: {} body={}", e, body_text
            );
            ProviderError::ResponseParsing {
                provider: PROVIDER,
                details: e.to_string(),
            }
        })?;

        match parsed {
            CompletionResponse::Single(generated) => Ok(generated.generated_text),
            CompletionResponse::Batch(batch) => batch
                .into_iter()
                .next()
                .map(|generated| generated.generated_text)
                .ok_or_else(|| ProviderError::ResponseParsing {
                    provider: PROVIDER,
                    details: "empty generation list".to_string(),
                }),
        }
    }
}
