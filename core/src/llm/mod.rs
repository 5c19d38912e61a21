mod error;
mod huggingface;
mod openai;

pub use error::{ErrorKind, ProviderError};
pub use huggingface::HuggingFaceAdapter;
pub use openai::OpenAiChatAdapter;

use crate::config::AiRuntimeSettings;
use crate::knowledge::{KnowledgeBase, StaticKnowledgeBase};
use crate::transcript::ChatMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Only this many trailing history messages are forwarded to a provider.
pub const MAX_CONTEXT_MESSAGES: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const RESEARCH_MODE_INSTRUCTIONS: &str = "
You are working in DEEP RESEARCH MODE. For every question:

1. Work step by step. Restate what is really being asked and split it into parts.
2. Analyse thoroughly. Explain why a recommendation holds and weigh alternatives,
   including trade-offs and edge cases.
3. Take several perspectives: a beginner-friendly explanation, the technical detail
   an advanced user needs, and a practical real-world example.
4. Be complete. Include commented code or query examples and point to related topics.
5. Be careful. Double-check technical details and state limitations and caveats.
";

const NORMAL_MODE_INSTRUCTIONS: &str = "
You are an expert Obsidian assistant. Give clear, concise and practical answers.
Stay accurate and keep responses reasonably brief. Include code examples when they
help, but keep explanations focused.
";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LlmProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "huggingface", alias = "hugging_face")]
    HuggingFace,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown provider `{0}` (expected `openai` or `huggingface`)")]
pub struct UnknownProvider(pub String);

impl LlmProviderKind {
    pub const ALL: [LlmProviderKind; 2] = [Self::OpenAi, Self::HuggingFace];

    pub fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::HuggingFace => "huggingface",
        }
    }

    pub fn credential_variable(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::HuggingFace => "HF_API_KEY",
        }
    }

    /// Models offered by the model picker, cheapest first.
    pub fn suggested_models(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["gpt-3.5-turbo", "gpt-4o-mini", "gpt-4"],
            Self::HuggingFace => &[
                "microsoft/DialoGPT-medium",
                "gpt2",
                "meta-llama/Llama-2-7b-chat-hf",
            ],
        }
    }

    pub fn billing_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://platform.openai.com/account/billing",
            Self::HuggingFace => "https://huggingface.co/settings/billing",
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("OpenAI"),
            Self::HuggingFace => f.write_str("Hugging Face"),
        }
    }
}

impl FromStr for LlmProviderKind {
    type Err = UnknownProvider;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" | "open-ai" => Ok(Self::OpenAi),
            "huggingface" | "hugging_face" | "hugging-face" | "hf" => Ok(Self::HuggingFace),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

/// Model identifiers for normal and research mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub normal: String,
    pub research: String,
}

impl ModelSelection {
    pub fn defaults_for(kind: LlmProviderKind) -> Self {
        let (normal, research) = match kind {
            LlmProviderKind::OpenAi => ("gpt-3.5-turbo", "gpt-4"),
            LlmProviderKind::HuggingFace => {
                ("microsoft/DialoGPT-medium", "meta-llama/Llama-2-7b-chat-hf")
            }
        };
        Self {
            normal: normal.to_string(),
            research: research.to_string(),
        }
    }

    pub fn for_mode(&self, research_mode: bool) -> &str {
        if research_mode {
            &self.research
        } else {
            &self.normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    /// Research mode trades sampling variability for longer output.
    pub fn for_request(kind: LlmProviderKind, research_mode: bool) -> Self {
        let max_output_tokens = match (kind, research_mode) {
            (LlmProviderKind::OpenAi, false) => 1000,
            (LlmProviderKind::OpenAi, true) => 2500,
            (LlmProviderKind::HuggingFace, false) => 500,
            (LlmProviderKind::HuggingFace, true) => 1500,
        };
        let temperature = if research_mode { 0.5 } else { 0.7 };
        Self {
            temperature,
            max_output_tokens,
        }
    }
}

/// Everything an adapter needs for one round trip, already truncated and composed.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub user_message: String,
    pub params: GenerationParams,
}

#[async_trait]
pub trait LanguageModelProvider: Send + Sync {
    fn kind(&self) -> LlmProviderKind;

    fn model_for(&self, research_mode: bool) -> String;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub response: String,
}

impl DispatchOutcome {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: response.into(),
        }
    }

    pub fn failure(response: impl Into<String>) -> Self {
        Self {
            success: false,
            response: response.into(),
        }
    }
}

/// Routes a message to one of the two provider adapters and normalizes the reply.
#[derive(Clone)]
pub struct BackendDispatcher {
    knowledge: Arc<dyn KnowledgeBase>,
    openai: Arc<dyn LanguageModelProvider>,
    huggingface: Arc<dyn LanguageModelProvider>,
}

impl BackendDispatcher {
    pub fn new(
        knowledge: Arc<dyn KnowledgeBase>,
        openai: Arc<dyn LanguageModelProvider>,
        huggingface: Arc<dyn LanguageModelProvider>,
    ) -> Self {
        Self {
            knowledge,
            openai,
            huggingface,
        }
    }

    pub fn from_settings(settings: &AiRuntimeSettings) -> Result<Self> {
        let knowledge: Arc<dyn KnowledgeBase> = match &settings.knowledge_path {
            Some(path) => Arc::new(StaticKnowledgeBase::load(path)?),
            None => Arc::new(StaticKnowledgeBase::builtin()),
        };
        let openai = OpenAiChatAdapter::new(
            settings.provider_settings(LlmProviderKind::OpenAi),
            settings.timeout,
        )
        .context("failed to build OpenAI client")?;
        let huggingface = HuggingFaceAdapter::new(
            settings.provider_settings(LlmProviderKind::HuggingFace),
            settings.timeout,
        )
        .context("failed to build Hugging Face client")?;
        Ok(Self::new(knowledge, Arc::new(openai), Arc::new(huggingface)))
    }

    /// Replaces the adapter registered for `adapter.kind()`.
    pub fn with_adapter(mut self, adapter: Arc<dyn LanguageModelProvider>) -> Self {
        match adapter.kind() {
            LlmProviderKind::OpenAi => self.openai = adapter,
            LlmProviderKind::HuggingFace => self.huggingface = adapter,
        }
        self
    }

    pub fn knowledge(&self) -> &Arc<dyn KnowledgeBase> {
        &self.knowledge
    }

    pub fn adapter(&self, kind: LlmProviderKind) -> &Arc<dyn LanguageModelProvider> {
        match kind {
            LlmProviderKind::OpenAi => &self.openai,
            LlmProviderKind::HuggingFace => &self.huggingface,
        }
    }

    pub fn system_prompt(&self, research_mode: bool) -> String {
        let methodology = if research_mode {
            RESEARCH_MODE_INSTRUCTIONS
        } else {
            NORMAL_MODE_INSTRUCTIONS
        };
        format!(
            "{}\n\n=== KNOWLEDGE BASE ===\n{}",
            methodology.trim(),
            self.knowledge.context_blob()
        )
    }

    /// `model` replaces the adapter's choice for `research_mode` when given.
    pub fn build_request(
        &self,
        provider: LlmProviderKind,
        model: Option<&str>,
        user_message: &str,
        history: &[ChatMessage],
        research_mode: bool,
    ) -> GenerationRequest {
        GenerationRequest {
            model: model
                .map(str::to_string)
                .unwrap_or_else(|| self.adapter(provider).model_for(research_mode)),
            system_prompt: self.system_prompt(research_mode),
            history: recent_history(history).to_vec(),
            user_message: user_message.to_string(),
            params: GenerationParams::for_request(provider, research_mode),
        }
    }

    /// One blocking-from-the-caller's-view round trip. Never fails: every error
    /// becomes a `success == false` outcome carrying the text to show.
    pub async fn dispatch(
        &self,
        provider: LlmProviderKind,
        user_message: &str,
        history: &[ChatMessage],
        research_mode: bool,
    ) -> DispatchOutcome {
        self.dispatch_with_model(provider, None, user_message, history, research_mode)
            .await
    }

    pub async fn dispatch_with_model(
        &self,
        provider: LlmProviderKind,
        model: Option<&str>,
        user_message: &str,
        history: &[ChatMessage],
        research_mode: bool,
    ) -> DispatchOutcome {
        let request = self.build_request(provider, model, user_message, history, research_mode);
        info!(
            provider = provider.id(),
            model = %request.model,
            research_mode,
            history = request.history.len(),
            "dispatching message"
        );
        match self.adapter(provider).generate(&request).await {
            Ok(text) => {
                let text = text.trim();
                debug!(provider = provider.id(), chars = text.len(), "provider replied");
                DispatchOutcome::success(text)
            }
            Err(err) => {
                warn!(provider = provider.id(), kind = ?err.kind(), %err, "dispatch failed");
                DispatchOutcome::failure(failure_message(&err))
            }
        }
    }
}

fn recent_history(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(MAX_CONTEXT_MESSAGES);
    &history[start..]
}

fn failure_message(err: &ProviderError) -> String {
    let provider = err.provider();
    match err.kind() {
        ErrorKind::MissingCredential => format!(
            "{provider} API key not found. Please set {} in tutor.yaml or the environment.",
            provider.credential_variable()
        ),
        ErrorKind::Timeout => {
            format!("Request timed out: {err}. The AI service might be overloaded. Please try again.")
        }
        ErrorKind::Authentication => format!(
            "Invalid {provider} API key. Please check {}.",
            provider.credential_variable()
        ),
        ErrorKind::Quota => format!(
            "{provider} API quota exceeded. Please check your billing at {}",
            provider.billing_url()
        ),
        ErrorKind::Generic => {
            format!("{provider} API error: {err}. The AI service might be busy. Try again in a moment.")
        }
    }
}
