use crate::config::AiRuntimeSettings;
use crate::knowledge::KnowledgeEntry;
use crate::llm::{BackendDispatcher, DispatchOutcome, LlmProviderKind};
use crate::store::ProjectStore;
use crate::transcript::{ChatMessage, MessageRole, TranscriptSummary};
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Every session starts with this project selected.
pub const DEFAULT_PROJECT: &str = "General Questions";

/// Session context shared by the front-ends. Cloning is cheap and clones see
/// the same projects.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<InnerState>>,
    dispatcher: BackendDispatcher,
}

struct InnerState {
    projects: ProjectStore,
    provider: LlmProviderKind,
    model_overrides: HashMap<LlmProviderKind, String>,
}

impl AppState {
    pub fn new(dispatcher: BackendDispatcher, provider: LlmProviderKind) -> Self {
        let mut projects = ProjectStore::new();
        projects.create(DEFAULT_PROJECT);
        Self {
            inner: Arc::new(RwLock::new(InnerState {
                projects,
                provider,
                model_overrides: HashMap::new(),
            })),
            dispatcher,
        }
    }

    pub fn from_settings(settings: &AiRuntimeSettings) -> Result<Self> {
        let dispatcher = BackendDispatcher::from_settings(settings)?;
        Ok(Self::new(dispatcher, settings.provider))
    }

    pub fn dispatcher(&self) -> &BackendDispatcher {
        &self.dispatcher
    }

    pub fn provider(&self) -> LlmProviderKind {
        self.inner.read().provider
    }

    pub fn set_provider(&self, provider: LlmProviderKind) {
        let mut inner = self.inner.write();
        if inner.provider != provider {
            info!(from = inner.provider.id(), to = provider.id(), "switching provider");
            inner.provider = provider;
        }
    }

    /// Model the next message to `kind` will use: the override if one is set,
    /// otherwise the adapter's model for the active project's mode.
    pub fn model_for(&self, kind: LlmProviderKind) -> String {
        let inner = self.inner.read();
        if let Some(model) = inner.model_overrides.get(&kind) {
            return model.clone();
        }
        let research_mode = inner
            .projects
            .active()
            .is_some_and(|transcript| transcript.research_mode());
        self.dispatcher.adapter(kind).model_for(research_mode)
    }

    pub fn current_model(&self) -> String {
        self.model_for(self.provider())
    }

    /// Pins `kind` to `model` until reset or until research mode is toggled.
    /// Returns false for a blank model id.
    pub fn set_model(&self, kind: LlmProviderKind, model: &str) -> bool {
        let model = model.trim();
        if model.is_empty() {
            return false;
        }
        info!(provider = kind.id(), model, "model selected");
        self.inner
            .write()
            .model_overrides
            .insert(kind, model.to_string());
        true
    }

    pub fn reset_model(&self, kind: LlmProviderKind) {
        self.inner.write().model_overrides.remove(&kind);
    }

    /// Trims `name` before registering it. Returns false for blank or taken names.
    pub fn create_project(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.inner.write().projects.create(name)
    }

    pub fn delete_project(&self, name: &str) -> bool {
        self.inner.write().projects.delete(name)
    }

    pub fn switch_project(&self, name: &str) -> bool {
        self.inner.write().projects.switch_to(name)
    }

    pub fn project_names(&self) -> Vec<String> {
        self.inner.read().projects.names()
    }

    pub fn project_summaries(&self) -> Vec<TranscriptSummary> {
        self.inner.read().projects.summaries()
    }

    pub fn project_count(&self) -> usize {
        self.inner.read().projects.count()
    }

    pub fn active_project_name(&self) -> Option<String> {
        self.inner.read().projects.active_name().map(str::to_string)
    }

    pub fn active_summary(&self) -> Option<TranscriptSummary> {
        self.inner.read().projects.active().map(|t| t.summary())
    }

    pub fn active_messages(&self) -> Vec<ChatMessage> {
        self.inner
            .read()
            .projects
            .active()
            .map(|t| t.messages())
            .unwrap_or_default()
    }

    /// Empties the active transcript. Returns false when nothing is active.
    pub fn clear_active(&self) -> bool {
        match self.inner.write().projects.active_mut() {
            Some(transcript) => {
                transcript.clear();
                true
            }
            None => false,
        }
    }

    /// Flips research mode on the active project and returns the new value.
    /// The selected provider drops any model override so the mode's default
    /// model applies.
    pub fn toggle_research_mode(&self) -> Option<bool> {
        let mut inner = self.inner.write();
        let transcript = inner.projects.active_mut()?;
        transcript.toggle_research_mode();
        let research_mode = transcript.research_mode();
        let provider = inner.provider;
        inner.model_overrides.remove(&provider);
        Some(research_mode)
    }

    pub fn search_knowledge(&self, term: &str) -> Vec<KnowledgeEntry> {
        self.dispatcher.knowledge().search(term)
    }

    /// Runs `f` with exclusive access to the project registry.
    pub fn with_projects<R>(&self, f: impl FnOnce(&mut ProjectStore) -> R) -> R {
        f(&mut self.inner.write().projects)
    }

    /// Appends the message to the active project, asks the selected provider and
    /// records the reply (or the failure text) as an assistant message.
    /// The forwarded history already ends with the new user turn.
    pub async fn send_user_message(&self, content: &str) -> DispatchOutcome {
        if content.trim().is_empty() {
            return DispatchOutcome::failure("Please enter a message.");
        }

        let (project, provider, model, history, research_mode) = {
            let mut inner = self.inner.write();
            let provider = inner.provider;
            let model = inner.model_overrides.get(&provider).cloned();
            let Some(transcript) = inner.projects.active_mut() else {
                warn!("message sent with no active project");
                return DispatchOutcome::failure(
                    "No active project. Create one with /new <name> first.",
                );
            };
            transcript.add_message(MessageRole::User, content);
            (
                transcript.name().to_string(),
                provider,
                model,
                transcript.messages(),
                transcript.research_mode(),
            )
        };

        let outcome = self
            .dispatcher
            .dispatch_with_model(provider, model.as_deref(), content, &history, research_mode)
            .await;

        // The project may have been deleted while the request was in flight.
        match self.inner.write().projects.get_mut(&project) {
            Some(transcript) => {
                transcript.add_message(MessageRole::Assistant, outcome.response.clone())
            }
            None => warn!(%project, "project removed before the reply arrived"),
        }
        outcome
    }
}
