use anyhow::{ensure, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tutor_core::llm::{GenerationRequest, LanguageModelProvider, ProviderError};
use tutor_core::{
    telemetry, AiRuntimeSettings, AppState, BackendDispatcher, LlmProviderKind, MessageRole,
};

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for the tutor workspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a session end to end against a canned provider.
    Smoke,
}

/// Echoes the request shape back instead of calling a real service.
struct CannedProvider(LlmProviderKind);

#[async_trait]
impl LanguageModelProvider for CannedProvider {
    fn kind(&self) -> LlmProviderKind {
        self.0
    }

    fn model_for(&self, research_mode: bool) -> String {
        if research_mode { "canned-research" } else { "canned" }.to_string()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        Ok(format!(
            "  {} heard `{}` with {} messages of history  ",
            self.0,
            request.user_message,
            request.history.len()
        ))
    }
}

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
    }
}

fn smoke_test() -> Result<()> {
    let runtime = Runtime::new()?;
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("tutor.yaml");
    fs::write(&config_path, "app:\n  provider: huggingface\n  timeout_secs: 5\n")?;

    let settings = AiRuntimeSettings::load_from(&config_path)?;
    let dispatcher = LlmProviderKind::ALL.into_iter().fold(
        BackendDispatcher::from_settings(&settings)?,
        |dispatcher, kind| dispatcher.with_adapter(Arc::new(CannedProvider(kind))),
    );
    let state = AppState::new(dispatcher, settings.provider);

    let first = runtime.block_on(state.send_user_message("ping from xtask"));
    ensure!(first.success, "canned provider failed: {}", first.response);

    state.set_provider(LlmProviderKind::OpenAi);
    ensure!(state.create_project("Smoke"), "could not create project");
    ensure!(state.switch_project("Smoke"), "could not switch project");
    state.toggle_research_mode();
    let second = runtime.block_on(state.send_user_message("deep ping"));
    ensure!(second.success, "canned provider failed: {}", second.response);

    let messages = state.active_messages();
    ensure!(messages.len() == 2, "expected 2 messages, got {}", messages.len());
    ensure!(
        messages[1].role == MessageRole::Assistant,
        "reply was not recorded as assistant"
    );
    for summary in state.project_summaries() {
        info!(
            project = %summary.name,
            messages = summary.message_count,
            research_mode = summary.research_mode,
            "smoke test project"
        );
    }
    info!(reply = %second.response, "smoke test passed");

    Ok(())
}
