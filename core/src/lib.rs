pub mod config;
pub mod knowledge;
pub mod llm;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod transcript;

pub use config::{AiConfigError, AiRuntimeSettings, ProviderSettings};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, StaticKnowledgeBase};
pub use llm::{
    BackendDispatcher, DispatchOutcome, ErrorKind, LanguageModelProvider, LlmProviderKind,
    ProviderError,
};
pub use state::{AppState, DEFAULT_PROJECT};
pub use store::ProjectStore;
pub use transcript::{ChatMessage, MessageRole, Transcript, TranscriptSummary};
