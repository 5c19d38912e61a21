use crate::llm::{LlmProviderKind, ModelSelection, DEFAULT_TIMEOUT};
use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";

#[derive(Debug, Clone)]
pub struct AiRuntimeSettings {
    pub provider: LlmProviderKind,
    pub openai: ProviderSettings,
    pub huggingface: ProviderSettings,
    pub timeout: Duration,
    pub knowledge_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    /// Validated with `url` at load time; kept as text so defaults need no parsing.
    pub base_url: String,
    pub models: ModelSelection,
}

impl ProviderSettings {
    pub fn defaults_for(kind: LlmProviderKind) -> Self {
        let base_url = match kind {
            LlmProviderKind::OpenAi => OPENAI_BASE_URL,
            LlmProviderKind::HuggingFace => HUGGINGFACE_BASE_URL,
        };
        Self {
            api_key: None,
            base_url: base_url.to_string(),
            models: ModelSelection::defaults_for(kind),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AiConfigError {
    #[error("AI configuration invalid: {0}")]
    Invalid(String),
}

impl AiConfigError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(detail) => format!("AI not configured: {detail}. Update tutor.yaml."),
        }
    }
}

impl AiRuntimeSettings {
    /// Reads the first `tutor.yaml` found in the usual places, then applies
    /// environment overrides. A missing file is not an error.
    pub fn load() -> Result<Self, AiConfigError> {
        let mut settings = match locate_config_file() {
            Some(path) => Self::load_from(&path)?,
            None => {
                debug!("no tutor.yaml found, using defaults");
                Self::default()
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self, AiConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            AiConfigError::Invalid(format!("failed to read {}: {err}", path.display()))
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut settings = Self::from_yaml_str(&contents)?;
        // Relative knowledge paths are resolved against the config file.
        if let (Some(knowledge), Some(parent)) = (&settings.knowledge_path, path.parent()) {
            if knowledge.is_relative() {
                settings.knowledge_path = Some(parent.join(knowledge));
            }
        }
        Ok(settings)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, AiConfigError> {
        let config: TutorConfig = serde_yaml::from_str(contents)
            .map_err(|err| AiConfigError::Invalid(format!("invalid tutor.yaml: {err}")))?;
        resolve_app_settings(config.app.unwrap_or_default())
    }

    /// `API_PROVIDER`, `OPENAI_API_KEY` and `HF_API_KEY` win over the file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), AiConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("API_PROVIDER").and_then(non_empty) {
            self.provider = provider
                .parse()
                .map_err(|err: crate::llm::UnknownProvider| AiConfigError::Invalid(err.to_string()))?;
        }
        if let Some(key) = lookup(LlmProviderKind::OpenAi.credential_variable()).and_then(non_empty)
        {
            self.openai.api_key = Some(key);
        }
        if let Some(key) =
            lookup(LlmProviderKind::HuggingFace.credential_variable()).and_then(non_empty)
        {
            self.huggingface.api_key = Some(key);
        }
        Ok(())
    }

    pub fn provider_settings(&self, kind: LlmProviderKind) -> &ProviderSettings {
        match kind {
            LlmProviderKind::OpenAi => &self.openai,
            LlmProviderKind::HuggingFace => &self.huggingface,
        }
    }
}

impl Default for AiRuntimeSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::OpenAi,
            openai: ProviderSettings::defaults_for(LlmProviderKind::OpenAi),
            huggingface: ProviderSettings::defaults_for(LlmProviderKind::HuggingFace),
            timeout: DEFAULT_TIMEOUT,
            knowledge_path: None,
        }
    }
}

fn resolve_app_settings(app: AppSection) -> Result<AiRuntimeSettings, AiConfigError> {
    let provider = match app.provider.as_deref().map(str::trim) {
        None | Some("") => LlmProviderKind::OpenAi,
        Some(raw) => raw
            .parse()
            .map_err(|err: crate::llm::UnknownProvider| AiConfigError::Invalid(err.to_string()))?,
    };
    let timeout = match app.timeout_secs {
        Some(0) => {
            return Err(AiConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ))
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_TIMEOUT,
    };
    let openai = resolve_provider(LlmProviderKind::OpenAi, app.openai.unwrap_or_default())?;
    let huggingface =
        resolve_provider(LlmProviderKind::HuggingFace, app.huggingface.unwrap_or_default())?;
    Ok(AiRuntimeSettings {
        provider,
        openai,
        huggingface,
        timeout,
        knowledge_path: app.knowledge_path.and_then(non_empty).map(PathBuf::from),
    })
}

fn resolve_provider(
    kind: LlmProviderKind,
    section: ProviderSection,
) -> Result<ProviderSettings, AiConfigError> {
    let defaults = ProviderSettings::defaults_for(kind);
    let base_url = match section.base_url.and_then(non_empty) {
        Some(raw) => {
            let parsed = Url::parse(&raw).map_err(|err| {
                AiConfigError::Invalid(format!("invalid {kind} base_url `{raw}`: {err}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AiConfigError::Invalid(format!(
                    "{kind} base_url must use http or https"
                )));
            }
            raw
        }
        None => defaults.base_url,
    };
    Ok(ProviderSettings {
        api_key: section.api_key.and_then(non_empty),
        base_url,
        models: ModelSelection {
            normal: section
                .model
                .and_then(non_empty)
                .unwrap_or(defaults.models.normal),
            research: section
                .research_model
                .and_then(non_empty)
                .unwrap_or(defaults.models.research),
        },
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn locate_config_file() -> Option<PathBuf> {
    tutor_yaml_candidates()
        .into_iter()
        .find(|path| path.exists())
}

fn tutor_yaml_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("tutor");
        paths.push(config_dir.join("tutor.yaml"));
        paths.push(config_dir.join("tutor.yml"));
        let home_dir = base.home_dir();
        paths.push(home_dir.join(".tutor").join("tutor.yaml"));
        paths.push(home_dir.join(".tutor").join("tutor.yml"));
    }
    paths.push(PathBuf::from("tutor.yaml"));
    paths.push(PathBuf::from("tutor.yml"));
    paths
}

#[derive(Debug, Default, Deserialize)]
struct TutorConfig {
    app: Option<AppSection>,
}

#[derive(Debug, Default, Deserialize)]
struct AppSection {
    provider: Option<String>,
    timeout_secs: Option<u64>,
    knowledge_path: Option<String>,
    openai: Option<ProviderSection>,
    huggingface: Option<ProviderSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    research_model: Option<String>,
}
