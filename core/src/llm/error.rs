use super::LlmProviderKind;
use std::time::Duration;

/// Coarse failure classes the dispatcher turns into chat-visible text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingCredential,
    Timeout,
    Authentication,
    Quota,
    Generic,
}

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{provider} credential {} is not configured", .provider.credential_variable())]
    MissingCredential { provider: LlmProviderKind },

    #[error("{provider} did not answer within {timeout:?}")]
    Timeout {
        provider: LlmProviderKind,
        timeout: Duration,
    },

    #[error("{provider} rejected the credential: {details}")]
    Authentication {
        provider: LlmProviderKind,
        details: String,
    },

    #[error("{provider} quota or billing limit reached: {details}")]
    Quota {
        provider: LlmProviderKind,
        details: String,
    },

    #[error("{provider} returned status {status_code}")]
    Status {
        provider: LlmProviderKind,
        status_code: u16,
        details: String,
    },

    #[error("network error talking to {provider}: {details}")]
    Network {
        provider: LlmProviderKind,
        details: String,
    },

    #[error("failed to parse response from {provider}: {details}")]
    ResponseParsing {
        provider: LlmProviderKind,
        details: String,
    },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential { .. } => ErrorKind::MissingCredential,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Quota { .. } => ErrorKind::Quota,
            Self::Status { .. } | Self::Network { .. } | Self::ResponseParsing { .. } => {
                ErrorKind::Generic
            }
        }
    }

    pub fn provider(&self) -> LlmProviderKind {
        match self {
            Self::MissingCredential { provider }
            | Self::Timeout { provider, .. }
            | Self::Authentication { provider, .. }
            | Self::Quota { provider, .. }
            | Self::Status { provider, .. }
            | Self::Network { provider, .. }
            | Self::ResponseParsing { provider, .. } => *provider,
        }
    }

    /// Classifies a non-success HTTP reply by status first, then by the body text.
    pub fn from_status(provider: LlmProviderKind, status_code: u16, body: String) -> Self {
        let lowered = body.to_lowercase();
        match status_code {
            401 | 403 => Self::Authentication {
                provider,
                details: body,
            },
            402 => Self::Quota {
                provider,
                details: body,
            },
            _ if lowered.contains("quota") || lowered.contains("billing") => Self::Quota {
                provider,
                details: body,
            },
            _ if lowered.contains("authentication") || lowered.contains("api key") => {
                Self::Authentication {
                    provider,
                    details: body,
                }
            }
            _ => Self::Status {
                provider,
                status_code,
                details: body,
            },
        }
    }

    pub fn from_transport(
        provider: LlmProviderKind,
        err: &reqwest::Error,
        timeout: Duration,
    ) -> Self {
        if err.is_timeout() {
            Self::Timeout { provider, timeout }
        } else {
            Self::Network {
                provider,
                details: err.to_string(),
            }
        }
    }
}
