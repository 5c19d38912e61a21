use anyhow::Result;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static SUBSCRIBER_GUARD: OnceLock<()> = OnceLock::new();

/// Variable checked before `RUST_LOG` when building the default filter.
pub const LOG_ENV: &str = "TUTOR_LOG";

/// Initialize the global tracing subscriber for the tutor binaries.
///
/// The initialization is idempotent so that tests and binaries can call it
/// more than once without panicking.
pub fn init_tracing(filter: EnvFilter) -> Result<()> {
    if SUBSCRIBER_GUARD.get().is_some() {
        return Ok(());
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;
    SUBSCRIBER_GUARD.set(()).ok();

    Ok(())
}

/// `TUTOR_LOG`, then `RUST_LOG`, then `fallback`.
pub fn default_filter(fallback: &str) -> EnvFilter {
    filter_from(|key| std::env::var(key).ok(), fallback)
}

fn filter_from<F>(lookup: F, fallback: &str) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|key| lookup(key))
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}
