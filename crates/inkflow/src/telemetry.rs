//! Process-wide logging setup.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::ConfigError;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// `RUST_LOG` wins over the configured level when set.
fn build_filter(level: &str, env_directives: Option<&str>) -> Result<EnvFilter, ConfigError> {
    let directives = match env_directives {
        Some(d) if !d.trim().is_empty() => d,
        _ => level,
    };
    EnvFilter::try_new(directives).map_err(|e| ConfigError::Validation {
        message: format!("Invalid log filter '{}': {}", directives, e),
    })
}

/// Installs the global tracing subscriber and routes `log` records into it.
///
/// Returns `Ok(false)` if logging was already initialized, by this function
/// or by someone else.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let env = std::env::var("RUST_LOG").ok();
    let filter = build_filter(&config.level, env.as_deref())?;

    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(false);
    }

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json()),
        )
    } else {
        tracing::subscriber::set_global_default(registry.with(tracing_subscriber::fmt::layer()))
    };
    if installed.is_err() {
        return Ok(false);
    }

    // Fails only if a logger is already set, which is fine.
    let _ = tracing_log::LogTracer::init();
    Ok(true)
}
