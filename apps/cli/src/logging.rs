//! Logging initialization for the CLI
//!
//! Log lines go to stderr so command output on stdout stays machine readable.

use scriptorium_config::Settings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl LoggingConfig {
    /// `logging.level` and `logging.json` from settings; command line flags win.
    pub fn from_settings(settings: &Settings, level: Option<&str>, json: bool) -> Self {
        Self {
            level: level
                .or_else(|| settings.get_str("logging.level"))
                .unwrap_or(DEFAULT_LEVEL)
                .to_string(),
            json: json || settings.get_bool("logging.json").unwrap_or(false),
        }
    }
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_env_filter(config);
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

/// `RUST_LOG` overrides the configured level.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "scriptorium={level},scriptorium_config={level},scriptorium_index={level},scriptorium_fulltext={level},reqwest=warn,hyper=warn",
            level = config.level
        ))
    })
}
