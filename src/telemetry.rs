//! Telemetry and tracing utilities
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. These helpers cover the common setups.
//!
//! ## Example
//!
//! ```rust,ignore
//! use instrument_retry::telemetry::{init_subscriber, SubscriberConfig, OutputFormat};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! init_subscriber(config)?;
//! ```

use crate::error::TelemetryError;

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format
    Json,
    /// Compact JSON format
    JsonCompact,
}

/// Configuration for tracing subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    /// Debug level, text output. Shows every retry decision.
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            output_format: OutputFormat::Text,
        }
    }

    /// Filter directive for this crate at the configured level.
    pub fn filter(&self) -> String {
        format!(
            "{}={}",
            env!("CARGO_CRATE_NAME"),
            self.log_level.to_string().to_lowercase()
        )
    }
}

/// Builder for SubscriberConfig
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from a string
    pub fn log_level_str(mut self, level: &str) -> Result<Self> {
        let level = level.parse::<tracing::Level>().map_err(|_| {
            TelemetryError::Init(format!(
                "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                level
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
        }
    }
}

/// Initialize a global tracing subscriber.
///
/// An already-installed global subscriber is not an error.
pub fn init_subscriber(config: SubscriberConfig) -> Result<()> {
    let filter = config.filter();

    let init_result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .flatten_event(true)
            .try_init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    match init_result {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(TelemetryError::Init(format!(
                    "Failed to initialize tracing: {}",
                    e
                )))
            }
        }
    }
}

pub fn init_default() -> Result<()> {
    init_subscriber(SubscriberConfig::default())
}

pub fn init_debug() -> Result<()> {
    init_subscriber(SubscriberConfig::debug())
}
