//! Logging setup for syringe
//!
//! Every record the crate emits uses the `syringe` target:
//!
//! - `debug`: provider built, scope created, registration, disposal,
//!   skipped optional slot, cycles and missing services
//! - `trace`: cache hits and misses on the resolve path
//!
//! This module only installs a subscriber. Applications that already set up
//! `tracing` need none of it.
//!
//! # Features
//!
//! - `logging` - Emit records (default)
//! - `logging-json` - JSON subscriber (production)
//! - `logging-pretty` - Colorful multi-line subscriber (development)
//!
//! # Example
//!
//! ```rust,ignore
//! use syringe::logging;
//!
//! // JSON if logging-json is enabled, pretty otherwise
//! logging::init();
//!
//! // Or configure it
//! logging::builder()
//!     .trace()
//!     .syringe_only()
//!     .compact()
//!     .with_thread_names()
//!     .init();
//! ```

use tracing::Level;

/// Target of every record emitted by this crate.
pub const TARGET: &str = "syringe";

/// Logging format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty colorful output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for the log subscriber
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    from_env: bool,
    source_location: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            from_env: false,
            source_location: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    /// Create a new logging builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE (every cache hit and miss)
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// Set log level to DEBUG
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Only show records with the given target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show syringe's own records
    pub fn syringe_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Let `RUST_LOG` override the configured level and target
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Tag records with the file and line that emitted them
    pub fn with_source_location(mut self) -> Self {
        self.source_location = true;
        self
    }

    /// Tag records with the name of the resolving thread
    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    /// Use JSON structured logging format
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Use pretty colorful logging format
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Use compact single-line logging format
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive for the configured level and target, e.g. `syringe=debug`.
    pub fn directive(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the subscriber as the global default.
    ///
    /// Does nothing if a global subscriber is already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Install the subscriber as the global default, reporting failure.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if self.from_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
        } else {
            EnvFilter::new(self.directive())
        };

        let layer = fmt::layer()
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_names(self.with_thread_names)
            .with_target(true);
        let registry = tracing_subscriber::registry().with(filter);

        match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry.with(layer.json()).try_init(),
            // Without logging-json, JSON falls back to the default format
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => registry.with(layer).try_init(),
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            LogFormat::Compact => registry.with(layer.compact()).try_init(),
        }
    }

    /// No-op: requires `logging-json` or `logging-pretty`
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings
///
/// JSON if `logging-json` is enabled, pretty otherwise. `RUST_LOG` wins over
/// the default `debug` level when set.
pub fn init() {
    if cfg!(feature = "logging-json") {
        init_json();
    } else {
        init_pretty();
    }
}

/// Initialize JSON structured logging
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Built root service provider","registrations":4},"target":"syringe"}
/// ```
pub fn init_json() {
    builder().json().debug().from_env().init();
}

/// Initialize pretty colorful logging
///
/// # Example output
/// ```text
///   2026-01-01T00:00:00.000Z DEBUG syringe: Created child scope, depth: 1
/// ```
pub fn init_pretty() {
    builder().pretty().debug().from_env().init();
}

/// Initialize logging that only shows syringe's own records
pub fn init_syringe_only() {
    builder().syringe_only().debug().init();
}
