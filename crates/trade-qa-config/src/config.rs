// crates/trade-qa-config/src/config.rs
// ============================================================================
// Module: Trade QA Configuration
// Description: Configuration loading and validation for the QA engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: trade-qa-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and range
//! limits. Every section is optional and falls back to the documented
//! defaults; any value outside its range rejects the whole file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use trade_qa_core::ClassificationProvider;
use trade_qa_core::EngineConfig;
use trade_qa_core::EvaluatorRegistry;
use trade_qa_core::RetryPolicy;
use trade_qa_core::RunEventSink;
use trade_qa_core::TimeoutPolicy;
use trade_qa_core::runtime::FileEventSink;
use trade_qa_core::runtime::NoopEventSink;
use trade_qa_core::runtime::StderrEventSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "trade-qa.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TRADE_QA_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum concurrent test evaluations.
const MAX_CONCURRENCY: usize = 64;
/// Maximum per-attempt timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 600_000;
/// Maximum attempts per test.
const MAX_ATTEMPTS: u8 = 10;
/// Maximum base retry delay in milliseconds.
const MAX_BASE_DELAY_MS: u64 = 60_000;
/// Maximum timeliness window in minutes.
const MAX_TIMELINESS_MINUTES: u32 = 24 * 60;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Trade QA configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QaConfig {
    /// Engine limits and decision policy.
    #[serde(default)]
    pub engine: EngineSection,
    /// Per-attempt timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Timeout retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Classification model usage.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Run event sink.
    #[serde(default)]
    pub events: EventsConfig,
}

impl QaConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.timeouts.validate()?;
        self.retry.validate()?;
        self.events.validate()
    }

    /// Converts the configuration into the runtime engine configuration.
    #[must_use]
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrency: self.engine.max_concurrency,
            decision_threshold: self.engine.decision_threshold,
            timeouts: TimeoutPolicy {
                rule_based: Duration::from_millis(self.timeouts.rule_based_ms),
                llm_backed: Duration::from_millis(self.timeouts.llm_backed_ms),
            },
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
            },
        }
    }

    /// Builds the standard evaluator registry.
    ///
    /// The classifier is used only when `[classifier] enabled = true`.
    #[must_use]
    pub fn evaluator_registry(
        &self,
        classifier: Option<Arc<dyn ClassificationProvider>>,
    ) -> EvaluatorRegistry {
        let classifier = classifier.filter(|_| self.classifier.enabled);
        let window = self.engine.timeliness_max_delay_minutes;
        EvaluatorRegistry::standard_with_window(classifier, window)
    }

    /// Builds the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the event log cannot be opened.
    pub fn event_sink(&self) -> Result<Arc<dyn RunEventSink>, ConfigError> {
        match self.events.sink {
            EventSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
            EventSinkKind::None => Ok(Arc::new(NoopEventSink)),
            EventSinkKind::File => {
                let path = self
                    .events
                    .path
                    .as_deref()
                    .ok_or_else(|| ConfigError::Invalid("events.path is required".to_string()))?;
                let sink = FileEventSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

/// Engine limits and decision policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineSection {
    /// Maximum tests evaluated at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Execution success rate required for a pass decision.
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    /// Maximum minutes between order receipt and execution.
    #[serde(default = "default_timeliness_max_delay_minutes")]
    pub timeliness_max_delay_minutes: u32,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            decision_threshold: default_decision_threshold(),
            timeliness_max_delay_minutes: default_timeliness_max_delay_minutes(),
        }
    }
}

impl EngineSection {
    /// Validates engine settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "engine.max_concurrency must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        let threshold = self.decision_threshold;
        if threshold.is_nan() || threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::Invalid(
                "engine.decision_threshold must be in (0, 1]".to_string(),
            ));
        }
        if self.timeliness_max_delay_minutes == 0
            || self.timeliness_max_delay_minutes > MAX_TIMELINESS_MINUTES
        {
            return Err(ConfigError::Invalid(format!(
                "engine.timeliness_max_delay_minutes must be between 1 and {MAX_TIMELINESS_MINUTES}"
            )));
        }
        Ok(())
    }
}

/// Per-attempt timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeoutsConfig {
    /// Limit for rule-based evaluators in milliseconds.
    #[serde(default = "default_rule_based_ms")]
    pub rule_based_ms: u64,
    /// Limit for LLM-backed evaluators in milliseconds.
    #[serde(default = "default_llm_backed_ms")]
    pub llm_backed_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            rule_based_ms: default_rule_based_ms(),
            llm_backed_ms: default_llm_backed_ms(),
        }
    }
}

impl TimeoutsConfig {
    /// Validates timeout limits.
    fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            ("timeouts.rule_based_ms", self.rule_based_ms),
            ("timeouts.llm_backed_ms", self.llm_backed_ms),
        ];
        for (field, value) in bounds {
            if value == 0 || value > MAX_TIMEOUT_MS {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be between 1 and {MAX_TIMEOUT_MS}"
                )));
            }
        }
        Ok(())
    }
}

/// Timeout retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per test, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Validates retry settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must be between 1 and {MAX_ATTEMPTS}"
            )));
        }
        if self.base_delay_ms > MAX_BASE_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "retry.base_delay_ms must be at most {MAX_BASE_DELAY_MS}"
            )));
        }
        Ok(())
    }
}

/// Classification model configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassifierConfig {
    /// Use a supplied classifier for advice detection.
    #[serde(default)]
    pub enabled: bool,
}

/// Event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `events.path`.
    File,
    /// Discard events.
    None,
}

/// Run event sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventsConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Event log path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl EventsConfig {
    /// Validates event sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (EventSinkKind::File, None) => {
                Err(ConfigError::Invalid("events.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("events.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a config path against length constraints.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(Path::new(trimmed))
        .map_err(|_| ConfigError::Invalid(format!("{field} exceeds path limits")))
}

/// Default concurrency cap.
const fn default_max_concurrency() -> usize {
    trade_qa_core::runtime::DEFAULT_MAX_CONCURRENCY
}

/// Default decision threshold.
const fn default_decision_threshold() -> f64 {
    trade_qa_core::DEFAULT_DECISION_THRESHOLD
}

/// Default timeliness window.
const fn default_timeliness_max_delay_minutes() -> u32 {
    trade_qa_core::runtime::rules::DEFAULT_MAX_DELAY_MINUTES
}

/// Default rule-based timeout.
const fn default_rule_based_ms() -> u64 {
    60_000
}

/// Default LLM-backed timeout.
const fn default_llm_backed_ms() -> u64 {
    120_000
}

/// Default attempt cap.
const fn default_max_attempts() -> u8 {
    trade_qa_core::runtime::policy::DEFAULT_MAX_ATTEMPTS
}

/// Default base retry delay.
const fn default_base_delay_ms() -> u64 {
    1_000
}

// ============================================================================
// SECTION: Tests
// ============================================================================
