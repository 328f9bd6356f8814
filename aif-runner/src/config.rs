//! Runner configuration, loaded from TOML.
//!
//! ```toml
//! service_name = "aif-runner"
//! json_logs = true
//! max_concurrency = 4
//!
//! [database_retry]
//! max_attempts = 5
//! initial_wait_secs = 0.5
//! max_wait_secs = 15.0
//!
//! [evaluator]
//! model = "judge-large"
//! temperature = 0.3
//!
//! [evaluator.judge_policy]
//! max_attempts = 6
//! initial_wait_secs = 3.0
//! max_wait_secs = 180.0
//! ```
//!
//! A missing section takes its preset ([`RetryPolicy::database`],
//! [`EvaluatorConfig::default`]); keys missing inside a present retry section
//! take the [`RetryPolicy::default`] values.

use aif_core::{AifError, Result};
use aif_eval::EvaluatorConfig;
use aif_retry::RetryPolicy;
use aif_telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AifConfig {
    /// Service name attached to log output.
    pub service_name: String,
    /// JSON lines instead of human-readable logs.
    pub json_logs: bool,
    /// Agents evaluated at the same time by a batch.
    pub max_concurrency: usize,
    /// Base of the report links stored with each result, if reports are published.
    pub report_base_url: Option<String>,
    pub database_retry: RetryPolicy,
    pub evaluator: EvaluatorConfig,
}

impl Default for AifConfig {
    fn default() -> Self {
        Self {
            service_name: "aif-runner".to_string(),
            json_logs: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            report_base_url: None,
            database_retry: RetryPolicy::database(),
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl AifConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|err| AifError::invalid_field("config", err.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            AifError::invalid_field("config", format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| AifError::invalid_field("config", err.to_string()))
    }

    /// Check every policy and setting; field names are qualified by section.
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(AifError::invalid_field("service_name", "service_name must not be empty"));
        }
        if self.max_concurrency == 0 {
            return Err(AifError::invalid_field(
                "max_concurrency",
                "max_concurrency must be at least 1",
            ));
        }
        self.database_retry.validate().map_err(|err| in_section("database_retry", err))?;
        self.evaluator
            .judge_policy
            .validate()
            .map_err(|err| in_section("evaluator.judge_policy", err))?;
        self.evaluator.validate().map_err(|err| in_section("evaluator", err))
    }

    pub fn judge_policy(&self) -> &RetryPolicy {
        &self.evaluator.judge_policy
    }

    pub fn log_format(&self) -> LogFormat {
        if self.json_logs { LogFormat::Json } else { LogFormat::Pretty }
    }

    /// Install the process-wide log subscriber described by this config.
    pub fn init_telemetry(&self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        aif_telemetry::init_with_format(&self.service_name, self.log_format())
    }
}

fn in_section(section: &str, err: AifError) -> AifError {
    match err {
        AifError::Validation { message, field: Some(field) } => {
            AifError::Validation { message, field: Some(format!("{section}.{field}")) }
        }
        AifError::Validation { message, field: None } => {
            AifError::Validation { message, field: Some(section.to_string()) }
        }
        other => other,
    }
}
