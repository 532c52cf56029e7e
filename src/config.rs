use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::telemetry::{
    ConfiguredTrial,
    submitter::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_MS},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub uplink: UplinkConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub trials: Vec<TrialConfig>,
    #[serde(default = "default_enabled_true")]
    pub host_info_trial: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uplink: UplinkConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
            trials: Vec::new(),
            host_info_trial: true,
        }
    }
}

fn default_enabled_true() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_interval_ms() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_initial_delay_ms() -> u64 {
    5 * 60 * 1000
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/uplink")
}

/// Third-party crates (reqwest, hyper) stay at `warn`; uplink's own events at `info`.
fn default_logging_filter() -> String {
    "warn,uplink=info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Host side of the engine: the usage-statistics opt-out and the timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_enabled_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

/// Static trial declared in config. Dates are `YYYY-MM-DD`; omitted bounds are open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub content: Value,
}

/// Bundled with the binary so a config file never has to point at it. A
/// `$schema` key in the file is accepted as an editor hint and otherwise ignored.
const CONFIG_SCHEMA: &str = include_str!("../uplink.schema.json");

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let document: Value = json5::from_str(&text)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        check_schema(&document)
            .with_context(|| format!("{} does not match the uplink schema", config_path.display()))?;

        let config: Config =
            serde_json::from_value(document).context("failed to deserialize uplink config")?;
        config.configured_trials()?;
        Ok(config)
    }

    pub fn configured_trials(&self) -> Result<Vec<ConfiguredTrial>> {
        self.trials.iter().map(ConfiguredTrial::from_config).collect()
    }
}

/// Every violation is reported, each prefixed with the JSON pointer of the
/// offending value (`/logging/retention_days: 0 is less than the minimum of 1`).
fn check_schema(document: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(CONFIG_SCHEMA).context("bundled uplink schema is not JSON")?;
    let validator = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("bundled uplink schema does not compile: {err}"))?;

    let violations: Vec<String> = match validator.validate(document) {
        Ok(()) => return Ok(()),
        Err(errors) => errors
            .map(|error| match error.instance_path.to_string() {
                pointer if pointer.is_empty() => error.to_string(),
                pointer => format!("{pointer}: {error}"),
            })
            .collect(),
    };
    Err(anyhow!(violations.join("; ")))
}
