use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use time::{Date, macros::format_description};

use crate::{
    config::TrialConfig,
    telemetry::{
        error::TrialError,
        ports::Trial,
        types::{ActiveWindow, Document},
    },
};

pub const HOST_INFO_TRIAL_ID: &str = "host-info";

/// Trial declared in the config file; submits the same document every cycle.
#[derive(Debug, Clone)]
pub struct ConfiguredTrial {
    id: String,
    display_name: String,
    window: ActiveWindow,
    content: Document,
}

impl ConfiguredTrial {
    pub fn from_config(config: &TrialConfig) -> Result<Self> {
        let start = config
            .start
            .as_deref()
            .map(parse_date)
            .transpose()
            .with_context(|| format!("invalid start date for trial '{}'", config.id))?;
        let end = config
            .end
            .as_deref()
            .map(parse_date)
            .transpose()
            .with_context(|| format!("invalid end date for trial '{}'", config.id))?;

        let content = match &config.content {
            Value::Object(map) => map.clone(),
            Value::Null => Document::new(),
            other => {
                return Err(anyhow!(
                    "content for trial '{}' must be a JSON object, got {}",
                    config.id,
                    json_kind(other)
                ));
            }
        };

        Ok(Self {
            id: config.id.clone(),
            display_name: config
                .display_name
                .clone()
                .unwrap_or_else(|| config.id.clone()),
            window: ActiveWindow { start, end },
            content,
        })
    }
}

#[async_trait]
impl Trial for ConfiguredTrial {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn active_window(&self) -> ActiveWindow {
        self.window
    }

    async fn content(&self) -> Result<Option<Document>, TrialError> {
        Ok(Some(self.content.clone()))
    }
}

/// Reports the engine version and the platform it runs on. Always active.
#[derive(Debug, Clone, Default)]
pub struct HostInfoTrial;

#[async_trait]
impl Trial for HostInfoTrial {
    fn id(&self) -> &str {
        HOST_INFO_TRIAL_ID
    }

    fn display_name(&self) -> &str {
        "Host information"
    }

    fn active_window(&self) -> ActiveWindow {
        ActiveWindow::always()
    }

    async fn content(&self) -> Result<Option<Document>, TrialError> {
        let mut document = Document::new();
        document.insert(
            "version".to_string(),
            Value::String(env!("CARGO_PKG_VERSION").to_string()),
        );
        document.insert(
            "os".to_string(),
            Value::String(std::env::consts::OS.to_string()),
        );
        document.insert(
            "arch".to_string(),
            Value::String(std::env::consts::ARCH.to_string()),
        );
        Ok(Some(document))
    }
}

/// Parses `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("expected YYYY-MM-DD, got '{raw}'"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
