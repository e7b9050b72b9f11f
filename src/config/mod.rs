//! Configuration system (layered: defaults < config file < env < code).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::FlowError;
use crate::types::WorkflowKind;

pub const DEFAULT_BASE_URL: &str = "https://api.coze.com";

/// Multi-step generation routinely takes minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for reaching the remote workflow service.
///
/// Resolution order, lowest first:
/// 1. Built-in defaults
/// 2. `~/.flowrun/config.toml`, or an explicit file
/// 3. Environment variables (a `.env` file is loaded if present)
/// 4. `with_*` calls in code
#[derive(Clone)]
pub struct FlowConfig {
    base_url: String,
    api_token: Option<String>,
    bot_id: Option<String>,
    workflows: HashMap<WorkflowKind, String>,
    timeout: Duration,
}

impl fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| ".."))
            .field("bot_id", &self.bot_id)
            .field("workflows", &self.workflows)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    api_token: Option<String>,
    bot_id: Option<String>,
    timeout_secs: Option<u64>,
    workflows: HashMap<WorkflowKind, String>,
}

impl FlowConfig {
    /// Built-in defaults only.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            bot_id: None,
            workflows: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::new().merge_env(|key| std::env::var(key).ok())
    }

    /// Every layer: defaults, config file, environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, FlowError> {
        let _ = dotenvy::dotenv();
        let config = match path {
            Some(path) => Self::new().merge_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::new().merge_file(&path)?
                } else {
                    Self::new()
                }
            }
        };
        Ok(config.merge_env(|key| std::env::var(key).ok()))
    }

    /// Overlay values from a TOML file.
    pub fn merge_file(mut self, path: &Path) -> Result<Self, FlowError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|e| {
            FlowError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;

        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if file.api_token.is_some() {
            self.api_token = file.api_token;
        }
        if file.bot_id.is_some() {
            self.bot_id = file.bot_id;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        self.workflows.extend(file.workflows);
        Ok(self)
    }

    /// Overlay values from `FLOWRUN_*` variables resolved by `lookup`.
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FLOWRUN_BASE_URL") {
            self.base_url = url;
        }
        if let Some(token) = lookup("FLOWRUN_API_TOKEN") {
            self.api_token = Some(token);
        }
        if let Some(bot_id) = lookup("FLOWRUN_BOT_ID") {
            self.bot_id = Some(bot_id);
        }
        if let Some(raw) = lookup("FLOWRUN_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "Ignoring invalid FLOWRUN_TIMEOUT_SECS"),
            }
        }
        for kind in WorkflowKind::ALL {
            if let Some(id) = lookup(&format!("FLOWRUN_WORKFLOW_{}", kind.env_suffix())) {
                self.workflows.insert(kind, id);
            }
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_bot_id(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = Some(bot_id.into());
        self
    }

    pub fn with_workflow(mut self, kind: WorkflowKind, workflow_id: impl Into<String>) -> Self {
        self.workflows.insert(kind, workflow_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    pub fn workflows(&self) -> &HashMap<WorkflowKind, String> {
        &self.workflows
    }

    pub fn workflow_id(&self, kind: WorkflowKind) -> Option<&str> {
        self.workflows.get(&kind).map(String::as_str)
    }

    /// Wall-clock ceiling for one run or resume call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check the settings needed to reach the service.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.api_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(FlowError::Configuration("Missing FLOWRUN_API_TOKEN".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FlowError::Configuration(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(FlowError::Configuration("timeout must be positive".into()));
        }
        Ok(())
    }
}

/// `~/.flowrun/config.toml`, or `.flowrun/config.toml` without a home dir.
pub fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".flowrun"))
        .unwrap_or_else(|| PathBuf::from(".flowrun"))
        .join("config.toml")
}
