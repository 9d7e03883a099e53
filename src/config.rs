//! Configuration for the compose augmentation engine
//!
//! Host markup patterns live here rather than in code: when the webmail UI
//! changes, updating the candidate lists is a config edit.

use crate::dom::parse_selector;
use crate::error::{AssistError, AssistResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Reply generation endpoint
    pub endpoint: String,

    /// Tone sent with every generation request
    pub tone: String,

    /// Delay between spotting a compose window and injecting into it
    pub settle_delay_ms: u64,

    /// Timeout for the generation request
    pub request_timeout_secs: u64,

    /// Host markup candidate patterns
    pub selectors: SelectorConfig,

    /// Presentation of the injected control
    pub control: ControlConfig,

    /// Failure notice settings
    pub notices: NoticeConfig,
}

/// Candidate patterns for locating pieces of the host UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Toolbar anchors, most specific first
    pub toolbar: Vec<String>,
    /// Email content regions, most specific first
    pub content: Vec<String>,
    /// Editable reply surface
    pub edit_surface: String,
    /// Selector group whose appearance signals a compose window
    pub compose_signal: String,
}

/// Presentation of the injected control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub label: String,
    pub working_label: String,
    pub tooltip: String,
    /// Class that marks our control for removal on re-injection
    pub marker_class: String,
    /// Host classes copied from the native send button
    pub classes: String,
    pub style: String,
}

/// User-visible failure notice settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Also raise a desktop notification
    pub desktop: bool,
    pub failure_title: String,
    pub failure_message: String,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/email/generate".to_string(),
            tone: "professional".to_string(),
            settle_delay_ms: 500,
            request_timeout_secs: 30,
            selectors: SelectorConfig::default(),
            control: ControlConfig::default(),
            notices: NoticeConfig::default(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            toolbar: vec![
                ".btC".to_string(),
                ".aDh".to_string(),
                r#"[role="toolbar"]"#.to_string(),
                ".gU.Up".to_string(),
            ],
            content: vec![
                ".h7".to_string(),
                ".a3s.aiL".to_string(),
                ".gmail_quote".to_string(),
                r#"[role="presentation"]"#.to_string(),
            ],
            edit_surface: r#"[role="textbox"][g_editable="true"]"#.to_string(),
            compose_signal: r#".aDh, .btC, [role="dialog"]"#.to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            label: "AI Reply".to_string(),
            working_label: "Generating...".to_string(),
            tooltip: "Generate AI Reply".to_string(),
            marker_class: "ai-reply-button".to_string(),
            classes: "T-I J-J5-Ji aoO v7 T-I-atl L3".to_string(),
            style: "margin-right: 8px".to_string(),
        }
    }
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            desktop: false,
            failure_title: "Compose Assist".to_string(),
            failure_message: "Failed to generate reply".to_string(),
        }
    }
}

impl AssistConfig {
    /// Load from `path`, or the default location, or fall back to defaults
    pub async fn load(path: Option<&Path>) -> AssistResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path(),
        };

        if config_path.exists() {
            Self::load_from(&config_path).await
        } else if path.is_some() {
            Err(AssistError::config_error(format!(
                "Config file not found: {}",
                config_path.display()
            )))
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Load and validate a specific file
    pub async fn load_from(path: &Path) -> AssistResult<Self> {
        let content = fs::read_to_string(path).await?;
        let config: AssistConfig = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save_to(&self, path: &Path) -> AssistResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Get configuration file path
    pub fn config_file_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("compose-assist").join("config.toml")
        } else {
            PathBuf::from(".").join("compose-assist.toml")
        }
    }

    /// Check that every pattern parses and every candidate list is usable
    pub fn validate(&self) -> AssistResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AssistError::config_error("endpoint must not be empty"));
        }
        if self.selectors.toolbar.is_empty() {
            return Err(AssistError::config_error("selectors.toolbar needs at least one pattern"));
        }
        if self.selectors.content.is_empty() {
            return Err(AssistError::config_error("selectors.content needs at least one pattern"));
        }
        if self.control.marker_class.split_whitespace().count() != 1 {
            return Err(AssistError::config_error(
                "control.marker_class must be a single class name",
            ));
        }

        for pattern in self.selectors.toolbar.iter().chain(&self.selectors.content) {
            parse_selector(pattern)?;
        }
        parse_selector(&self.selectors.edit_surface)?;
        parse_selector(&self.selectors.compose_signal)?;
        parse_selector(&format!(".{}", self.control.marker_class))?;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
