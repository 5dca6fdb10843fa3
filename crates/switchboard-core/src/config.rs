use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SwitchboardError};

/// Top-level configuration for the Switchboard dispatcher.
///
/// Loaded from `~/.switchboard/config.toml` by default. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub capabilities: CapabilityConfig,
}

impl SwitchboardConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SwitchboardConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SwitchboardError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Dispatch coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Response sent when no component matches or nothing was configured.
    pub no_actions_message: String,
    /// Response sent when the dispatch itself faults.
    pub system_error_message: String,
    /// Upper bound on the deferred acknowledgement call.
    pub acknowledge_timeout_ms: u64,
    /// Upper bound on every single action execution.
    pub action_timeout_ms: u64,
    /// Aggregated responses longer than this are truncated.
    pub max_response_chars: usize,
    /// Whether responses are only visible to the triggering actor.
    pub private_responses: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            no_actions_message: "This component has no actions configured.".to_string(),
            system_error_message: "Something went wrong while handling this interaction."
                .to_string(),
            acknowledge_timeout_ms: 2_500,
            action_timeout_ms: 10_000,
            max_response_chars: 2_000,
            private_responses: true,
        }
    }
}

/// Capability action behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Report a distinct message when a grant or revoke changes nothing.
    pub report_unchanged: bool,
    /// Serialize capability updates per (actor, capability) pair.
    pub serialize_updates: bool,
}
