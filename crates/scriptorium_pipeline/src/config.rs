//! Pipeline configuration.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from scriptorium.toml)
//! - `~/.config/scriptorium/scriptorium.toml` (optional)
//! - `./scriptorium.toml` (optional, highest precedence)

use crate::ContextOptions;
use config::{Config, File, FileFormat};
use scriptorium_core::AgentRole;
use scriptorium_error::{ConfigError, ScriptoriumError, ScriptoriumResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_CONFIG: &str = include_str!("../../../scriptorium.toml");

/// Model parameters used when a role has no override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefaults {
    /// Model identifier
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Per-role agent configuration (`[agents.<role>]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Role instruction text, rendered first in the system message
    #[serde(default)]
    pub instructions: String,
    /// Free-text customisation appended under "Custom Instructions"
    #[serde(default)]
    pub custom_instructions: Option<String>,
    /// Free-text style guidance appended under "Style Profile"
    #[serde(default)]
    pub style_profile: Option<String>,
    /// Model override
    #[serde(default)]
    pub model: Option<String>,
    /// Temperature override
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Token limit override
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Retry policy for retryable completion failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whether to retry at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// First backoff delay
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Cap on any single delay
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

/// Escalation gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Key that, evaluating true in a step's output, pauses the run
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

/// Settings for the bundled HTTP completion client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key; `None` for keyless servers
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Complete Scriptorium configuration.
///
/// # Examples
///
/// ```
/// use scriptorium_pipeline::ScriptoriumConfig;
/// use scriptorium_core::AgentRole;
///
/// let config = ScriptoriumConfig::from_toml_str(r#"
///     [defaults]
///     model = "local"
///
///     [agents.writer]
///     instructions = "Write."
///     temperature = 0.9
/// "#).unwrap();
///
/// let writer = config.agent(AgentRole::Writer).unwrap();
/// assert_eq!(writer.instructions, "Write.");
/// assert_eq!(config.context.summary_window, 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptoriumConfig {
    /// Fallback model parameters
    #[serde(default)]
    pub defaults: ModelDefaults,
    /// Per-role agent configuration keyed by snake_case role name
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
    /// Context aggregation toggles
    #[serde(default)]
    pub context: ContextOptions,
    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Escalation gate
    #[serde(default)]
    pub escalation: EscalationConfig,
    /// HTTP provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl ScriptoriumConfig {
    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file is malformed.
    pub fn load() -> ScriptoriumResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/scriptorium/scriptorium.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("scriptorium").required(false));

        Self::finish(builder)
    }

    /// Load the bundled defaults overlaid with one explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ScriptoriumResult<Self> {
        debug!(path = %path.as_ref().display(), "Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Parse a TOML document on its own, without the bundled defaults.
    pub fn from_toml_str(toml: &str) -> ScriptoriumResult<Self> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    /// The bundled defaults alone.
    pub fn bundled() -> ScriptoriumResult<Self> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ScriptoriumResult<Self> {
        builder
            .build()
            .map_err(|e| {
                ScriptoriumError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ScriptoriumError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Configuration of one role, if present.
    pub fn agent(&self, role: AgentRole) -> Option<&AgentConfig> {
        self.agents.get(role.as_ref())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_delay_secs() -> u64 {
    30
}

fn default_marker() -> String {
    "requires_consultation".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_bundled_config_covers_every_role() {
        let config = ScriptoriumConfig::bundled().unwrap();
        for role in AgentRole::iter() {
            let agent = config.agent(role).unwrap_or_else(|| panic!("missing {role}"));
            assert!(!agent.instructions.trim().is_empty());
        }
        assert_eq!(config.escalation.marker, "requires_consultation");
        assert!(config.retry.enabled);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ScriptoriumConfig::from_toml_str("").unwrap();
        assert!(config.agents.is_empty());
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.context.include_plot_points);
    }
}
