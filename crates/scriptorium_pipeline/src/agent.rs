//! Generation agents: one configured role wrapped around a completion driver.

use crate::{AgentConfig, ModelDefaults, RetryConfig, ScriptoriumConfig};
use futures_util::StreamExt;
use scriptorium_core::{AgentRole, GenerateRequest, Message, TokenUsage};
use scriptorium_error::{
    BuilderError, PipelineError, PipelineErrorKind, RetryableError, ScriptoriumError,
    ScriptoriumResult,
};
use scriptorium_interface::CompletionDriver;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, info, instrument, warn};

/// Instruction text of a role plus optional customisation.
///
/// # Examples
///
/// ```
/// use scriptorium_pipeline::AgentProfile;
///
/// let profile = AgentProfile::new("You are the editor.")
///     .with_style_profile("Spare, wry.")
///     .with_custom_instructions("British spelling.");
///
/// let prompt = profile.system_prompt();
/// let custom = prompt.find("## Custom Instructions").unwrap();
/// let style = prompt.find("## Style Profile").unwrap();
/// assert!(custom < style);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct AgentProfile {
    instructions: String,
    custom_instructions: Option<String>,
    style_profile: Option<String>,
}

impl AgentProfile {
    /// Creates a profile with instructions only.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            custom_instructions: None,
            style_profile: None,
        }
    }

    /// Adds custom instructions.
    pub fn with_custom_instructions(mut self, text: impl Into<String>) -> Self {
        self.custom_instructions = Some(text.into());
        self
    }

    /// Adds a style profile.
    pub fn with_style_profile(mut self, text: impl Into<String>) -> Self {
        self.style_profile = Some(text.into());
        self
    }

    /// Renders the system message: instructions, then custom instructions,
    /// then style profile. Absent or blank parts are omitted.
    pub fn system_prompt(&self) -> String {
        let mut parts = Vec::new();
        if !self.instructions.trim().is_empty() {
            parts.push(self.instructions.trim().to_string());
        }
        if let Some(custom) = self.custom_instructions.as_deref().map(str::trim) {
            if !custom.is_empty() {
                parts.push(format!("## Custom Instructions\n\n{}", custom));
            }
        }
        if let Some(style) = self.style_profile.as_deref().map(str::trim) {
            if !style.is_empty() {
                parts.push(format!("## Style Profile\n\n{}", style));
            }
        }
        parts.join("\n\n")
    }
}

impl From<&AgentConfig> for AgentProfile {
    fn from(config: &AgentConfig) -> Self {
        Self {
            instructions: config.instructions.clone(),
            custom_instructions: config.custom_instructions.clone(),
            style_profile: config.style_profile.clone(),
        }
    }
}

/// Model parameters for one role.
#[derive(Debug, Clone, Default, PartialEq, derive_getters::Getters)]
pub struct AgentSettings {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl AgentSettings {
    /// Explicit settings.
    pub fn new(model: Option<String>, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
        }
    }

    /// Role override first, then the configured defaults.
    pub fn resolve(agent: Option<&AgentConfig>, defaults: &ModelDefaults) -> Self {
        Self {
            model: agent
                .and_then(|a| a.model.clone())
                .or_else(|| defaults.model.clone()),
            temperature: agent.and_then(|a| a.temperature).or(defaults.temperature),
            max_tokens: agent.and_then(|a| a.max_tokens).or(defaults.max_tokens),
        }
    }
}

/// Text and usage produced by one agent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    /// Full generated text; may be empty
    pub text: String,
    /// Reported or estimated usage
    pub usage: TokenUsage,
    /// Whether `usage` was estimated because the provider reported none
    pub usage_estimated: bool,
}

/// One named role bound to a completion driver.
#[derive(Clone)]
pub struct GenerationAgent {
    role: AgentRole,
    profile: AgentProfile,
    settings: AgentSettings,
    retry: RetryConfig,
    driver: Arc<dyn CompletionDriver>,
}

impl std::fmt::Debug for GenerationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationAgent")
            .field("role", &self.role)
            .field("settings", &self.settings)
            .field("provider", &self.driver.provider_name())
            .finish()
    }
}

impl GenerationAgent {
    /// Creates an agent with the default retry policy.
    pub fn new(
        role: AgentRole,
        profile: AgentProfile,
        settings: AgentSettings,
        driver: Arc<dyn CompletionDriver>,
    ) -> Self {
        Self {
            role,
            profile,
            settings,
            retry: RetryConfig::default(),
            driver,
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The role this agent plays.
    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Instruction profile.
    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Model parameters.
    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Builds the completion request: system message from the profile,
    /// followed by `messages` unchanged.
    pub fn build_request(&self, messages: &[Message]) -> ScriptoriumResult<GenerateRequest> {
        let system = self.profile.system_prompt();
        let mut all = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            all.push(Message::system(system));
        }
        all.extend_from_slice(messages);

        GenerateRequest::builder()
            .messages(all)
            .model(self.settings.model.clone())
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .build()
            .map_err(|e| BuilderError::from(e.to_string()).into())
    }

    /// Runs the role once.
    ///
    /// With a chunk sender, the driver is streamed and each non-empty text
    /// chunk is sent as it arrives. Retryable failures are retried with
    /// jittered exponential backoff, but only while no chunk of the failing
    /// attempt has been forwarded.
    ///
    /// # Errors
    ///
    /// Surfaces the completion service's typed failure. An empty completion
    /// is a success with empty text.
    #[instrument(skip_all, fields(role = %self.role, messages = messages.len()))]
    pub async fn execute(
        &self,
        messages: &[Message],
        chunks: Option<mpsc::UnboundedSender<String>>,
    ) -> ScriptoriumResult<AgentOutput> {
        let request = self.build_request(messages)?;

        let retries = if self.retry.enabled {
            self.retry.max_retries
        } else {
            0
        };
        let strategy = ExponentialBackoff::from_millis(self.retry.initial_backoff_ms.max(1))
            .factor(2)
            .max_delay(Duration::from_secs(self.retry.max_delay_secs))
            .map(jitter)
            .take(retries);

        let this = self;
        let request = &request;
        let chunks = chunks.as_ref();
        let output = Retry::spawn(strategy, move || async move {
            this.attempt(request, chunks).await
        })
        .await?;

        info!(
            chars = output.text.len(),
            input_tokens = *output.usage.input_tokens(),
            output_tokens = *output.usage.output_tokens(),
            estimated = output.usage_estimated,
            "Agent call finished"
        );
        Ok(output)
    }

    async fn attempt(
        &self,
        request: &GenerateRequest,
        chunks: Option<&mpsc::UnboundedSender<String>>,
    ) -> Result<AgentOutput, RetryError<ScriptoriumError>> {
        let Some(tx) = chunks else {
            let response = self
                .driver
                .generate(request)
                .await
                .map_err(|e| self.classify(e, false))?;
            return Ok(self.finish(request, response.text, response.usage));
        };

        let mut stream = self
            .driver
            .generate_stream(request)
            .await
            .map_err(|e| self.classify(e, false))?;

        let mut text = String::new();
        let mut usage = None;
        let mut forwarded = false;

        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|e| self.classify(e, forwarded))?;
            if let Some(reported) = chunk.usage() {
                usage = Some(*reported);
            }
            if chunk.text().is_empty() {
                continue;
            }
            text.push_str(chunk.text());
            forwarded = true;
            if tx.send(chunk.text().clone()).is_err() {
                debug!("Chunk receiver dropped");
            }
        }

        Ok(self.finish(request, text, usage))
    }

    fn classify(&self, err: ScriptoriumError, forwarded: bool) -> RetryError<ScriptoriumError> {
        let retryable = !forwarded && err.as_completion().is_some_and(|c| c.is_retryable());
        if retryable {
            warn!(role = %self.role, error = %err, "Completion failed, will retry");
            RetryError::Transient {
                err,
                retry_after: None,
            }
        } else {
            warn!(role = %self.role, error = %err, forwarded, "Completion failed permanently");
            RetryError::Permanent(err)
        }
    }

    fn finish(
        &self,
        request: &GenerateRequest,
        text: String,
        usage: Option<TokenUsage>,
    ) -> AgentOutput {
        match usage {
            Some(usage) => AgentOutput {
                text,
                usage,
                usage_estimated: false,
            },
            None => {
                let input = request
                    .messages()
                    .iter()
                    .map(|m| TokenUsage::estimate(&m.content))
                    .sum::<u64>();
                let output = TokenUsage::estimate(&text);
                AgentOutput {
                    text,
                    usage: TokenUsage::new(input, output),
                    usage_estimated: true,
                }
            }
        }
    }
}

/// The configured agent for every role a pipeline may use.
#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    agents: HashMap<AgentRole, GenerationAgent>,
}

impl AgentRoster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an agent for every role present in `config`, all sharing one driver.
    pub fn from_config(config: &ScriptoriumConfig, driver: Arc<dyn CompletionDriver>) -> Self {
        use strum::IntoEnumIterator;

        let mut roster = Self::new();
        for role in AgentRole::iter() {
            let Some(agent_config) = config.agent(role) else {
                debug!(role = %role, "No agent configured for role");
                continue;
            };
            let agent = GenerationAgent::new(
                role,
                AgentProfile::from(agent_config),
                AgentSettings::resolve(Some(agent_config), &config.defaults),
                driver.clone(),
            )
            .with_retry(config.retry.clone());
            roster.insert(agent);
        }
        roster
    }

    /// Adds or replaces the agent for its role.
    pub fn insert(&mut self, agent: GenerationAgent) {
        self.agents.insert(agent.role(), agent);
    }

    /// Whether a role has an agent.
    pub fn contains(&self, role: AgentRole) -> bool {
        self.agents.contains_key(&role)
    }

    /// The agent for a role.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineErrorKind::MissingAgent`] if the role is not configured.
    pub fn agent(&self, role: AgentRole) -> ScriptoriumResult<&GenerationAgent> {
        self.agents.get(&role).ok_or_else(|| {
            PipelineError::new(PipelineErrorKind::MissingAgent(role.to_string())).into()
        })
    }

    /// Number of configured roles.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no role is configured.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_override_beats_defaults() {
        let defaults = ModelDefaults {
            model: Some("base".into()),
            temperature: Some(0.7),
            max_tokens: Some(1000),
        };
        let agent = AgentConfig {
            temperature: Some(0.2),
            ..Default::default()
        };
        let settings = AgentSettings::resolve(Some(&agent), &defaults);
        assert_eq!(settings.model().as_deref(), Some("base"));
        assert_eq!(*settings.temperature(), Some(0.2));
        assert_eq!(*settings.max_tokens(), Some(1000));
    }

    #[test]
    fn test_system_prompt_skips_blank_sections() {
        let profile = AgentProfile::new("Plan.").with_custom_instructions("   ");
        assert_eq!(profile.system_prompt(), "Plan.");
    }
}
