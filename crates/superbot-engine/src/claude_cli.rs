use std::process::Stdio;
use std::time::Duration;

use superbot_models::committee::StageRole;
use superbot_models::config::{CommitteeConfig, SignalsConfig};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
}

impl ClaudeCliConfig {
    /// Stage settings from the committee section: per-role model override, shared timeout.
    pub fn for_role(committee: &CommitteeConfig, role: StageRole) -> Self {
        let model = match role {
            StageRole::Strategist => committee.strategist_model.as_ref(),
            StageRole::Skeptic => committee.skeptic_model.as_ref(),
            StageRole::Executor => committee.executor_model.as_ref(),
        }
        .unwrap_or(&committee.model)
        .clone();

        Self {
            model,
            timeout: Duration::from_secs(committee.stage_timeout_seconds),
        }
    }

    /// Settings for the headline summary: `signals.news_model`, else the committee model.
    pub fn for_news(committee: &CommitteeConfig, signals: &SignalsConfig) -> Self {
        Self {
            model: signals
                .news_model
                .clone()
                .unwrap_or_else(|| committee.model.clone()),
            timeout: Duration::from_secs(committee.stage_timeout_seconds),
        }
    }
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            timeout: Duration::from_secs(45),
        }
    }
}

impl ClaudeCliConfig {
    /// Arguments for a one-shot, non-interactive `claude -p` call.
    fn args<'a>(&'a self, system_prompt: &'a str, user_prompt: &'a str) -> [&'a str; 8] {
        [
            "-p",
            user_prompt,
            "--system-prompt",
            system_prompt,
            "--model",
            &self.model,
            "--output-format",
            "text",
        ]
    }
}

/// Run one `claude` CLI call and return its stdout.
///
/// The child is killed if the call times out or the caller's future is dropped,
/// so a reasoning deadline never leaves a stray process behind.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, AgentError> {
    debug!(
        model = %config.model,
        system_len = system_prompt.len(),
        prompt_len = user_prompt.len(),
        "Invoking claude CLI"
    );

    let mut command = Command::new("claude");
    command
        .args(config.args(system_prompt, user_prompt))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(config.timeout, command.output())
        .await
        .map_err(|_| AgentError::Timeout(config.timeout))?
        .map_err(|e| AgentError::Cli(format!("failed to spawn claude: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(status = %output.status, stderr = %stderr.trim(), "Claude CLI failed");
        return Err(AgentError::Cli(format!(
            "claude exited {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.trim().is_empty() {
        return Err(AgentError::Cli("claude returned no output".to_string()));
    }
    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClaudeCliConfig::default();
        assert_eq!(config.model, "claude-sonnet-4-5-20250929");
        assert_eq!(config.timeout, Duration::from_secs(45));
    }

    #[test]
    fn per_role_model_override() {
        let committee = CommitteeConfig {
            model: "claude-3-5-haiku-latest".to_string(),
            executor_model: Some("claude-opus-4-1".to_string()),
            stage_timeout_seconds: 30,
            ..CommitteeConfig::default()
        };

        let strategist = ClaudeCliConfig::for_role(&committee, StageRole::Strategist);
        assert_eq!(strategist.model, "claude-3-5-haiku-latest");
        assert_eq!(strategist.timeout, Duration::from_secs(30));

        let executor = ClaudeCliConfig::for_role(&committee, StageRole::Executor);
        assert_eq!(executor.model, "claude-opus-4-1");

        let mut signals = SignalsConfig::default();
        assert_eq!(
            ClaudeCliConfig::for_news(&committee, &signals).model,
            "claude-3-5-haiku-latest"
        );
        signals.news_model = Some("claude-sonnet-4-5-20250929".to_string());
        assert_eq!(
            ClaudeCliConfig::for_news(&committee, &signals).model,
            "claude-sonnet-4-5-20250929"
        );
    }

    #[test]
    fn args_pass_prompts_and_model() {
        let config = ClaudeCliConfig::default();
        let args = config.args("be skeptical", "{\"symbols\":[\"BTCUSD\"]}");

        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "{\"symbols\":[\"BTCUSD\"]}");
        assert_eq!(args[3], "be skeptical");
        assert_eq!(args[5], "claude-sonnet-4-5-20250929");
        assert_eq!(args[7], "text");
    }
}
