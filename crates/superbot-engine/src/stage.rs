use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use superbot_models::committee::{ExecutorDecision, SkepticCritique, StageRole, StrategistProposal};
use superbot_models::config::CommitteeConfig;

use crate::claude_cli::{invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;
use crate::parser::parse_stage_output;
use crate::prompts::system_prompt;
use crate::state::RunState;

/// A member of the reasoning committee. Mockable for testing.
///
/// A stage reads the whole run state and returns only its own record. Absent
/// analyses are degraded input, not a reason to fail; any `Err` is fatal to the run.
#[async_trait]
pub trait ReasoningStage: Send + Sync {
    type Output: Send + 'static;

    fn role(&self) -> StageRole;

    async fn reason(&self, state: &RunState) -> Result<Self::Output, AgentError>;
}

/// A stage that invokes the Claude CLI with the role's system prompt.
pub struct ClaudeStage<T> {
    role: StageRole,
    cli_config: ClaudeCliConfig,
    _output: PhantomData<fn() -> T>,
}

impl<T> ClaudeStage<T> {
    fn with_role(role: StageRole, committee: &CommitteeConfig) -> Self {
        Self {
            role,
            cli_config: ClaudeCliConfig::for_role(committee, role),
            _output: PhantomData,
        }
    }

    pub fn model(&self) -> &str {
        &self.cli_config.model
    }
}

impl ClaudeStage<StrategistProposal> {
    pub fn strategist(committee: &CommitteeConfig) -> Self {
        Self::with_role(StageRole::Strategist, committee)
    }
}

impl ClaudeStage<SkepticCritique> {
    pub fn skeptic(committee: &CommitteeConfig) -> Self {
        Self::with_role(StageRole::Skeptic, committee)
    }
}

impl ClaudeStage<ExecutorDecision> {
    pub fn executor(committee: &CommitteeConfig) -> Self {
        Self::with_role(StageRole::Executor, committee)
    }
}

#[async_trait]
impl<T> ReasoningStage for ClaudeStage<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn role(&self) -> StageRole {
        self.role
    }

    async fn reason(&self, state: &RunState) -> Result<T, AgentError> {
        let system_prompt = system_prompt(self.role);
        let user_prompt = serde_json::to_string_pretty(state)?;
        let raw_output = invoke_claude(&system_prompt, &user_prompt, &self.cli_config).await?;
        parse_stage_output(&raw_output)
    }
}
