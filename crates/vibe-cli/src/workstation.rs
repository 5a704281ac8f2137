//! Process-wide wiring: preference store, task API client, agent settings.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vibe_conductor::agent::{ClaudeCliInvoker, InvokeOptions};
use vibe_kanban_api::{ApiConfig, TaskApiClient};
use vibe_store::PreferenceStore;

/// Environment variable naming the agent binary.
pub const CLAUDE_BIN_ENV: &str = "VIBE_CLAUDE_BIN";

pub struct Workstation {
    prefs_dir: Option<PathBuf>,
    api_url: Option<String>,
}

impl Workstation {
    pub fn new(prefs_dir: Option<PathBuf>, api_url: Option<String>) -> Self {
        Self { prefs_dir, api_url }
    }

    pub fn store(&self) -> PreferenceStore {
        match &self.prefs_dir {
            Some(dir) => PreferenceStore::new(dir),
            None => PreferenceStore::from_env(),
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::from_env();
        match &self.api_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    pub fn task_client(&self) -> Result<TaskApiClient> {
        Ok(TaskApiClient::new(&self.api_config())?)
    }
}

/// Agent flags shared by `cleanup` and `agent`.
#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Claude CLI binary [default: $VIBE_CLAUDE_BIN or claude]
    #[arg(long)]
    pub claude_bin: Option<PathBuf>,
    /// Hard timeout per agent run, in seconds
    #[arg(long, default_value_t = 300)]
    pub agent_timeout_secs: u64,
    /// Extra argument passed to the agent (repeatable); fixed flags cannot be overridden
    #[arg(long = "agent-arg", allow_hyphen_values = true)]
    pub agent_args: Vec<String>,
}

impl AgentArgs {
    pub fn claude_bin(&self) -> PathBuf {
        self.claude_bin
            .clone()
            .or_else(|| std::env::var_os(CLAUDE_BIN_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("claude"))
    }

    /// `echo` streams the agent's stdout through ours.
    pub fn invoker(&self, cwd: &Path, echo: bool) -> ClaudeCliInvoker {
        ClaudeCliInvoker::new(cwd)
            .with_bin(self.claude_bin())
            .with_echo(echo)
    }

    pub fn options(&self) -> InvokeOptions {
        InvokeOptions {
            timeout: Duration::from_secs(self.agent_timeout_secs),
            extra_args: self.agent_args.clone(),
            session_id: None,
        }
    }
}

/// Runtime for one command.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
