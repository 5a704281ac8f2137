use std::path::PathBuf;
use vibe_github::GitHubError;
use vibe_kanban_api::ApiError;
use vibe_store::StoreError;

/// Failures of a single agent invocation.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to start {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("agent exited with code {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "none (killed by signal)".into()))]
    Exit { code: Option<i32> },
    #[error("agent timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("cannot write prompt file: {0}")]
    PromptFile(#[source] std::io::Error),
    #[error("agent I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a lifecycle run.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("not running inside a task worktree: {}", .0.display())]
    NotAWorktree(PathBuf),
    #[error("task API: {0}")]
    Api(#[from] ApiError),
    #[error("github: {0}")]
    GitHub(#[from] GitHubError),
    #[error("preferences: {0}")]
    Store(#[from] StoreError),
    #[error("agent: {0}")]
    Agent(#[from] AgentError),
    #[error("invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        from: crate::lifecycle::LifecycleState,
        to: crate::lifecycle::LifecycleState,
    },
}
