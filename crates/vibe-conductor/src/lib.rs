//! PR lifecycle orchestration for Vibe Kanban task worktrees.
//!
//! A run resolves the worktree to its task, then creates or reuses a pull
//! request, optionally has the agent review it, merges it (directly or via
//! the agent) and finally reconciles the task status with GitHub.

pub mod agent;
pub mod env;
mod error;
pub mod lifecycle;
pub mod ports;
pub mod prompt;

pub use error::{AgentError, LifecycleError};
pub use lifecycle::{
    fetch_context, sync_task_status, LifecyclePrompts, LifecycleReport, LifecycleState,
    MergeStatus, Orchestrator, PhaseSelection, RunContext, SyncOutcome,
};
pub use ports::TaskService;
