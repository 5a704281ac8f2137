use crate::env::ensure_task_worktree;
use crate::ports::TaskService;
use crate::LifecycleError;
use std::path::{Path, PathBuf};
use vibe_github::GitHost;
use vibe_kanban_api::{ContainerInfo, Task, TaskAttempt};

/// Everything a lifecycle run knows about the task behind a worktree.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub worktree: PathBuf,
    pub container: ContainerInfo,
    pub attempt: TaskAttempt,
    pub task: Task,
    pub branch: String,
}

impl RunContext {
    pub fn task_id(&self) -> &str {
        &self.task.id
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt.id
    }
}

/// Resolve the worktree to its task attempt and task.
///
/// Fails with [`LifecycleError::NotAWorktree`] before any network call when
/// `worktree` is not a task worktree.
pub async fn fetch_context(
    tasks: &dyn TaskService,
    git: &dyn GitHost,
    worktree: &Path,
) -> Result<RunContext, LifecycleError> {
    ensure_task_worktree(worktree)?;

    let path = worktree.to_string_lossy();
    let container = tasks.get_container_info(&path).await?;
    let (attempt, task) = tokio::try_join!(
        tasks.get_task_attempt(&container.attempt_id),
        tasks.get_task(&container.task_id),
    )?;

    let branch = match attempt.branch.as_deref().filter(|b| !b.is_empty()) {
        Some(branch) => branch.to_string(),
        None => git.current_branch().await?,
    };

    tracing::info!(
        task_id = %task.id,
        attempt_id = %attempt.id,
        branch = %branch,
        "resolved task worktree"
    );

    Ok(RunContext {
        worktree: worktree.to_path_buf(),
        container,
        attempt,
        task,
        branch,
    })
}
