use crate::ports::TaskService;
use crate::LifecycleError;
use std::fmt;
use vibe_github::{GitHost, PrStateFilter};
use vibe_kanban_api::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Task was already done or cancelled; nothing checked.
    AlreadyFinal(TaskStatus),
    NoMergedPr,
    Updated { from: TaskStatus, pr_url: String },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyFinal(status) => write!(f, "task already {status}"),
            Self::NoMergedPr => f.write_str("no merged PR"),
            Self::Updated { from, pr_url } => write!(f, "{from} -> done ({pr_url})"),
        }
    }
}

/// Mark the task done when a merged PR exists for `branch`.
///
/// Re-reads the task first, so running it again after a successful update
/// is a no-op.
pub async fn sync_task_status(
    git: &dyn GitHost,
    tasks: &dyn TaskService,
    task_id: &str,
    branch: &str,
) -> Result<SyncOutcome, LifecycleError> {
    let task = tasks.get_task(task_id).await?;
    if task.status.is_final() {
        tracing::info!(task_id, status = %task.status, "task already final, skipping status sync");
        return Ok(SyncOutcome::AlreadyFinal(task.status));
    }

    let prs = git.list_prs(branch, PrStateFilter::All).await;
    let Some(merged) = prs.iter().find(|pr| pr.pr_info.is_merged()) else {
        tracing::info!(task_id, branch, "no merged PR for branch");
        return Ok(SyncOutcome::NoMergedPr);
    };

    tasks.update_task_status(task_id, TaskStatus::Done).await?;
    tracing::info!(
        task_id,
        from = %task.status,
        pr = %merged.pr_info.url,
        "task marked done"
    );
    Ok(SyncOutcome::Updated {
        from: task.status,
        pr_url: merged.pr_info.url.clone(),
    })
}
