use crate::workstation::{runtime, Workstation};
use anyhow::Result;
use vibe_conductor::env::ensure_task_worktree;
use vibe_conductor::{fetch_context, sync_task_status};
use vibe_github::GhCli;

/// Execute `vibe sync-status` in the current task worktree.
pub fn execute(ws: &Workstation) -> Result<()> {
    let cwd = std::env::current_dir()?;
    ensure_task_worktree(&cwd)?;
    let client = ws.task_client()?;

    runtime()?.block_on(async {
        let ctx = fetch_context(&client, &GhCli::new(&cwd), &cwd).await?;
        let git = GhCli::new(&cwd).with_attempt(ctx.attempt_id());
        let outcome = sync_task_status(&git, &client, ctx.task_id(), &ctx.branch).await?;
        println!("Task status: {outcome}");
        Ok::<_, anyhow::Error>(())
    })
}
