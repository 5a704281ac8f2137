use crate::workstation::{runtime, AgentArgs, Workstation};
use anyhow::Result;
use vibe_conductor::env::ensure_task_worktree;
use vibe_conductor::lifecycle::EventLog;
use vibe_conductor::{
    fetch_context, LifecyclePrompts, LifecycleReport, MergeStatus, Orchestrator, PhaseSelection,
};
use vibe_github::GhCli;
use vibe_store::AutomationSettings;

/// Execute `vibe cleanup` in the current task worktree.
pub fn execute(ws: &Workstation, agent: &AgentArgs, json_events: bool) -> Result<()> {
    let cwd = std::env::current_dir()?;
    ensure_task_worktree(&cwd)?;

    let store = ws.store();
    let settings = AutomationSettings::load(&store)?;
    if !settings.automatically_create_pr {
        tracing::info!("automaticallyCreatePR is off, nothing to do");
        return Ok(());
    }
    let prompts = LifecyclePrompts::load(&store, &settings)?;
    let client = ws.task_client()?;
    let invoker = agent.invoker(&cwd, !json_events);

    runtime()?.block_on(async {
        let ctx = fetch_context(&client, &GhCli::new(&cwd), &cwd).await?;
        let git = GhCli::new(&cwd).with_attempt(ctx.attempt_id());
        let mut orchestrator = Orchestrator::new(&git, &client, &invoker, settings, prompts)
            .with_phases(PhaseSelection::all())
            .with_invoke_options(agent.options())
            .with_events(EventLog::new().with_stdout_json(json_events));
        let report = orchestrator.run(&ctx, None).await?;
        if !json_events {
            print_report(&report);
        }
        Ok::<_, anyhow::Error>(())
    })
}

pub fn print_report(report: &LifecycleReport) {
    match &report.pr_url {
        Some(url) if report.pr_reused => println!("PR (existing): {url}"),
        Some(url) => println!("PR: {url}"),
        None => println!("No PR work done."),
    }
    if let Some(ok) = report.review {
        println!("Review: {}", if ok { "completed" } else { "failed (ignored)" });
    }
    match &report.merge {
        MergeStatus::NotAttempted => {}
        MergeStatus::Merged | MergeStatus::MergedWithCheckoutWarning => println!("Merge: merged"),
        MergeStatus::Failed { kind, message } => println!("Merge: {kind} failure ({message})"),
        MergeStatus::Delegated { agent_ok } => println!(
            "Merge: delegated to agent ({})",
            if *agent_ok { "finished" } else { "failed" }
        ),
    }
    if let Some(sync) = &report.sync {
        println!("Task status: {sync}");
    }
}
