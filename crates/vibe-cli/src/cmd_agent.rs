use crate::cmd_cleanup::print_report;
use crate::workstation::{runtime, AgentArgs, Workstation};
use anyhow::{bail, Result};
use std::io::Read;
use vibe_conductor::agent::{AgentInvoker, AgentPhase};
use vibe_conductor::env::ensure_task_worktree;
use vibe_conductor::lifecycle::EventLog;
use vibe_conductor::prompt::{compose, PreferenceContext};
use vibe_conductor::{fetch_context, LifecyclePrompts, Orchestrator, PhaseSelection};
use vibe_github::GhCli;
use vibe_store::AutomationSettings;

/// Merging needs a PR, so `--merge` implies `--create-pr`.
pub fn selection(create_pr: bool, review: bool, merge: bool) -> PhaseSelection {
    PhaseSelection {
        create_pr: create_pr || merge,
        review,
        merge,
    }
}

/// Execute `vibe agent`: run the agent on the stdin prompt, then the selected phases.
pub fn execute(
    ws: &Workstation,
    phases: PhaseSelection,
    agent: &AgentArgs,
    json_events: bool,
) -> Result<()> {
    let mut prompt = String::new();
    std::io::stdin().read_to_string(&mut prompt)?;
    if prompt.trim().is_empty() {
        bail!("no prompt provided on stdin");
    }

    let cwd = std::env::current_dir()?;
    let store = ws.store();
    let full_prompt = compose(&prompt, &PreferenceContext::load(&store)?);
    let invoker = agent.invoker(&cwd, !json_events);
    invoker.verify_available()?;

    runtime()?.block_on(async {
        let summary = invoker
            .invoke(AgentPhase::Task, &full_prompt, &agent.options())
            .await?;
        if let Some(cost) = summary.cost_usd() {
            tracing::info!(cost_usd = cost, "agent finished");
        }

        if !(phases.create_pr || phases.review) {
            return Ok(());
        }
        ensure_task_worktree(&cwd)?;
        let settings = AutomationSettings::load(&store)?;
        let prompts = LifecyclePrompts::load(&store, &settings)?;
        let client = ws.task_client()?;
        let ctx = fetch_context(&client, &GhCli::new(&cwd), &cwd).await?;
        let git = GhCli::new(&cwd).with_attempt(ctx.attempt_id());
        let mut orchestrator = Orchestrator::new(&git, &client, &invoker, settings, prompts)
            .with_phases(phases)
            .with_invoke_options(agent.options())
            .with_events(EventLog::new().with_stdout_json(json_events));

        if phases.create_pr {
            let report = orchestrator.run(&ctx, Some(prompt.as_str())).await?;
            if !json_events {
                print_report(&report);
            }
        } else if orchestrator.review_only(&ctx, Some(prompt.as_str())).await.is_none() {
            tracing::info!("review disabled or no review prompt configured");
        }
        Ok::<_, anyhow::Error>(())
    })
}
