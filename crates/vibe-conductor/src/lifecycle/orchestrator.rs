use super::context::RunContext;
use super::event_log::{Event, EventLog};
use super::machine::{LifecycleRun, LifecycleState};
use super::sync::{sync_task_status, SyncOutcome};
use crate::agent::{new_run_key, phase_session_id, AgentInvoker, AgentPhase, InvokeOptions};
use crate::ports::TaskService;
use crate::prompt::{compose, merge_prompt, review_prompt, PreferenceContext, TemplateVars};
use crate::LifecycleError;
use std::time::Instant;
use vibe_github::{
    GitHost, GitHubError, GitHubErrorCode, MergeFailureKind, MergeMethod, MergeOutcome,
    MergeRequest, PrRequest,
};
use vibe_kanban_api::Task;
use vibe_store::{AutomationSettings, MergeDecisionMode, PreferenceStore, StoreError};

use LifecycleState as S;

/// Which optional phases a caller allows. Settings still gate each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSelection {
    pub create_pr: bool,
    pub review: bool,
    pub merge: bool,
}

impl PhaseSelection {
    pub fn all() -> Self {
        Self {
            create_pr: true,
            review: true,
            merge: true,
        }
    }
}

impl Default for PhaseSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Prompt material read from the preference store once per run.
#[derive(Debug, Clone, Default)]
pub struct LifecyclePrompts {
    pub context: PreferenceContext,
    pub review_template: Option<String>,
    pub merge_template: String,
}

impl LifecyclePrompts {
    pub fn load(store: &PreferenceStore, settings: &AutomationSettings) -> Result<Self, StoreError> {
        Ok(Self {
            context: PreferenceContext::load(store)?,
            review_template: store.review_template()?,
            merge_template: store.merge_template(settings)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MergeStatus {
    #[default]
    NotAttempted,
    Merged,
    /// Merged on GitHub; switching the local checkout afterwards failed.
    MergedWithCheckoutWarning,
    Failed {
        kind: MergeFailureKind,
        message: String,
    },
    /// `claude-decision` mode: the agent decides and merges itself.
    Delegated { agent_ok: bool },
}

impl MergeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAttempted => "not_attempted",
            Self::Merged => "merged",
            Self::MergedWithCheckoutWarning => "merged_with_checkout_warning",
            Self::Failed { .. } => "failed",
            Self::Delegated { .. } => "delegated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleReport {
    pub final_state: LifecycleState,
    pub history: Vec<LifecycleState>,
    pub pr_url: Option<String>,
    pub pr_reused: bool,
    pub pushed: bool,
    /// `Some(ok)` when the review agent ran.
    pub review: Option<bool>,
    pub merge: MergeStatus,
    pub sync: Option<SyncOutcome>,
}

impl Default for LifecycleReport {
    fn default() -> Self {
        Self {
            final_state: S::Idle,
            history: Vec::new(),
            pr_url: None,
            pr_reused: false,
            pushed: false,
            review: None,
            merge: MergeStatus::NotAttempted,
            sync: None,
        }
    }
}

/// Drives one task worktree through PR creation, review, merge and status sync.
pub struct Orchestrator<'a> {
    git: &'a dyn GitHost,
    tasks: &'a dyn TaskService,
    agent: &'a dyn AgentInvoker,
    settings: AutomationSettings,
    prompts: LifecyclePrompts,
    phases: PhaseSelection,
    invoke: InvokeOptions,
    events: EventLog,
    run_key: String,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        git: &'a dyn GitHost,
        tasks: &'a dyn TaskService,
        agent: &'a dyn AgentInvoker,
        settings: AutomationSettings,
        prompts: LifecyclePrompts,
    ) -> Self {
        Self {
            git,
            tasks,
            agent,
            settings,
            prompts,
            phases: PhaseSelection::all(),
            invoke: InvokeOptions::default(),
            events: EventLog::new(),
            run_key: new_run_key(),
        }
    }

    pub fn with_phases(mut self, phases: PhaseSelection) -> Self {
        self.phases = phases;
        self
    }

    /// Timeout and extra arguments for every agent phase.
    pub fn with_invoke_options(mut self, options: InvokeOptions) -> Self {
        self.invoke = options;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    /// Run the lifecycle. `task_prompt` is the prompt the task agent ran with;
    /// the task's title and description stand in when it is unknown.
    ///
    /// Push and PR creation failures end the run with an error. Review and
    /// merge failures are logged and recorded in the report.
    pub async fn run(
        &mut self,
        ctx: &RunContext,
        task_prompt: Option<&str>,
    ) -> Result<LifecycleReport, LifecycleError> {
        let started = Instant::now();
        self.run_key = new_run_key();
        let mut run = LifecycleRun::new();
        let mut report = LifecycleReport::default();
        self.events.record(Event::RunStart {
            task_id: ctx.task_id().to_string(),
            attempt_id: ctx.attempt_id().to_string(),
            branch: ctx.branch.clone(),
        });

        let result = self.drive(&mut run, &mut report, ctx, task_prompt).await;
        match result {
            Ok(()) => {
                report.final_state = run.state();
                report.history = run.history().to_vec();
                self.events.record(Event::RunFinished {
                    state: run.state(),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                tracing::info!(
                    task_id = %ctx.task_id(),
                    pr = report.pr_url.as_deref().unwrap_or("-"),
                    merge = report.merge.as_str(),
                    "lifecycle finished"
                );
                Ok(report)
            }
            Err(e) => {
                let failed_in = run.state();
                run.fail();
                tracing::error!(state = %failed_in, error = %e, "lifecycle failed");
                self.events.record(Event::RunFailed {
                    state: failed_in,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Review phase on its own, outside a PR run. `None` when review is
    /// disabled or no template is configured.
    pub async fn review_only(&mut self, ctx: &RunContext, task_prompt: Option<&str>) -> Option<bool> {
        if !self.review_enabled() {
            return None;
        }
        Some(self.review(ctx, task_prompt).await)
    }

    async fn drive(
        &mut self,
        run: &mut LifecycleRun,
        report: &mut LifecycleReport,
        ctx: &RunContext,
        task_prompt: Option<&str>,
    ) -> Result<(), LifecycleError> {
        if !self.phases.create_pr || !self.settings.automatically_create_pr {
            tracing::info!("automatic PR creation disabled, nothing to do");
            return self.enter(run, S::Done);
        }

        self.enter(run, S::PrCheck)?;
        self.preflight().await?;
        let existing = self.git.list_open_prs(&ctx.branch).await.into_iter().next();
        if let Some(pr) = &existing {
            tracing::info!(pr = %pr.pr_info.url, "open PR found for branch");
        }

        self.enter(run, S::PrPush)?;
        if self.git.remote_sync(&ctx.branch).await.needs_push() {
            self.git.push_branch(&ctx.branch).await?;
            report.pushed = true;
            tracing::info!(branch = %ctx.branch, "branch pushed");
        } else {
            tracing::debug!(branch = %ctx.branch, "remote branch up to date");
        }

        self.enter(run, S::PrCreateOrReuse)?;
        let pr_url = match existing {
            Some(pr) => {
                report.pr_reused = true;
                pr.pr_info.url
            }
            None => {
                let request = PrRequest {
                    title: ctx.task.title.clone(),
                    body: ctx.task.description.clone(),
                    base: Some(self.settings.base_branch.clone()),
                    head: Some(ctx.branch.clone()),
                };
                let url = self.git.create_pr(&request).await?;
                tracing::info!(pr = %url, base = %self.settings.base_branch, "PR ready");
                url
            }
        };
        self.events.record(Event::PrReady {
            url: pr_url.clone(),
            reused: report.pr_reused,
        });
        report.pr_url = Some(pr_url.clone());

        if self.review_enabled() {
            self.enter(run, S::Review)?;
            report.review = Some(self.review(ctx, task_prompt).await);
        }

        if self.phases.merge && self.settings.merge_enabled() {
            self.enter(run, S::MergeDecision)?;
            report.merge = match self.settings.merge_decision_mode {
                MergeDecisionMode::Always => {
                    self.enter(run, S::MergeExecute)?;
                    self.execute_merge(&pr_url).await
                }
                MergeDecisionMode::ClaudeDecision => self.delegate_merge(ctx, &pr_url).await,
            };
            self.events.record(Event::MergeFinished {
                outcome: report.merge.as_str().to_string(),
            });
        } else {
            tracing::info!(pr = %pr_url, "auto-merge disabled, PR left open");
        }

        self.enter(run, S::StatusSync)?;
        let outcome = sync_task_status(self.git, self.tasks, ctx.task_id(), &ctx.branch).await?;
        self.events.record(Event::StatusSynced {
            outcome: outcome.to_string(),
        });
        report.sync = Some(outcome);

        self.enter(run, S::Done)
    }

    fn enter(&mut self, run: &mut LifecycleRun, to: LifecycleState) -> Result<(), LifecycleError> {
        run.advance(to)?;
        self.events.record(Event::StateEntered { state: to });
        Ok(())
    }

    async fn preflight(&self) -> Result<(), GitHubError> {
        if !self.git.check_installed().await {
            return Err(GitHubError::new(
                GitHubErrorCode::NotInstalled,
                "GitHub CLI (gh) is not installed",
            ));
        }
        if !self.git.check_authenticated().await {
            return Err(GitHubError::new(
                GitHubErrorCode::NotAuthenticated,
                "GitHub CLI is not authenticated. Run: gh auth login",
            ));
        }
        Ok(())
    }

    fn review_enabled(&self) -> bool {
        self.phases.review
            && self.settings.do_code_review_before_finishing
            && self.prompts.review_template.is_some()
    }

    async fn review(&mut self, ctx: &RunContext, task_prompt: Option<&str>) -> bool {
        let Some(template) = self.prompts.review_template.as_deref() else {
            return false;
        };
        let task_prompt = match task_prompt {
            Some(p) if !p.trim().is_empty() => p.to_string(),
            _ => describe_task(&ctx.task),
        };
        let prompt = compose(&review_prompt(&task_prompt, template), &self.prompts.context);
        let ok = self.invoke_agent(AgentPhase::Review, &prompt, ctx).await;

        // The review may have committed fixups.
        let sync = self.git.remote_sync(&ctx.branch).await;
        if sync.ahead.is_some_and(|n| n > 0) {
            match self.git.push_branch(&ctx.branch).await {
                Ok(()) => tracing::info!(branch = %ctx.branch, "pushed review commits"),
                Err(e) => tracing::warn!(error = %e, "could not push review commits"),
            }
        }
        ok
    }

    async fn execute_merge(&self, pr_url: &str) -> MergeStatus {
        let request = MergeRequest {
            pr: Some(pr_url.to_string()),
            method: MergeMethod::Squash,
            body: None,
            delete_branch: true,
        };
        match self.git.merge_pr(&request).await {
            Ok(MergeOutcome::Merged) => {
                tracing::info!(pr = %pr_url, "PR merged");
                MergeStatus::Merged
            }
            Ok(MergeOutcome::MergedWithCheckoutWarning { stderr }) => {
                tracing::info!(pr = %pr_url, stderr = %stderr.trim(), "PR merged; local checkout skipped");
                MergeStatus::MergedWithCheckoutWarning
            }
            Err(e) => {
                let kind = e.merge_failure_kind();
                tracing::warn!(pr = %pr_url, kind = %kind, error = %e, "merge failed");
                MergeStatus::Failed {
                    kind,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn delegate_merge(&mut self, ctx: &RunContext, pr_url: &str) -> MergeStatus {
        let vars = TemplateVars {
            task_id: Some(ctx.task.id.clone()),
            project_id: Some(ctx.task.project_id.clone()),
            task_title: Some(ctx.task.title.clone()),
            task_description: ctx.task.description.clone(),
            pr_url: Some(pr_url.to_string()),
            ..Default::default()
        };
        let prompt = merge_prompt(&self.prompts.merge_template, &vars, &self.prompts.context);
        let agent_ok = self
            .invoke_agent(AgentPhase::MergeDecision, &prompt, ctx)
            .await;
        if !agent_ok {
            tracing::warn!(pr = %pr_url, "merge evaluation failed; status sync decides the outcome");
        }
        MergeStatus::Delegated { agent_ok }
    }

    /// Advisory agent run: failures are logged and reported as `false`.
    async fn invoke_agent(&mut self, phase: AgentPhase, prompt: &str, ctx: &RunContext) -> bool {
        let options = self
            .invoke
            .clone()
            .with_session(phase_session_id(ctx.attempt_id(), phase, &self.run_key));
        tracing::info!(phase = %phase, "starting agent");
        let (ok, cost_usd, error) = match self.agent.invoke(phase, prompt, &options).await {
            Ok(summary) if summary.reported_error() => {
                tracing::warn!(phase = %phase, "agent reported an error");
                (false, summary.cost_usd(), None)
            }
            Ok(summary) => (true, summary.cost_usd(), None),
            Err(e) => {
                tracing::warn!(phase = %phase, error = %e, "agent phase failed, continuing");
                (false, None, Some(e.to_string()))
            }
        };
        self.events.record(Event::AgentFinished {
            phase: phase.to_string(),
            ok,
            cost_usd,
            error,
        });
        ok
    }
}

fn describe_task(task: &Task) -> String {
    match task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(description) => format!("{}\n\n{}", task.title, description),
        None => task.title.clone(),
    }
}
