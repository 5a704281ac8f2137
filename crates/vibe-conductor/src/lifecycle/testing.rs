//! Recording stubs for lifecycle tests.

use super::RunContext;
use crate::ports::TaskService;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use vibe_github::{
    GitHost, GitHubError, GitHubErrorCode, MergeOutcome, MergeRequest, PrRequest, PrStateFilter,
    RemoteSync,
};
use vibe_kanban_api::{
    ApiError, BranchStatus, ContainerInfo, MergeInfo, MergeKind, PrInfo, PrStatus, Task,
    TaskAttempt, TaskStatus,
};

pub const BRANCH: &str = "vk/1a2b-add-login";
pub const NEW_PR_URL: &str = "https://github.com/acme/app/pull/12";

pub fn task(status: TaskStatus) -> Task {
    Task {
        id: "task-1".into(),
        project_id: "proj-1".into(),
        title: "Add login page".into(),
        description: Some("Users need to sign in with email.".into()),
        status,
        parent_task_attempt: None,
        created_at: "2026-10-01T09:00:00Z".into(),
        updated_at: "2026-10-01T09:00:00Z".into(),
    }
}

pub fn attempt() -> TaskAttempt {
    TaskAttempt {
        id: "attempt-1".into(),
        task_id: "task-1".into(),
        executor: "CLAUDE_CODE".into(),
        base_branch: "main".into(),
        branch: Some(BRANCH.into()),
        created_at: "2026-10-01T09:01:00Z".into(),
    }
}

pub fn container() -> ContainerInfo {
    ContainerInfo {
        attempt_id: "attempt-1".into(),
        task_id: "task-1".into(),
        project_id: "proj-1".into(),
    }
}

pub fn run_context() -> RunContext {
    RunContext {
        worktree: PathBuf::from("/var/tmp/vibe-kanban/worktrees/1a2b-add-login"),
        container: container(),
        attempt: attempt(),
        task: task(TaskStatus::InReview),
        branch: BRANCH.into(),
    }
}

pub fn pr(number: u64, status: PrStatus) -> MergeInfo {
    MergeInfo {
        kind: MergeKind::Pr,
        id: format!("pr-{number}"),
        task_attempt_id: "attempt-1".into(),
        created_at: "2026-10-01T10:00:00Z".into(),
        target_branch_name: "main".into(),
        pr_info: PrInfo {
            number,
            url: format!("https://github.com/acme/app/pull/{number}"),
            status,
            merged_at: None,
            merge_commit_sha: None,
        },
    }
}

/// Records every call as a short string such as `push:vk/1` or `create:main`.
pub struct RecordingGitHost {
    calls: Mutex<Vec<String>>,
    ahead: Mutex<Option<u32>>,
    pub installed: bool,
    pub authenticated: bool,
    pub open_prs: Vec<MergeInfo>,
    /// Returned for `PrStateFilter::All`.
    pub all_prs: Mutex<Vec<MergeInfo>>,
    pub push_error: Option<GitHubError>,
    pub create_error: Option<GitHubError>,
    pub merge_result: Result<MergeOutcome, GitHubError>,
}

impl RecordingGitHost {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            ahead: Mutex::new(Some(2)),
            installed: true,
            authenticated: true,
            open_prs: Vec::new(),
            all_prs: Mutex::new(Vec::new()),
            push_error: None,
            create_error: None,
            merge_result: Ok(MergeOutcome::Merged),
        }
    }

    pub fn with_ahead(self, ahead: Option<u32>) -> Self {
        *self.ahead.lock().unwrap() = ahead;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose name (text before `:`) is `name`.
    pub fn count(&self, name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(name))
            .count()
    }

    /// Calls that change GitHub state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| ["push", "create", "merge"].iter().any(|m| c.starts_with(m)))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GitHost for RecordingGitHost {
    async fn check_installed(&self) -> bool {
        self.record("check_installed".into());
        self.installed
    }

    async fn check_authenticated(&self) -> bool {
        self.record("check_authenticated".into());
        self.authenticated
    }

    async fn current_branch(&self) -> Result<String, GitHubError> {
        self.record("current_branch".into());
        Ok(BRANCH.into())
    }

    async fn remote_sync(&self, branch: &str) -> RemoteSync {
        self.record(format!("remote_sync:{branch}"));
        RemoteSync {
            ahead: *self.ahead.lock().unwrap(),
            behind: Some(0),
        }
    }

    async fn branch_status(&self, base: &str) -> Result<BranchStatus, GitHubError> {
        self.record(format!("branch_status:{base}"));
        Ok(BranchStatus::default())
    }

    async fn push_branch(&self, branch: &str) -> Result<(), GitHubError> {
        self.record(format!("push:{branch}"));
        if let Some(err) = &self.push_error {
            return Err(err.clone());
        }
        *self.ahead.lock().unwrap() = Some(0);
        Ok(())
    }

    async fn list_prs(&self, _branch: &str, state: PrStateFilter) -> Vec<MergeInfo> {
        self.record(format!("list_prs:{}", state.as_arg()));
        match state {
            PrStateFilter::Open => self.open_prs.clone(),
            PrStateFilter::All => self.all_prs.lock().unwrap().clone(),
        }
    }

    async fn create_pr(&self, request: &PrRequest) -> Result<String, GitHubError> {
        self.record(format!(
            "create:{}",
            request.base.as_deref().unwrap_or_default()
        ));
        match &self.create_error {
            Some(err) => Err(err.clone()),
            None => Ok(NEW_PR_URL.into()),
        }
    }

    async fn merge_pr(&self, request: &MergeRequest) -> Result<MergeOutcome, GitHubError> {
        self.record(format!("merge:{}", request.pr.as_deref().unwrap_or_default()));
        if matches!(self.merge_result, Ok(MergeOutcome::Merged)) {
            let mut merged = pr(12, PrStatus::Merged);
            merged.pr_info.url = request.pr.clone().unwrap_or_default();
            self.all_prs.lock().unwrap().push(merged);
        }
        self.merge_result.clone()
    }
}

pub fn push_rejected() -> GitHubError {
    GitHubError::new(GitHubErrorCode::PushFailed, "Failed to push branch")
        .with_stderr("! [rejected] vk/1a2b-add-login -> vk/1a2b-add-login (non-fast-forward)")
}

pub struct StubTasks {
    task: Mutex<Task>,
    calls: Mutex<Vec<String>>,
    updates: Mutex<Vec<(String, TaskStatus)>>,
    pub missing_container: bool,
}

impl StubTasks {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            task: Mutex::new(task(status)),
            calls: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            missing_container: false,
        }
    }

    /// Every API call as `name:arg`, e.g. `get_task:task-1`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, TaskStatus)> {
        self.updates.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Http {
        status: 404,
        message: Some(format!("{what} not found")),
    }
}

#[async_trait]
impl TaskService for StubTasks {
    async fn get_container_info(&self, worktree_path: &str) -> Result<ContainerInfo, ApiError> {
        self.record(format!("get_container_info:{worktree_path}"));
        if self.missing_container {
            return Err(not_found("Container"));
        }
        Ok(container())
    }

    async fn get_task_attempt(&self, attempt_id: &str) -> Result<TaskAttempt, ApiError> {
        self.record(format!("get_task_attempt:{attempt_id}"));
        if attempt_id != "attempt-1" {
            return Err(not_found("Task attempt"));
        }
        Ok(attempt())
    }

    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError> {
        self.record(format!("get_task:{task_id}"));
        if task_id != "task-1" {
            return Err(not_found("Task"));
        }
        Ok(self.task.lock().unwrap().clone())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        self.record(format!("update_task_status:{task_id}"));
        self.updates
            .lock()
            .unwrap()
            .push((task_id.to_string(), status));
        let mut task = self.task.lock().unwrap();
        task.status = status;
        Ok(task.clone())
    }
}
