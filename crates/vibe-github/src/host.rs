use crate::GitHubError;
use async_trait::async_trait;
use vibe_kanban_api::{BranchStatus, MergeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStateFilter {
    Open,
    All,
}

impl PrStateFilter {
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMethod {
    #[default]
    Squash,
    Merge,
    Rebase,
}

impl MergeMethod {
    pub fn flag(self) -> &'static str {
        match self {
            Self::Squash => "--squash",
            Self::Merge => "--merge",
            Self::Rebase => "--rebase",
        }
    }
}

/// Local branch position relative to its `origin` counterpart.
/// `None` means the comparison failed, usually because the remote branch
/// does not exist yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteSync {
    pub ahead: Option<u32>,
    pub behind: Option<u32>,
}

impl RemoteSync {
    pub fn needs_push(&self) -> bool {
        !matches!(self.ahead, Some(0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrRequest {
    pub title: String,
    pub body: Option<String>,
    /// Defaults to `main`.
    pub base: Option<String>,
    /// Defaults to the current branch.
    pub head: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRequest {
    /// PR number or URL; the current branch's PR when unset.
    pub pr: Option<String>,
    pub method: MergeMethod,
    pub body: Option<String>,
    pub delete_branch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    /// Merged on GitHub; the local checkout afterwards failed (linked worktree).
    MergedWithCheckoutWarning { stderr: String },
}

/// Git hosting operations the lifecycle needs. Implemented by
/// [`GhCli`](crate::GhCli); tests substitute recording stubs.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Pre-flight gate; never fails.
    async fn check_installed(&self) -> bool;

    /// Pre-flight gate; never fails.
    async fn check_authenticated(&self) -> bool;

    async fn current_branch(&self) -> Result<String, GitHubError>;

    /// Advisory: failures are reported as unknown counts.
    async fn remote_sync(&self, branch: &str) -> RemoteSync;

    async fn branch_status(&self, base: &str) -> Result<BranchStatus, GitHubError>;

    /// Push with upstream tracking.
    async fn push_branch(&self, branch: &str) -> Result<(), GitHubError>;

    /// Advisory: returns an empty list on any failure.
    async fn list_prs(&self, branch: &str, state: PrStateFilter) -> Vec<MergeInfo>;

    /// Returns the PR URL. An already existing PR for the head branch counts
    /// as success and yields that PR's URL.
    async fn create_pr(&self, request: &PrRequest) -> Result<String, GitHubError>;

    async fn merge_pr(&self, request: &MergeRequest) -> Result<MergeOutcome, GitHubError>;

    async fn list_open_prs(&self, branch: &str) -> Vec<MergeInfo> {
        self.list_prs(branch, PrStateFilter::Open).await
    }
}
