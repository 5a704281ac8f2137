//! `gh` and `git` wrappers used by the PR lifecycle.

mod classify;
mod cli;
mod error;
mod host;

pub use classify::{
    classify_merge_failure, classify_stderr, extract_pr_url, mask_secrets, MergeFailureKind,
};
pub use cli::{CommandOutput, GhCli};
pub use error::{GitHubError, GitHubErrorCode};
pub use host::{
    GitHost, MergeMethod, MergeOutcome, MergeRequest, PrRequest, PrStateFilter, RemoteSync,
};
