use crate::classify::{classify_merge_failure, MergeFailureKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorCode {
    NotInstalled,
    NotAuthenticated,
    BranchNotFound,
    PrAlreadyExists,
    PushFailed,
    CommandFailed,
}

impl GitHubErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "NOT_INSTALLED",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::BranchNotFound => "BRANCH_NOT_FOUND",
            Self::PrAlreadyExists => "PR_ALREADY_EXISTS",
            Self::PushFailed => "PUSH_FAILED",
            Self::CommandFailed => "COMMAND_FAILED",
        }
    }
}

impl fmt::Display for GitHubErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a `gh` or `git` invocation, with the (masked) stderr attached.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct GitHubError {
    pub code: GitHubErrorCode,
    pub message: String,
    pub stderr: String,
    /// Program and arguments, for diagnostics.
    pub command: String,
}

impl GitHubError {
    pub fn new(code: GitHubErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            stderr: String::new(),
            command: String::new(),
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Category of a failed merge, derived from the attached stderr.
    pub fn merge_failure_kind(&self) -> MergeFailureKind {
        classify_merge_failure(&self.stderr)
    }
}
