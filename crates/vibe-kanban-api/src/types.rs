//! Wire types of the task API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error_data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Tasks ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::InReview => "inreview",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Done and cancelled tasks are never moved again by automation.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub parent_task_attempt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A task as returned by the list endpoint, with its execution summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default)]
    pub has_in_progress_attempt: bool,
    #[serde(default)]
    pub has_merged_attempt: bool,
    #[serde(default)]
    pub last_attempt_failed: bool,
    #[serde(default)]
    pub executor: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTask {
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_attempt: Option<String>,
}

/// Partial update; only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

// ── Task attempts ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttempt {
    pub id: String,
    pub task_id: String,
    #[serde(default)]
    pub executor: String,
    pub base_branch: String,
    /// Unset until the attempt has created its branch.
    #[serde(default)]
    pub branch: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorProfile {
    pub executor: String,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskAttempt {
    pub task_id: String,
    pub executor_profile_id: ExecutorProfile,
    pub base_branch: String,
}

/// Attempt/task/project ids owning a worktree path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub attempt_id: String,
    pub task_id: String,
    pub project_id: String,
}

// ── Pull requests and branch status ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Merged,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrInfo {
    pub number: u64,
    pub url: String,
    pub status: PrStatus,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

impl PrInfo {
    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged || self.merged_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeKind {
    Pr,
}

/// One pull request associated with a task attempt's branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeInfo {
    #[serde(rename = "type")]
    pub kind: MergeKind,
    pub id: String,
    pub task_attempt_id: String,
    pub created_at: String,
    pub target_branch_name: String,
    pub pr_info: PrInfo,
}

/// Point-in-time snapshot of a branch; recomputed on every run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BranchStatus {
    pub commits_behind: Option<u32>,
    pub commits_ahead: Option<u32>,
    pub has_uncommitted_changes: Option<bool>,
    pub head_oid: String,
    pub uncommitted_count: u32,
    pub untracked_count: u32,
    pub base_branch_name: String,
    pub remote_commits_behind: Option<u32>,
    pub remote_commits_ahead: Option<u32>,
    #[serde(default)]
    pub merges: Vec<MergeInfo>,
}
