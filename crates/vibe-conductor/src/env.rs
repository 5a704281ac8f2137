//! Working-directory preconditions.

use crate::LifecycleError;
use std::path::{Component, Path};

/// Directory name under which Vibe Kanban creates task worktrees.
pub const WORKTREE_DIR: &str = "worktrees";

/// True when `path` lies strictly inside a `worktrees/` directory.
pub fn is_task_worktree(path: &Path) -> bool {
    let mut components = path.components().peekable();
    while let Some(component) = components.next() {
        if let Component::Normal(name) = component {
            if name == WORKTREE_DIR && components.peek().is_some() {
                return true;
            }
        }
    }
    false
}

/// Fatal precondition for every lifecycle command.
pub fn ensure_task_worktree(path: &Path) -> Result<(), LifecycleError> {
    if is_task_worktree(path) {
        Ok(())
    } else {
        Err(LifecycleError::NotAWorktree(path.to_path_buf()))
    }
}
