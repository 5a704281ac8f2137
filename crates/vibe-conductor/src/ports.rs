//! Task API seam used by the lifecycle, so tests can substitute stubs.

use async_trait::async_trait;
use vibe_kanban_api::{
    ApiError, ContainerInfo, Task, TaskApiClient, TaskAttempt, TaskStatus, UpdateTask,
};

#[async_trait]
pub trait TaskService: Send + Sync {
    async fn get_container_info(&self, worktree_path: &str) -> Result<ContainerInfo, ApiError>;

    async fn get_task_attempt(&self, attempt_id: &str) -> Result<TaskAttempt, ApiError>;

    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError>;

    async fn update_task_status(&self, task_id: &str, status: TaskStatus)
        -> Result<Task, ApiError>;
}

#[async_trait]
impl TaskService for TaskApiClient {
    async fn get_container_info(&self, worktree_path: &str) -> Result<ContainerInfo, ApiError> {
        TaskApiClient::get_container_info(self, worktree_path).await
    }

    async fn get_task_attempt(&self, attempt_id: &str) -> Result<TaskAttempt, ApiError> {
        TaskApiClient::get_task_attempt(self, attempt_id).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError> {
        TaskApiClient::get_task(self, task_id).await
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        self.update_task(task_id, &UpdateTask::status(status)).await
    }
}
