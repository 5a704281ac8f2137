use crate::types::*;
use crate::{ApiConfig, ApiError};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for the task API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct TaskApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl TaskApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: config.base_url.clone(),
                reason: "not a base URL".into(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            http,
            base_url,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/api/{segments...}` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "not a base URL".into(),
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Send one request and unwrap the response envelope.
    async fn request<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        tracing::debug!(%method, %url, "task api request");
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(|e| self.transport(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message);
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ApiError::Api {
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".into()),
                error_data: envelope.error_data,
            });
        }
        Ok(envelope.data)
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T, ApiError> {
        self.request::<T, ()>(method, url, None)
            .await?
            .ok_or_else(|| ApiError::Decode("response carried no data".into()))
    }

    async fn send<T, B>(&self, method: Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(method, url, Some(body))
            .await?
            .ok_or_else(|| ApiError::Decode("response carried no data".into()))
    }

    fn transport(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(e)
        }
    }

    // ── Tasks ──

    pub async fn list_tasks(&self, project_id: &str) -> Result<Vec<TaskSummary>, ApiError> {
        let mut url = self.endpoint(&["tasks"])?;
        url.query_pairs_mut().append_pair("project_id", project_id);
        self.fetch(Method::GET, url).await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, ApiError> {
        self.fetch(Method::GET, self.endpoint(&["tasks", task_id])?)
            .await
    }

    pub async fn create_task(&self, task: &CreateTask) -> Result<Task, ApiError> {
        self.send(Method::POST, self.endpoint(&["tasks"])?, task)
            .await
    }

    pub async fn update_task(&self, task_id: &str, update: &UpdateTask) -> Result<Task, ApiError> {
        self.send(Method::PUT, self.endpoint(&["tasks", task_id])?, update)
            .await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.request::<serde_json::Value, ()>(
            Method::DELETE,
            self.endpoint(&["tasks", task_id])?,
            None,
        )
        .await?;
        Ok(())
    }

    // ── Task attempts ──

    pub async fn get_task_attempt(&self, attempt_id: &str) -> Result<TaskAttempt, ApiError> {
        self.fetch(Method::GET, self.endpoint(&["task-attempts", attempt_id])?)
            .await
    }

    pub async fn create_task_attempt(
        &self,
        attempt: &CreateTaskAttempt,
    ) -> Result<TaskAttempt, ApiError> {
        self.send(Method::POST, self.endpoint(&["task-attempts"])?, attempt)
            .await
    }

    pub async fn get_branch_status(&self, attempt_id: &str) -> Result<BranchStatus, ApiError> {
        let url = self.endpoint(&["task-attempts", attempt_id, "branch-status"])?;
        self.fetch(Method::GET, url).await
    }

    // ── Containers ──

    /// Resolve the attempt/task/project owning a worktree path.
    pub async fn get_container_info(&self, worktree_path: &str) -> Result<ContainerInfo, ApiError> {
        let mut url = self.endpoint(&["containers", "info"])?;
        url.query_pairs_mut().append_pair("ref", worktree_path);
        self.fetch(Method::GET, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn(router: Router) -> TaskApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config = ApiConfig::default().with_base_url(format!("http://{addr}"));
        TaskApiClient::new(&config).unwrap()
    }

    fn task_json(id: &str, status: &str) -> Value {
        json!({
            "id": id, "project_id": "p1", "title": "Add login", "description": "OAuth",
            "status": status, "parent_task_attempt": null,
            "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    #[test]
    fn endpoint_encodes_segments() {
        let client = TaskApiClient::new(&ApiConfig::default()).unwrap();
        let url = client.endpoint(&["tasks", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9091/api/tasks/a%20b%2Fc");
    }

    #[test]
    fn rejects_invalid_base_url() {
        let config = ApiConfig::default().with_base_url("not a url");
        assert!(matches!(
            TaskApiClient::new(&config),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn get_task_unwraps_envelope() {
        let router = Router::new().route(
            "/api/tasks/{id}",
            get(|Path(id): Path<String>| async move {
                Json(json!({"success": true, "data": task_json(&id, "inreview"), "message": null}))
            }),
        );
        let client = spawn(router).await;
        let task = client.get_task("t42").await.unwrap();
        assert_eq!(task.id, "t42");
        assert_eq!(task.status, TaskStatus::InReview);
        assert_eq!(task.description.as_deref(), Some("OAuth"));
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_api_error() {
        let router = Router::new().route(
            "/api/task-attempts/{id}",
            get(|| async {
                Json(json!({"success": false, "data": null, "error_data": {"kind": "missing"},
                            "message": "Task attempt not found"}))
            }),
        );
        let client = spawn(router).await;
        let err = client.get_task_attempt("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: Task attempt not found");
        assert!(matches!(err, ApiError::Api { error_data: Some(_), .. }));
    }

    #[tokio::test]
    async fn non_2xx_is_http_error() {
        let router = Router::new().route(
            "/api/tasks/{id}",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );
        let client = spawn(router).await;
        let err = client.get_task("t1").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[tokio::test]
    async fn container_info_sends_ref_query() {
        let router = Router::new().route(
            "/api/containers/info",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let worktree = q.get("ref").cloned().unwrap_or_default();
                assert_eq!(worktree, "/var/tmp/worktrees/vk-1 fix");
                Json(json!({"success": true,
                            "data": {"attempt_id": "a1", "task_id": "t1", "project_id": "p1"}}))
            }),
        );
        let client = spawn(router).await;
        let info = client
            .get_container_info("/var/tmp/worktrees/vk-1 fix")
            .await
            .unwrap();
        assert_eq!(info.attempt_id, "a1");
        assert_eq!(info.project_id, "p1");
    }

    #[tokio::test]
    async fn update_task_puts_status() {
        let router = Router::new().route(
            "/api/tasks/{id}",
            axum::routing::put(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                let status = body["status"].as_str().unwrap_or("?").to_string();
                Json(json!({"success": true, "data": task_json(&id, &status)}))
            }),
        );
        let client = spawn(router).await;
        let task = client
            .update_task("t1", &UpdateTask::status(TaskStatus::Done))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn delete_accepts_null_data() {
        let router = Router::new().route(
            "/api/tasks/{id}",
            axum::routing::delete(|| async { Json(json!({"success": true, "data": null})) }),
        );
        let client = spawn(router).await;
        client.delete_task("t1").await.unwrap();
    }

    #[tokio::test]
    async fn missing_data_is_decode_error() {
        let router = Router::new().route(
            "/api/tasks/{id}",
            get(|| async { Json(json!({"success": true, "data": null})) }),
        );
        let client = spawn(router).await;
        assert!(matches!(
            client.get_task("t1").await,
            Err(ApiError::Decode(_))
        ));
    }
}
