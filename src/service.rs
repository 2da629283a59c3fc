use crate::error::ServiceError;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Remote task storage for the authenticated account.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn list(&self, token: &str) -> Result<Vec<Task>, ServiceError>;
    async fn create(&self, token: &str, draft: &TaskDraft) -> Result<Task, ServiceError>;
    /// Servers may answer with the updated task or an empty body.
    async fn edit(
        &self,
        token: &str,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, ServiceError>;
    async fn remove(&self, token: &str, task_id: TaskId) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait AuthContext: Send + Sync {
    fn is_authenticated(&self) -> bool;
    /// A currently valid access token. Implementations refresh as needed.
    async fn access_token(&self) -> Result<String, ServiceError>;
}

/// Auth context backed by a token handed over from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuth {
    token: Option<String>,
}

impl StaticTokenAuth {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token }
    }
}

#[async_trait]
impl AuthContext for StaticTokenAuth {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn access_token(&self) -> Result<String, ServiceError> {
        self.token
            .clone()
            .ok_or_else(|| ServiceError::Credentials("no access token configured".to_string()))
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    out.push_str("...");
    out
}

fn network_error(err: reqwest::Error, url: &str) -> ServiceError {
    ServiceError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Reads the body, mapping non-2xx statuses onto `ServiceError`.
async fn read_body(resp: Response) -> Result<String, ServiceError> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp.text().await.map_err(|err| network_error(err, &url))?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ServiceError::Unauthorized {
            status: status.as_u16(),
            url,
        });
    }
    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            url,
            body: preview_body(&body),
        });
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(body: &str, url: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|err| ServiceError::Decode {
        url: url.to_string(),
        message: format!("{err} | body={}", preview_body(body)),
    })
}

/// REST client for the task backend.
#[derive(Clone)]
pub struct HttpTaskService {
    http: reqwest::Client,
    url_tasks: String,
}

impl HttpTaskService {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, ServiceError> {
        let normalized = base_url.trim_end_matches('/');
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|err| network_error(err, normalized))?;
        Ok(Self {
            http,
            url_tasks: format!("{normalized}/tasks"),
        })
    }

    fn task_url(&self, task_id: TaskId) -> String {
        format!("{}/{}", self.url_tasks, task_id)
    }

    async fn send(&self, req: RequestBuilder, token: &str, url: &str) -> Result<String, ServiceError> {
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| network_error(err, url))?;
        read_body(resp).await
    }
}

#[async_trait]
impl TaskService for HttpTaskService {
    async fn list(&self, token: &str) -> Result<Vec<Task>, ServiceError> {
        let url = &self.url_tasks;
        tracing::debug!(target: "tarefas.http", stage = "list.in", url = %url);
        let body = self.send(self.http.get(url), token, url).await?;
        let tasks: Vec<Task> = decode(&body, url)?;
        tracing::debug!(target: "tarefas.http", stage = "list.out", count = tasks.len());
        Ok(tasks)
    }

    async fn create(&self, token: &str, draft: &TaskDraft) -> Result<Task, ServiceError> {
        let url = &self.url_tasks;
        tracing::debug!(
            target: "tarefas.http",
            stage = "create.in",
            url = %url,
            priority = %draft.priority
        );
        let body = self.send(self.http.post(url).json(draft), token, url).await?;
        let task: Task = decode(&body, url)?;
        tracing::debug!(target: "tarefas.http", stage = "create.out", task_id = %task.id);
        Ok(task)
    }

    async fn edit(
        &self,
        token: &str,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, ServiceError> {
        let url = self.task_url(task_id);
        tracing::debug!(target: "tarefas.http", stage = "edit.in", url = %url);
        let body = self.send(self.http.patch(&url).json(patch), token, &url).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        decode(&body, &url).map(Some)
    }

    async fn remove(&self, token: &str, task_id: TaskId) -> Result<(), ServiceError> {
        let url = self.task_url(task_id);
        tracing::debug!(target: "tarefas.http", stage = "remove.in", url = %url);
        self.send(self.http.delete(&url), token, &url).await?;
        Ok(())
    }
}
