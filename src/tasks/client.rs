use super::model::{Page, Project, TaskRecord};
use crate::config::{ReliabilityConfig, TasksConfig};
use crate::error::RemoteApiError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

const TASKS_FILTER_PATH: &str = "/api/v1/tasks/filter";
const PROJECTS_PATH: &str = "/api/v1/projects";

const MAX_BACKOFF_MS: u64 = 10_000;
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Reads tasks and projects from the Todoist REST API.
pub struct TaskFetcher {
    client: Client,
    base_url: String,
    filter: String,
    max_pages: u32,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl TaskFetcher {
    pub fn new(tasks: &TasksConfig, reliability: &ReliabilityConfig) -> Result<Self, RemoteApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(tasks.request_timeout_secs))
            .build()
            .map_err(|e| RemoteApiError::Network {
                endpoint: tasks.api_base_url.clone(),
                message: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: tasks.api_base_url.trim_end_matches('/').to_string(),
            filter: tasks.filter.clone(),
            max_pages: tasks.max_pages.max(1),
            max_retries: reliability.fetch_retries,
            base_backoff_ms: reliability.fetch_backoff_ms.max(1),
        })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Tasks matching the configured filter, with project names resolved.
    pub async fn fetch_tasks(&self, token: &SecretString) -> Result<Vec<TaskRecord>, RemoteApiError> {
        let projects = self.fetch_projects(token).await?;
        let query = [("query", self.filter.as_str())];
        let mut tasks: Vec<TaskRecord> = self.get_all(TASKS_FILTER_PATH, &query, token).await?;

        for task in &mut tasks {
            task.project_name = task
                .project_id
                .as_ref()
                .and_then(|id| projects.get(id))
                .cloned();
        }

        tracing::info!(
            count = tasks.len(),
            filter = self.filter.as_str(),
            "Fetched tasks"
        );
        Ok(tasks)
    }

    /// Project id to project name.
    pub async fn fetch_projects(
        &self,
        token: &SecretString,
    ) -> Result<HashMap<String, String>, RemoteApiError> {
        let projects: Vec<Project> = self.get_all(PROJECTS_PATH, &[], token).await?;
        tracing::debug!(count = projects.len(), "Fetched projects");
        Ok(projects.into_iter().map(|p| (p.id, p.name)).collect())
    }

    /// Follow `next_cursor` until the listing ends or the page cap is hit.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &SecretString,
    ) -> Result<Vec<T>, RemoteApiError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page_no in 1..=self.max_pages {
            let page: Page<T> = self.get_page(path, query, cursor.as_deref(), token).await?;
            let (mut page_items, next) = page.into_parts();
            items.append(&mut page_items);

            match next {
                Some(next) if page_no < self.max_pages => cursor = Some(next),
                Some(_) => {
                    tracing::warn!(
                        endpoint = path,
                        max_pages = self.max_pages,
                        "Page cap reached, listing truncated"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(items)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cursor: Option<&str>,
        token: &SecretString,
    ) -> Result<Page<T>, RemoteApiError> {
        let mut backoff_ms = self.base_backoff_ms;

        for attempt in 0..=self.max_retries {
            match self.get_page_once(path, query, cursor, token).await {
                Ok(page) => {
                    if attempt > 0 {
                        tracing::info!(endpoint = path, attempt, "Task API recovered after retries");
                    }
                    return Ok(page);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    tracing::warn!(
                        endpoint = path,
                        attempt = attempt + 1,
                        backoff_ms,
                        error = %e,
                        "Transient task API failure, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms.saturating_mul(2)).min(MAX_BACKOFF_MS);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RemoteApiError::Network {
            endpoint: path.to_string(),
            message: "retries exhausted".into(),
        })
    }

    async fn get_page_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cursor: Option<&str>,
        token: &SecretString,
    ) -> Result<Page<T>, RemoteApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .bearer_auth(token.expose_secret())
            .query(query);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await.map_err(|e| RemoteApiError::Network {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RemoteApiError::Network {
            endpoint: path.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(RemoteApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| RemoteApiError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }
}
