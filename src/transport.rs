use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::config::TwilioConfig;
use crate::error::{FlexClientError, RemoteError, RemoteResult, Result};
use crate::models::{Attributes, SyncDocument, TaskQueue, Worker};
use crate::sync::CreateDocumentParams;
use crate::taskrouter::QueueFilters;

#[cfg(test)]
use mockall::automock;

const SYNC_BASE_URL: &str = "https://sync.twilio.com/v1";
const TASKROUTER_BASE_URL: &str = "https://taskrouter.twilio.com/v1";

/// The remote call adapter. One method per platform operation; each performs
/// exactly one remote round trip (plus pagination for lists) and surfaces
/// failures as [`RemoteError`]. Retry handling lives entirely above this
/// boundary.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create_document(&self, params: &CreateDocumentParams) -> RemoteResult<SyncDocument>;
    async fn fetch_document(&self, document_sid: &str) -> RemoteResult<SyncDocument>;
    async fn update_document_data(
        &self,
        document_sid: &str,
        data: &Value,
    ) -> RemoteResult<SyncDocument>;
    async fn list_task_queues(
        &self,
        filters: &QueueFilters,
        limit: usize,
    ) -> RemoteResult<Vec<TaskQueue>>;
    async fn fetch_worker(&self, worker_sid: &str) -> RemoteResult<Worker>;
    async fn update_worker_attributes(
        &self,
        worker_sid: &str,
        attributes: &Attributes,
    ) -> RemoteResult<Worker>;
    async fn list_workers(
        &self,
        target_workers_expression: &str,
        page_size: usize,
        limit: usize,
    ) -> RemoteResult<Vec<Worker>>;
}

/// Error body the platform returns alongside non-2xx statuses
#[derive(Debug, Deserialize)]
struct PlatformErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

#[derive(Debug, PartialEq, Eq)]
enum PageProgress {
    Continue,
    Done,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskQueuePage {
    task_queues: Vec<TaskQueue>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct WorkerPage {
    workers: Vec<Worker>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

/// REST implementation of [`Transport`] against the platform API
pub struct HttpTransport {
    client: Client,
    account_sid: String,
    auth_token: String,
    workspace_sid: String,
    sync_service_sid: String,
}

impl HttpTransport {
    pub fn new(twilio: &TwilioConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlexClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            account_sid: twilio.account_sid.clone(),
            auth_token: twilio.auth_token.clone(),
            workspace_sid: twilio.workspace_sid.clone(),
            sync_service_sid: twilio.sync_service_sid.clone(),
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{SYNC_BASE_URL}/Services/{}/Documents",
            self.sync_service_sid
        )
    }

    fn document_url(&self, document_sid: &str) -> String {
        format!("{}/{}", self.documents_url(), document_sid)
    }

    fn workspace_url(&self, suffix: &str) -> String {
        format!(
            "{TASKROUTER_BASE_URL}/Workspaces/{}/{suffix}",
            self.workspace_sid
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> RemoteResult<T> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;
        Self::parse(response).await
    }

    async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> RemoteResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;
        Self::parse(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> RemoteResult<T> {
        let response = self
            .client
            .post(url)
            .form(form)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| RemoteError {
                status: 500,
                code: None,
                message: format!("failed to decode response body: {e}"),
            })
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// Fold one page of list results into the accumulator. Stops at the
    /// limit, and also stops on an empty page so a `next_page_url` on a
    /// drained listing cannot keep the loop alive.
    fn accumulate<T>(into: &mut Vec<T>, page: Vec<T>, limit: usize) -> PageProgress {
        let added = page.len();
        into.extend(page);
        if into.len() >= limit {
            into.truncate(limit);
            return PageProgress::Done;
        }
        if added == 0 {
            return PageProgress::Done;
        }
        PageProgress::Continue
    }

    /// Map a non-2xx response into a [`RemoteError`], preferring the
    /// platform's own error body when it parses.
    async fn error_from_response(response: Response) -> RemoteError {
        let status = response.status().as_u16();
        match response.json::<PlatformErrorBody>().await {
            Ok(body) => RemoteError {
                status: body.status.unwrap_or(status),
                code: body.code,
                message: body.message.unwrap_or_else(|| format!("HTTP {status}")),
            },
            Err(_) => RemoteError {
                status,
                code: None,
                message: format!("HTTP {status}"),
            },
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_document(&self, params: &CreateDocumentParams) -> RemoteResult<SyncDocument> {
        let mut form: Vec<(&str, String)> = Vec::new();
        if let Some(unique_name) = &params.unique_name {
            form.push(("UniqueName", unique_name.clone()));
        }
        if let Some(ttl) = params.ttl {
            form.push(("Ttl", ttl.to_string()));
        }
        if let Some(data) = &params.data {
            form.push(("Data", data.to_string()));
        }
        self.post_form(&self.documents_url(), &form).await
    }

    async fn fetch_document(&self, document_sid: &str) -> RemoteResult<SyncDocument> {
        self.get_json(&self.document_url(document_sid)).await
    }

    async fn update_document_data(
        &self,
        document_sid: &str,
        data: &Value,
    ) -> RemoteResult<SyncDocument> {
        let form = [("Data", data.to_string())];
        self.post_form(&self.document_url(document_sid), &form).await
    }

    async fn list_task_queues(
        &self,
        filters: &QueueFilters,
        limit: usize,
    ) -> RemoteResult<Vec<TaskQueue>> {
        let mut query: Vec<(&str, String)> = filters.to_query();
        query.push(("PageSize", limit.min(1000).to_string()));

        let mut queues: Vec<TaskQueue> = Vec::new();
        let mut page: TaskQueuePage = self
            .get_json_with_query(&self.workspace_url("TaskQueues"), &query)
            .await?;
        loop {
            let TaskQueuePage { task_queues, meta } = page;
            if Self::accumulate(&mut queues, task_queues, limit) == PageProgress::Done {
                break;
            }
            match meta.and_then(|m| m.next_page_url) {
                Some(url) => page = self.get_json(&url).await?,
                None => break,
            }
        }
        Ok(queues)
    }

    async fn fetch_worker(&self, worker_sid: &str) -> RemoteResult<Worker> {
        self.get_json(&self.workspace_url(&format!("Workers/{worker_sid}")))
            .await
    }

    async fn update_worker_attributes(
        &self,
        worker_sid: &str,
        attributes: &Attributes,
    ) -> RemoteResult<Worker> {
        let form = [("Attributes", attributes.to_encoded())];
        self.post_form(&self.workspace_url(&format!("Workers/{worker_sid}")), &form)
            .await
    }

    async fn list_workers(
        &self,
        target_workers_expression: &str,
        page_size: usize,
        limit: usize,
    ) -> RemoteResult<Vec<Worker>> {
        let query: Vec<(&str, String)> = vec![
            (
                "TargetWorkersExpression",
                target_workers_expression.to_string(),
            ),
            ("PageSize", page_size.to_string()),
        ];

        let mut workers: Vec<Worker> = Vec::new();
        let mut page: WorkerPage = self
            .get_json_with_query(&self.workspace_url("Workers"), &query)
            .await?;
        loop {
            let WorkerPage { workers: batch, meta } = page;
            if Self::accumulate(&mut workers, batch, limit) == PageProgress::Done {
                break;
            }
            match meta.and_then(|m| m.next_page_url) {
                Some(url) => page = self.get_json(&url).await?,
                None => break,
            }
        }
        Ok(workers)
    }
}
