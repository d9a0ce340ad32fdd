//! Wrappers around the TaskRouter queue and worker resources.
//!
//! Same contract as the Sync wrappers: validate, call the transport once,
//! funnel failures through the retry runner, return the envelope. Worker
//! attributes cross this boundary in structured form; the encoded-string
//! representation the platform uses never leaks to callers.

use std::sync::Arc;

use crate::config::RetryConfig;
use crate::error::Result;
use crate::models::{Attributes, EligibleWorkers, Envelope, TaskQueue, Worker, WorkerSummary};
use crate::retry::RetryRunner;
use crate::transport::Transport;
use crate::validation;

/// Page ceiling when listing queues
const QUEUE_LIST_LIMIT: usize = 1000;
/// Page size and overall ceiling for eligibility listings
const WORKER_PAGE_SIZE: usize = 500;
const WORKER_LIST_LIMIT: usize = 20_000;

/// Filters for [`TaskRouterClient::list_queues`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueFilters {
    pub friendly_name: Option<String>,
    /// Restrict to queues the given worker is eligible for
    pub worker_sid: Option<String>,
    /// JSON-encoded worker attributes to evaluate queue expressions against
    pub evaluate_worker_attributes: Option<String>,
}

impl QueueFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(friendly_name) = &self.friendly_name {
            query.push(("FriendlyName", friendly_name.clone()));
        }
        if let Some(worker_sid) = &self.worker_sid {
            query.push(("WorkerSid", worker_sid.clone()));
        }
        if let Some(attributes) = &self.evaluate_worker_attributes {
            query.push(("EvaluateWorkerAttributes", attributes.clone()));
        }
        query
    }
}

/// Retry-aware client for TaskRouter queues and workers
pub struct TaskRouterClient {
    transport: Arc<dyn Transport>,
    runner: RetryRunner,
}

impl TaskRouterClient {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            runner: RetryRunner::new(retry),
        }
    }

    /// List the workspace's task queues, optionally filtered
    pub async fn list_queues(
        &self,
        filters: Option<QueueFilters>,
    ) -> Result<Envelope<Vec<TaskQueue>>> {
        let filters = filters.unwrap_or_default();
        if let Some(worker_sid) = &filters.worker_sid {
            validation::require_sid(worker_sid, "WK", "worker_sid")?;
        }

        Ok(self
            .runner
            .run("list_queues", |_attempts| {
                self.transport.list_task_queues(&filters, QUEUE_LIST_LIMIT)
            })
            .await)
    }

    pub async fn get_worker(&self, worker_sid: &str) -> Result<Envelope<Worker>> {
        validation::require_sid(worker_sid, "WK", "worker_sid")?;

        Ok(self
            .runner
            .run("get_worker", |_attempts| {
                self.transport.fetch_worker(worker_sid)
            })
            .await)
    }

    /// Replace a worker's attributes. The structured object is encoded to
    /// the platform's string form on the wire and comes back decoded on the
    /// returned worker.
    pub async fn update_worker_attributes(
        &self,
        worker_sid: &str,
        attributes: &Attributes,
    ) -> Result<Envelope<Worker>> {
        validation::require_sid(worker_sid, "WK", "worker_sid")?;

        Ok(self
            .runner
            .run("update_worker_attributes", |_attempts| {
                self.transport.update_worker_attributes(worker_sid, attributes)
            })
            .await)
    }

    /// Find workers matching a TaskRouter target expression. With
    /// `worker_sid_only` each result is reduced to just its identifier.
    pub async fn get_eligible_workers(
        &self,
        target_workers_expression: &str,
        worker_sid_only: bool,
    ) -> Result<Envelope<EligibleWorkers>> {
        validation::require_non_empty(target_workers_expression, "target_workers_expression")?;

        let envelope = self
            .runner
            .run("get_eligible_workers", |_attempts| {
                self.transport.list_workers(
                    target_workers_expression,
                    WORKER_PAGE_SIZE,
                    WORKER_LIST_LIMIT,
                )
            })
            .await;

        Ok(envelope.map(|workers| {
            let eligible = if worker_sid_only {
                EligibleWorkers::Sids(workers.iter().map(WorkerSummary::from).collect())
            } else {
                EligibleWorkers::Workers(workers)
            };
            tracing::debug!(
                matched = eligible.len(),
                sid_only = worker_sid_only,
                "eligibility query resolved"
            );
            eligible
        }))
    }
}
