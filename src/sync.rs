//! Wrappers around the Sync document resource.
//!
//! Every operation validates its input, performs one remote call through the
//! transport, and routes failures through the shared retry runner, returning
//! the uniform envelope. Validation failures are caller bugs and surface as
//! `Err` before any remote call is made.

use serde_json::Value;
use std::sync::Arc;

use crate::config::RetryConfig;
use crate::error::Result;
use crate::models::{Envelope, SyncDocument};
use crate::retry::RetryRunner;
use crate::transport::Transport;
use crate::validation;

/// Parameters for [`SyncClient::create_document`]. All fields are optional;
/// the platform applies its own defaults for anything absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateDocumentParams {
    pub unique_name: Option<String>,
    /// Seconds before the document expires and is deleted
    pub ttl: Option<u32>,
    /// Initial document payload, 16 KiB max (enforced by the platform)
    pub data: Option<Value>,
}

/// Retry-aware client for Sync documents
pub struct SyncClient {
    transport: Arc<dyn Transport>,
    runner: RetryRunner,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            runner: RetryRunner::new(retry),
        }
    }

    pub async fn create_document(
        &self,
        params: CreateDocumentParams,
    ) -> Result<Envelope<SyncDocument>> {
        if let Some(unique_name) = &params.unique_name {
            validation::require_non_empty(unique_name, "unique_name")?;
        }
        if let Some(data) = &params.data {
            validation::require_object(data, "data")?;
        }

        Ok(self
            .runner
            .run("create_document", |_attempts| {
                self.transport.create_document(&params)
            })
            .await)
    }

    pub async fn fetch_document(&self, document_sid: &str) -> Result<Envelope<SyncDocument>> {
        validation::require_sid(document_sid, "SD", "document_sid")?;

        Ok(self
            .runner
            .run("fetch_document", |_attempts| {
                self.transport.fetch_document(document_sid)
            })
            .await)
    }

    pub async fn update_document_data(
        &self,
        document_sid: &str,
        update_data: &Value,
    ) -> Result<Envelope<SyncDocument>> {
        validation::require_sid(document_sid, "SD", "document_sid")?;
        validation::require_object(update_data, "update_data")?;

        Ok(self
            .runner
            .run("update_document_data", |_attempts| {
                self.transport.update_document_data(document_sid, update_data)
            })
            .await)
    }
}
