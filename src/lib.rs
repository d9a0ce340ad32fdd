//! Resilient wrappers around the Flex platform's Sync and TaskRouter
//! resources. Every operation validates its input, performs one remote call,
//! and recovers transient failures through a shared retry policy, returning
//! a uniform success/failure envelope.

pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod sync;
pub mod taskrouter;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::sync::SyncClient;
use crate::taskrouter::TaskRouterClient;
use crate::transport::{HttpTransport, Transport};

pub use crate::error::{FlexClientError, RemoteError};
pub use crate::models::{Attributes, EligibleWorkers, Envelope};

/// Entry point composing the resource clients from an injected config
pub struct FlexClient {
    sync: SyncClient,
    taskrouter: TaskRouterClient,
}

impl FlexClient {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&config.twilio, config.http.timeout())?);
        Ok(Self::with_transport(transport, config))
    }

    /// Build against a caller-supplied transport. Used by tests and by
    /// hosts that bring their own platform adapter.
    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            sync: SyncClient::new(Arc::clone(&transport), config.retry.clone()),
            taskrouter: TaskRouterClient::new(transport, config.retry.clone()),
        }
    }

    pub fn sync(&self) -> &SyncClient {
        &self.sync
    }

    pub fn taskrouter(&self) -> &TaskRouterClient {
        &self.taskrouter
    }
}
