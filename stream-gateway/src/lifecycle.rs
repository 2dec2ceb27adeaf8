//! Stream creation with bounded retries on connection refusal.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::broker::StreamBroker;
use crate::error::{BrokerError, GatewayError, GatewayResult};
use crate::registry::StreamRegistry;

/// Result of a successful [`StreamLifecycle::ensure_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    Created,
    /// The broker already had the stream; nothing changed.
    AlreadyExisted,
    /// Blank name, nothing was sent to the broker.
    Skipped,
}

/// Per-name outcome of a bulk initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    Created,
    AlreadyExisted,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub created: Vec<String>,
    pub already_existed: Vec<String>,
    /// Stream name and the reason it could not be made ready.
    pub failed: Vec<(String, String)>,
    /// Number of blank names ignored.
    pub skipped: usize,
}

impl InitReport {
    pub fn outcome_for(&self, name: &str) -> Option<StreamOutcome> {
        if self.created.iter().any(|n| n == name) {
            Some(StreamOutcome::Created)
        } else if self.already_existed.iter().any(|n| n == name) {
            Some(StreamOutcome::AlreadyExisted)
        } else if self.failed.iter().any(|(n, _)| n == name) {
            Some(StreamOutcome::Failed)
        } else {
            None
        }
    }

    pub fn ready_count(&self) -> usize {
        self.created.len() + self.already_existed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates streams on the broker and records the result in the registry.
#[derive(Clone)]
pub struct StreamLifecycle {
    broker: Arc<dyn StreamBroker>,
    registry: StreamRegistry,
    retry_delay: Duration,
}

impl StreamLifecycle {
    pub fn new(broker: Arc<dyn StreamBroker>, registry: StreamRegistry, retry_delay: Duration) -> Self {
        Self {
            broker,
            registry,
            retry_delay,
        }
    }

    /// Make sure `name` exists on the broker.
    ///
    /// A refused connection is retried after a fixed delay, up to
    /// `max_attempts` broker calls in total (at least one). Any other broker
    /// error is returned at once. Either failure marks the stream `Failed`.
    pub async fn ensure_stream(&self, name: &str, max_attempts: u32) -> GatewayResult<EnsureOutcome> {
        if name.trim().is_empty() {
            return Ok(EnsureOutcome::Skipped);
        }

        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.broker.create_stream(name).await {
                Ok(()) => {
                    self.registry.mark_ready(name).await;
                    info!(stream = %name, "Stream created");
                    return Ok(EnsureOutcome::Created);
                }
                Err(BrokerError::AlreadyExists) => {
                    self.registry.mark_ready(name).await;
                    warn!(stream = %name, "Stream already exists");
                    return Ok(EnsureOutcome::AlreadyExisted);
                }
                Err(BrokerError::ConnectionRefused(reason)) if attempt < max_attempts => {
                    error!(
                        stream = %name,
                        attempt,
                        max_attempts,
                        reason = %reason,
                        "Broker refused connection, retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(BrokerError::ConnectionRefused(reason)) => {
                    self.registry.mark_failed(name).await;
                    error!(
                        stream = %name,
                        attempts = attempt,
                        reason = %reason,
                        "Giving up on stream creation"
                    );
                    return Err(GatewayError::ConnectionRefused {
                        stream: name.to_string(),
                        attempts: attempt,
                    });
                }
                Err(source) => {
                    self.registry.mark_failed(name).await;
                    error!(stream = %name, error = %source, "Unexpected error creating stream");
                    return Err(GatewayError::Broker {
                        stream: name.to_string(),
                        operation: "create",
                        source,
                    });
                }
            }
        }
    }

    /// Ensure every name independently; one failure never stops the rest.
    pub async fn init_streams<I, S>(&self, names: I, max_attempts: u32) -> InitReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let outcomes = join_all(
            names
                .iter()
                .map(|name| self.ensure_stream(name, max_attempts)),
        )
        .await;

        let mut report = InitReport::default();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            match outcome {
                Ok(EnsureOutcome::Created) => report.created.push(name),
                Ok(EnsureOutcome::AlreadyExisted) => report.already_existed.push(name),
                Ok(EnsureOutcome::Skipped) => report.skipped += 1,
                Err(e) => report.failed.push((name, e.to_string())),
            }
        }

        info!(
            created = report.created.len(),
            already_existed = report.already_existed.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Stream initialization finished"
        );
        report
    }
}
