//! Last-known availability of each named stream. Pure bookkeeping, no I/O.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Unknown,
    /// The broker confirmed the stream exists.
    Ready,
    /// Creation exhausted its retries or hit an unexpected broker error.
    Failed,
}

/// Shared between the lifecycle manager, the publish path and observers.
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    states: Arc<RwLock<HashMap<String, StreamState>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a stream; streams never seen are `Unknown`.
    pub async fn state(&self, name: &str) -> StreamState {
        self.states
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or(StreamState::Unknown)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.states.read().await.contains_key(name)
    }

    pub async fn mark_ready(&self, name: &str) {
        self.set(name, StreamState::Ready).await;
    }

    pub async fn mark_failed(&self, name: &str) {
        self.set(name, StreamState::Failed).await;
    }

    async fn set(&self, name: &str, state: StreamState) {
        self.states.write().await.insert(name.to_string(), state);
    }

    /// Copy of every known stream and its state, sorted by name.
    pub async fn snapshot(&self) -> Vec<(String, StreamState)> {
        let states = self.states.read().await;
        let mut entries: Vec<_> = states
            .iter()
            .map(|(name, state)| (name.clone(), *state))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}
