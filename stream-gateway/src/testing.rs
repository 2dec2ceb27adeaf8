//! Broker double with scripted replies and call counters.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::broker::{ConsumerConnection, DeliveryHandler, OffsetSpec, StreamBroker};
use crate::error::BrokerError;

#[derive(Default)]
struct Shared {
    existing: Mutex<HashSet<String>>,
    handler: Mutex<Option<Arc<dyn DeliveryHandler>>>,
    create_calls: AtomicUsize,
    send_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

/// Without scripting it behaves like a healthy broker: creating an existing
/// stream reports `AlreadyExists`, sending to an unknown one reports
/// `StreamDoesNotExist`.
#[derive(Default)]
pub(crate) struct ScriptedBroker {
    shared: Arc<Shared>,
    create_script: Mutex<VecDeque<Result<(), BrokerError>>>,
    create_for: HashMap<String, Result<(), BrokerError>>,
    create_always: Option<Result<(), BrokerError>>,
    send_always: Option<Result<(), BrokerError>>,
    close_error: Option<BrokerError>,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies used by the next create calls, in order.
    pub fn create_then(self, replies: Vec<Result<(), BrokerError>>) -> Self {
        *self.create_script.lock().unwrap() = replies.into();
        self
    }

    pub fn create_for(mut self, name: &str, reply: Result<(), BrokerError>) -> Self {
        self.create_for.insert(name.to_string(), reply);
        self
    }

    pub fn create_always(mut self, reply: Result<(), BrokerError>) -> Self {
        self.create_always = Some(reply);
        self
    }

    pub fn send_always(mut self, reply: Result<(), BrokerError>) -> Self {
        self.send_always = Some(reply);
        self
    }

    pub fn close_fails(mut self) -> Self {
        self.close_error = Some(BrokerError::Other("close failed".to_string()));
        self
    }

    pub fn mark_existing(&self, name: &str) {
        self.shared.existing.lock().unwrap().insert(name.to_string());
    }

    pub fn create_calls(&self) -> usize {
        self.shared.create_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.shared.send_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    /// Handler registered by the last subscription, if any.
    pub fn handler(&self) -> Option<Arc<dyn DeliveryHandler>> {
        self.shared.handler.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamBroker for ScriptedBroker {
    async fn create_stream(&self, name: &str) -> Result<(), BrokerError> {
        self.shared.create_calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.create_script.lock().unwrap().pop_front();
        let reply = self
            .create_for
            .get(name)
            .cloned()
            .or(scripted)
            .or_else(|| self.create_always.clone());

        match reply {
            Some(Ok(())) => {
                self.mark_existing(name);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => {
                if self.shared.existing.lock().unwrap().insert(name.to_string()) {
                    Ok(())
                } else {
                    Err(BrokerError::AlreadyExists)
                }
            }
        }
    }

    async fn send(&self, stream: &str, _data: Bytes) -> Result<(), BrokerError> {
        self.shared.send_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reply) = &self.send_always {
            return reply.clone();
        }
        if self.shared.existing.lock().unwrap().contains(stream) {
            Ok(())
        } else {
            Err(BrokerError::StreamDoesNotExist)
        }
    }

    async fn connect_consumer(&self) -> Result<Box<dyn ConsumerConnection>, BrokerError> {
        Ok(Box::new(ScriptedConsumer {
            shared: self.shared.clone(),
            close_error: self.close_error.clone(),
        }))
    }
}

struct ScriptedConsumer {
    shared: Arc<Shared>,
    close_error: Option<BrokerError>,
}

#[async_trait]
impl ConsumerConnection for ScriptedConsumer {
    async fn subscribe(
        &mut self,
        _stream: &str,
        _offset: OffsetSpec,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), BrokerError> {
        *self.shared.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.handler.lock().unwrap().take();

        match &self.close_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
