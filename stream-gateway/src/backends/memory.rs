//! In-process broker with append-only stream logs.
//!
//! Behaves like a stream broker from the gateway's point of view: explicit
//! stream creation, sends to missing streams fail, subscribers replay from the
//! first offset and then follow live appends. Availability can be switched
//! off to simulate a refused connection.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broker::{ConsumerConnection, Delivery, DeliveryHandler, OffsetSpec, StreamBroker};
use crate::error::BrokerError;

struct StreamLog {
    messages: Vec<Bytes>,
    appended: watch::Sender<usize>,
}

impl StreamLog {
    fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            appended,
        }
    }
}

#[derive(Default)]
struct Counters {
    create_calls: AtomicUsize,
    send_calls: AtomicUsize,
    consumers_opened: AtomicUsize,
    consumers_closed: AtomicUsize,
}

struct Inner {
    streams: Mutex<HashMap<String, StreamLog>>,
    available: AtomicBool,
    counters: Counters,
}

/// Call counts observed by a [`MemoryBroker`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBrokerStats {
    pub create_calls: usize,
    pub send_calls: usize,
    pub consumers_opened: usize,
    pub consumers_closed: usize,
}

#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                streams: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                counters: Counters::default(),
            }),
        }
    }

    /// When unavailable every operation fails with `ConnectionRefused`.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Drop a stream and its messages, ending any subscription reading it.
    pub async fn delete_stream(&self, name: &str) -> bool {
        self.inner.streams.lock().await.remove(name).is_some()
    }

    pub async fn stream_exists(&self, name: &str) -> bool {
        self.inner.streams.lock().await.contains_key(name)
    }

    pub async fn messages(&self, name: &str) -> Option<Vec<Bytes>> {
        self.inner
            .streams
            .lock()
            .await
            .get(name)
            .map(|log| log.messages.clone())
    }

    pub fn stats(&self) -> MemoryBrokerStats {
        let counters = &self.inner.counters;
        MemoryBrokerStats {
            create_calls: counters.create_calls.load(Ordering::SeqCst),
            send_calls: counters.send_calls.load(Ordering::SeqCst),
            consumers_opened: counters.consumers_opened.load(Ordering::SeqCst),
            consumers_closed: counters.consumers_closed.load(Ordering::SeqCst),
        }
    }

    fn check_available(&self) -> Result<(), BrokerError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::ConnectionRefused(
                "connection refused (os error 111)".to_string(),
            ))
        }
    }

    /// Next message at `offset`, or a receiver that fires on the next append.
    /// `None` once the stream is gone.
    async fn next_at(&self, stream: &str, offset: usize) -> Option<Result<Bytes, watch::Receiver<usize>>> {
        let streams = self.inner.streams.lock().await;
        let log = streams.get(stream)?;
        Some(match log.messages.get(offset) {
            Some(data) => Ok(data.clone()),
            None => Err(log.appended.subscribe()),
        })
    }
}

#[async_trait]
impl StreamBroker for MemoryBroker {
    async fn create_stream(&self, name: &str) -> Result<(), BrokerError> {
        self.inner.counters.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut streams = self.inner.streams.lock().await;
        if streams.contains_key(name) {
            return Err(BrokerError::AlreadyExists);
        }
        streams.insert(name.to_string(), StreamLog::new());
        Ok(())
    }

    async fn send(&self, stream: &str, data: Bytes) -> Result<(), BrokerError> {
        self.inner.counters.send_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut streams = self.inner.streams.lock().await;
        let log = streams
            .get_mut(stream)
            .ok_or(BrokerError::StreamDoesNotExist)?;
        log.messages.push(data);
        log.appended.send_replace(log.messages.len());
        Ok(())
    }

    async fn connect_consumer(&self) -> Result<Box<dyn ConsumerConnection>, BrokerError> {
        self.check_available()?;
        self.inner
            .counters
            .consumers_opened
            .fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryConsumer {
            broker: self.clone(),
            shutdown: CancellationToken::new(),
            reader: None,
        }))
    }
}

struct MemoryConsumer {
    broker: MemoryBroker,
    shutdown: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl MemoryConsumer {
    async fn read_loop(
        broker: MemoryBroker,
        stream: String,
        handler: Arc<dyn DeliveryHandler>,
        shutdown: CancellationToken,
    ) {
        let mut offset = 0;

        loop {
            match broker.next_at(&stream, offset).await {
                Some(Ok(data)) => {
                    offset += 1;
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        flow = handler.deliver(data) => {
                            if flow == Delivery::Stop {
                                break;
                            }
                        }
                    }
                }
                Some(Err(mut appended)) => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        changed = appended.changed() => {
                            if changed.is_err() {
                                // Stream was deleted.
                                break;
                            }
                        }
                    }
                }
                None => break,
            }
        }

        debug!(stream = %stream, delivered = offset, "memory consumer reader stopped");
    }
}

#[async_trait]
impl ConsumerConnection for MemoryConsumer {
    async fn subscribe(
        &mut self,
        stream: &str,
        offset: OffsetSpec,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), BrokerError> {
        let OffsetSpec::First = offset;
        self.broker.check_available()?;

        if !self.broker.stream_exists(stream).await {
            return Err(BrokerError::StreamDoesNotExist);
        }
        if self.reader.is_some() {
            return Err(BrokerError::Other(
                "connection already has a subscription".to_string(),
            ));
        }

        self.reader = Some(tokio::spawn(Self::read_loop(
            self.broker.clone(),
            stream.to_string(),
            handler,
            self.shutdown.clone(),
        )));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.broker
            .inner
            .counters
            .consumers_closed
            .fetch_add(1, Ordering::SeqCst);

        self.shutdown.cancel();
        if let Some(reader) = self.reader.take() {
            reader
                .await
                .map_err(|e| BrokerError::Other(format!("reader task failed: {}", e)))?;
        }
        Ok(())
    }
}
