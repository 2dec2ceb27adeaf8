//! Consume path: one dedicated consumer connection per subscription, feeding
//! a bounded queue that the caller drains as a [`Stream`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFutureOwned};
use tracing::{debug, error, info, warn};

use crate::broker::{ConsumerConnection, Delivery, DeliveryHandler, OffsetSpec, StreamBroker};
use crate::codec::MessageCodec;
use crate::error::{GatewayError, GatewayResult};

/// Broker-side callback: decodes each message and pushes it into the queue.
/// A full queue blocks delivery until the caller catches up.
struct QueueFeeder<C: MessageCodec> {
    stream: String,
    codec: Arc<C>,
    tx: mpsc::Sender<C::Message>,
    shutdown: CancellationToken,
    // Fires the shutdown token when the connection lets go of the handler.
    _released: DropGuard,
}

#[async_trait]
impl<C: MessageCodec> DeliveryHandler for QueueFeeder<C> {
    async fn deliver(&self, data: Bytes) -> Delivery {
        let message = match self.codec.decode(&data) {
            Ok(message) => message,
            Err(e) => {
                error!(stream = %self.stream, error = %e, bytes = data.len(), "Dropping undecodable message");
                return Delivery::Continue;
            }
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Delivery::Stop,
            sent = self.tx.send(message) => match sent {
                Ok(()) => Delivery::Continue,
                Err(_) => Delivery::Stop,
            },
        }
    }
}

pub struct Subscriber<C: MessageCodec> {
    broker: Arc<dyn StreamBroker>,
    codec: Arc<C>,
    queue_capacity: usize,
}

impl<C: MessageCodec> Subscriber<C> {
    pub fn new(broker: Arc<dyn StreamBroker>, codec: Arc<C>, queue_capacity: usize) -> Self {
        Self {
            broker,
            codec,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Open a subscription on `stream`, reading from the first offset.
    ///
    /// The returned stream ends when `cancel` fires or the broker stops
    /// delivering. The consumer connection is closed exactly once, whichever
    /// way the subscription ends.
    pub async fn consume(
        &self,
        stream: &str,
        cancel: CancellationToken,
    ) -> GatewayResult<MessageStream<C::Message>> {
        let mut connection = self.broker.connect_consumer().await.map_err(|source| {
            error!(stream = %stream, error = %source, "Failed to open consumer connection");
            GatewayError::Subscribe {
                stream: stream.to_string(),
                source,
            }
        })?;

        let cancel = cancel.child_token();
        let shutdown = cancel.child_token();
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let feeder = QueueFeeder {
            stream: stream.to_string(),
            codec: self.codec.clone(),
            tx,
            shutdown: shutdown.clone(),
            _released: shutdown.clone().drop_guard(),
        };

        if let Err(source) = connection
            .subscribe(stream, OffsetSpec::First, Arc::new(feeder))
            .await
        {
            error!(stream = %stream, error = %source, "Failed to subscribe");
            close_connection(stream, connection.as_mut()).await;
            return Err(GatewayError::Subscribe {
                stream: stream.to_string(),
                source,
            });
        }

        info!(stream = %stream, capacity = self.queue_capacity, "Subscribed from first offset");
        let supervisor = tokio::spawn(supervise(stream.to_string(), connection, shutdown));

        Ok(MessageStream::new(rx, cancel, supervisor))
    }
}

/// Waits for the subscription to end, then closes its connection.
async fn supervise(stream: String, mut connection: Box<dyn ConsumerConnection>, shutdown: CancellationToken) {
    shutdown.cancelled().await;
    close_connection(&stream, connection.as_mut()).await;
}

async fn close_connection(stream: &str, connection: &mut dyn ConsumerConnection) {
    match connection.close().await {
        Ok(()) => debug!(stream = %stream, "Consumer connection closed"),
        Err(e) => warn!(stream = %stream, error = %e, "Failed to close consumer connection"),
    }
}

/// Messages of one subscription, in broker order.
///
/// Dropping it cancels the subscription and closes the connection in the
/// background; [`MessageStream::close`] does the same and waits for it.
pub struct MessageStream<M> {
    rx: mpsc::Receiver<M>,
    cancel: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    supervisor: Option<JoinHandle<()>>,
    done: bool,
    _guard: DropGuard,
}

impl<M> MessageStream<M> {
    fn new(rx: mpsc::Receiver<M>, cancel: CancellationToken, supervisor: JoinHandle<()>) -> Self {
        Self {
            rx,
            cancelled: Box::pin(cancel.clone().cancelled_owned()),
            _guard: cancel.clone().drop_guard(),
            cancel,
            supervisor: Some(supervisor),
            done: false,
        }
    }

    /// Stop consuming and wait until the connection has been closed.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(supervisor) = self.supervisor.take() {
            if let Err(e) = supervisor.await {
                error!(error = %e, "Subscription supervisor failed");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<M> std::fmt::Debug for MessageStream<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<M> Stream for MessageStream<M> {
    type Item = M;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<M>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.done = true;
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
