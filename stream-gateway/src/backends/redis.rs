//! Redis Streams backend.
//!
//! Streams are created explicitly with `XGROUP CREATE ... MKSTREAM` so that a
//! send with `NOMKSTREAM` can detect a missing stream instead of silently
//! creating it. Consumers read with `XREAD BLOCK` from `0-0`.
//!
//! Creation runs as one script: a key that was already present, with or
//! without the gateway group, counts as an existing stream.

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, IntoConnectionInfo, RedisError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broker::{ConsumerConnection, Delivery, DeliveryHandler, OffsetSpec, StreamBroker};
use crate::config::BrokerEndpoint;
use crate::error::BrokerError;

/// Consumer group created alongside every stream; its existence marks the
/// stream as created by the gateway.
const GATEWAY_GROUP: &str = "stream-gateway";

/// Entry field holding the encoded message.
const DATA_FIELD: &str = "data";

const FIRST_ID: &str = "0-0";
const READ_BATCH: usize = 64;
const DEFAULT_BLOCK: Duration = Duration::from_secs(5);

/// Returns 1 when the stream was created, 0 when the key already existed.
const CREATE_STREAM_SCRIPT: &str = r#"
local existed = redis.call('EXISTS', KEYS[1])
local reply = redis.pcall('XGROUP', 'CREATE', KEYS[1], ARGV[1], '$', 'MKSTREAM')
if type(reply) == 'table' and reply.err then
    if string.sub(reply.err, 1, 9) == 'BUSYGROUP' then
        return 0
    end
    return redis.error_reply(reply.err)
end
if existed == 1 then
    return 0
end
return 1
"#;

fn map_redis_error(err: RedisError) -> BrokerError {
    if err.is_connection_refusal() {
        BrokerError::ConnectionRefused(err.to_string())
    } else {
        BrokerError::Other(err.to_string())
    }
}

pub struct RedisStreamBroker {
    client: redis::Client,
    producer: OnceCell<ConnectionManager>,
    create_script: redis::Script,
    block_timeout: Duration,
}

impl RedisStreamBroker {
    pub fn new(endpoint: &BrokerEndpoint) -> Result<Self, BrokerError> {
        let mut info = (endpoint.host.clone(), endpoint.port)
            .into_connection_info()
            .map_err(map_redis_error)?;
        info.redis.username = Some(endpoint.username.clone());
        if endpoint.has_password() {
            info.redis.password = Some(endpoint.password.clone());
        }

        let client = redis::Client::open(info).map_err(map_redis_error)?;
        info!(host = %endpoint.host, port = endpoint.port, "Redis stream broker configured");

        Ok(Self::with_client(client))
    }

    /// Broker for a `redis://` URL, credentials included.
    pub fn from_url(url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        Ok(Self::with_client(client))
    }

    fn with_client(client: redis::Client) -> Self {
        Self {
            client,
            producer: OnceCell::new(),
            create_script: redis::Script::new(CREATE_STREAM_SCRIPT),
            block_timeout: DEFAULT_BLOCK,
        }
    }

    /// How long a consumer's `XREAD` blocks before checking for shutdown.
    pub fn with_block_timeout(mut self, block_timeout: Duration) -> Self {
        self.block_timeout = block_timeout;
        self
    }

    /// The shared producer connection, established on first use. A refused
    /// attempt leaves the cell empty so the next call tries again.
    async fn producer(&self) -> Result<ConnectionManager, BrokerError> {
        self.producer
            .get_or_try_init(|| async {
                let manager = self
                    .client
                    .get_connection_manager()
                    .await
                    .map_err(map_redis_error)?;
                info!("Producer connection established");
                Ok::<_, BrokerError>(manager)
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl StreamBroker for RedisStreamBroker {
    async fn create_stream(&self, name: &str) -> Result<(), BrokerError> {
        let mut conn = self.producer().await?;

        let created: i64 = self
            .create_script
            .key(name)
            .arg(GATEWAY_GROUP)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        if created == 1 {
            Ok(())
        } else {
            Err(BrokerError::AlreadyExists)
        }
    }

    async fn send(&self, stream: &str, data: Bytes) -> Result<(), BrokerError> {
        let mut conn = self.producer().await?;

        let id: Option<String> = redis::cmd("XADD")
            .arg(stream)
            .arg("NOMKSTREAM")
            .arg("*")
            .arg(DATA_FIELD)
            .arg(data.as_ref())
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        match id {
            Some(id) => {
                debug!(stream = %stream, id = %id, "Appended entry");
                Ok(())
            }
            None => Err(BrokerError::StreamDoesNotExist),
        }
    }

    async fn connect_consumer(&self) -> Result<Box<dyn ConsumerConnection>, BrokerError> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;

        Ok(Box::new(RedisConsumer {
            conn: Some(conn),
            shutdown: CancellationToken::new(),
            reader: None,
            block_timeout: self.block_timeout,
        }))
    }
}

/// One dedicated connection; moved into the reader task once subscribed.
struct RedisConsumer {
    conn: Option<MultiplexedConnection>,
    shutdown: CancellationToken,
    reader: Option<JoinHandle<()>>,
    block_timeout: Duration,
}

impl RedisConsumer {
    async fn read_loop(
        mut conn: MultiplexedConnection,
        stream: String,
        handler: Arc<dyn DeliveryHandler>,
        shutdown: CancellationToken,
        block_timeout: Duration,
    ) {
        let options = StreamReadOptions::default()
            .block(block_timeout.as_millis() as usize)
            .count(READ_BATCH);
        let mut last_id = FIRST_ID.to_string();

        'read: loop {
            let keys = [&stream];
            let ids = [&last_id];
            let reply: Option<StreamReadReply> = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break 'read,
                reply = conn.xread_options(&keys, &ids, &options) => match reply {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(stream = %stream, error = %e, "XREAD failed, stopping delivery");
                        break 'read;
                    }
                }
            };

            let Some(reply) = reply else {
                continue;
            };

            for key in reply.keys {
                for entry in key.ids {
                    last_id = entry.id.clone();

                    let Some(data) = entry.get::<Vec<u8>>(DATA_FIELD) else {
                        warn!(stream = %stream, id = %entry.id, "Entry without data field skipped");
                        continue;
                    };

                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break 'read,
                        flow = handler.deliver(Bytes::from(data)) => {
                            if flow == Delivery::Stop {
                                break 'read;
                            }
                        }
                    }
                }
            }
        }

        debug!(stream = %stream, last_id = %last_id, "Redis consumer reader stopped");
    }
}

#[async_trait]
impl ConsumerConnection for RedisConsumer {
    async fn subscribe(
        &mut self,
        stream: &str,
        offset: OffsetSpec,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), BrokerError> {
        let OffsetSpec::First = offset;

        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| BrokerError::Other("connection already has a subscription".to_string()))?;

        let exists: bool = match conn.exists(stream).await {
            Ok(exists) => exists,
            Err(e) => {
                self.conn = Some(conn);
                return Err(map_redis_error(e));
            }
        };
        if !exists {
            self.conn = Some(conn);
            return Err(BrokerError::StreamDoesNotExist);
        }

        self.reader = Some(tokio::spawn(Self::read_loop(
            conn,
            stream.to_string(),
            handler,
            self.shutdown.clone(),
            self.block_timeout,
        )));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.shutdown.cancel();
        self.conn = None;

        if let Some(reader) = self.reader.take() {
            reader
                .await
                .map_err(|e| BrokerError::Other(format!("reader task failed: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tokio::sync::mpsc;

    #[test]
    fn test_broker_builds_without_connecting() {
        let endpoint = BrokerEndpoint {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "default".to_string(),
            password: "secret".to_string(),
        };

        assert!(RedisStreamBroker::new(&endpoint).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_broker_reports_connection_refused() {
        // Port 1 on loopback is closed on any sane test host.
        let endpoint = BrokerEndpoint {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..BrokerEndpoint::default()
        };
        let broker = RedisStreamBroker::new(&endpoint).unwrap();

        let err = broker.create_stream("general").await.unwrap_err();
        assert!(err.is_connection_refused(), "unexpected error: {:?}", err);
    }

    // The tests below need a server and run only when REDIS_URL is set.

    struct Collect(mpsc::UnboundedSender<Bytes>);

    #[async_trait]
    impl DeliveryHandler for Collect {
        async fn deliver(&self, data: Bytes) -> Delivery {
            match self.0.send(data) {
                Ok(()) => Delivery::Continue,
                Err(_) => Delivery::Stop,
            }
        }
    }

    fn live_broker() -> Option<RedisStreamBroker> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(
            RedisStreamBroker::from_url(&url)
                .unwrap()
                .with_block_timeout(Duration::from_millis(100)),
        )
    }

    fn unique_stream(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("test:{}:{}:{}", prefix, std::process::id(), nanos)
    }

    async fn delete_key(broker: &RedisStreamBroker, key: &str) {
        let mut conn = broker.client.get_multiplexed_async_connection().await.unwrap();
        let _: i64 = conn.del(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_live_create_then_already_exists() {
        let Some(broker) = live_broker() else { return };
        let stream = unique_stream("create");

        assert_eq!(broker.create_stream(&stream).await, Ok(()));
        assert_eq!(
            broker.create_stream(&stream).await,
            Err(BrokerError::AlreadyExists)
        );

        delete_key(&broker, &stream).await;
    }

    #[tokio::test]
    async fn test_live_stream_written_by_other_producer_already_exists() {
        let Some(broker) = live_broker() else { return };
        let stream = unique_stream("foreign");

        let mut conn = broker.client.get_multiplexed_async_connection().await.unwrap();
        let _: String = conn.xadd(&stream, "*", &[(DATA_FIELD, "x")]).await.unwrap();

        assert_eq!(
            broker.create_stream(&stream).await,
            Err(BrokerError::AlreadyExists)
        );

        delete_key(&broker, &stream).await;
    }

    #[tokio::test]
    async fn test_live_send_to_missing_stream() {
        let Some(broker) = live_broker() else { return };
        let stream = unique_stream("missing");

        assert_eq!(
            broker.send(&stream, Bytes::from_static(b"x")).await,
            Err(BrokerError::StreamDoesNotExist)
        );
    }

    #[tokio::test]
    async fn test_live_consumer_reads_from_first_in_order() {
        let Some(broker) = live_broker() else { return };
        let stream = unique_stream("order");

        broker.create_stream(&stream).await.unwrap();
        broker.send(&stream, Bytes::from_static(b"first")).await.unwrap();
        broker.send(&stream, Bytes::from_static(b"second")).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut consumer = broker.connect_consumer().await.unwrap();
        consumer
            .subscribe(&stream, OffsetSpec::First, Arc::new(Collect(tx)))
            .await
            .unwrap();
        broker.send(&stream, Bytes::from_static(b"third")).await.unwrap();

        for expected in ["first", "second", "third"] {
            let data = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(data, Bytes::from(expected));
        }

        consumer.close().await.unwrap();
        delete_key(&broker, &stream).await;
    }
}
