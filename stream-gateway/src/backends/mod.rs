//! Broker backends implementing [`StreamBroker`](crate::broker::StreamBroker).

pub mod memory;
pub mod redis;

pub use memory::{MemoryBroker, MemoryBrokerStats};
pub use redis::RedisStreamBroker;
