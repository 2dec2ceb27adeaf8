//! Message codecs turning application payloads into broker bytes and back.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use crate::error::CodecError;

pub trait MessageCodec: Send + Sync + 'static {
    type Message: Send + 'static;

    fn encode(&self, message: &Self::Message) -> Result<Bytes, CodecError>;

    fn decode(&self, data: &[u8]) -> Result<Self::Message, CodecError>;
}

/// JSON codec for any serde type.
#[derive(Debug)]
pub struct JsonCodec<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M> JsonCodec<M> {
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<M> Default for JsonCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for JsonCodec<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> MessageCodec for JsonCodec<M>
where
    M: Serialize + DeserializeOwned + Send + 'static,
{
    type Message = M;

    fn encode(&self, message: &M) -> Result<Bytes, CodecError> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<M, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
