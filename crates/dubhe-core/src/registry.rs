//! Serialization codec registry.
//!
//! Envelope flags carry a 5-bit serialization id; this registry maps each id
//! to the codec that understands the payload bytes. Ids are open: new codecs
//! can be registered at runtime without touching existing ones.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{ProtocolError, Result};
use crate::hessian::{self, DecodeOptions, Value};
use crate::protocol::{Envelope, SERIALIZATION_HESSIAN2};
use crate::reply::{self, Reply};

/// A payload decoder for one serialization id.
pub trait BodyCodec: Send + Sync {
    /// The id this codec answers for.
    fn serialization_id(&self) -> u8;
    /// Decode one complete value from a payload.
    fn decode_value(&self, payload: &[u8]) -> Result<Value>;
    /// Classify a response payload (marker byte plus body).
    fn decode_reply(&self, payload: &[u8]) -> Result<Reply>;
}

/// The id-2 binary codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hessian2Codec {
    options: DecodeOptions,
}

impl Hessian2Codec {
    pub fn new(options: DecodeOptions) -> Hessian2Codec {
        Hessian2Codec { options }
    }
}

impl BodyCodec for Hessian2Codec {
    fn serialization_id(&self) -> u8 {
        SERIALIZATION_HESSIAN2
    }

    fn decode_value(&self, payload: &[u8]) -> Result<Value> {
        hessian::decode_value_with(payload, self.options)
    }

    fn decode_reply(&self, payload: &[u8]) -> Result<Reply> {
        reply::classify_with(payload, self.options)
    }
}

/// Registry and dispatcher from serialization id to [`BodyCodec`].
pub struct SerializationRegistry {
    codecs: DashMap<u8, Arc<dyn BodyCodec>>,
}

impl Default for SerializationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { codecs: DashMap::new() }
    }

    /// A registry with the stock codecs: Hessian2 under id 2.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(Hessian2Codec::default()));
        registry
    }

    /// Register a codec under its own id, replacing any previous occupant.
    pub fn register(&self, codec: Arc<dyn BodyCodec>) {
        let id = codec.serialization_id();
        tracing::debug!(serialization_id = id, "registering body codec");
        self.codecs.insert(id, codec);
    }

    pub fn registered_ids(&self) -> Vec<u8> {
        self.codecs.iter().map(|e| *e.key()).collect()
    }

    fn lookup(&self, id: u8) -> Result<Arc<dyn BodyCodec>> {
        self.codecs
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ProtocolError::UnknownSerialization(id).into())
    }

    /// Classify a response envelope's payload via the codec its flag names.
    pub fn classify_response(&self, envelope: &Envelope) -> Result<Reply> {
        let codec = self.lookup(envelope.serialization_id())?;
        codec.decode_reply(&envelope.payload)
    }

    /// Decode one value via the codec registered under `id`.
    pub fn decode_value(&self, id: u8, payload: &[u8]) -> Result<Value> {
        self.lookup(id)?.decode_value(payload)
    }
}
