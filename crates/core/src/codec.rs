//! Value <-> bytes codecs
//!
//! A codec is a pair of pure functions. Any format works as long as both
//! directions are total (they return an error instead of panicking).

use crate::error::{DecodeError, EncodeError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialization format used by a store
pub trait Codec<T> {
    /// Serialize a value into its stored form
    fn encode(&self, value: &T) -> Result<Vec<u8>, EncodeError>;

    /// Parse a stored form back into a value
    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError>;
}

/// JSON via `serde_json` (the default format)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output, handy for files people open by hand
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        bytes.map_err(EncodeError::new)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(bytes).map_err(DecodeError::new)
    }
}

/// Compact binary encoding via `bincode`
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<T> Codec<T> for BincodeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        bincode::serialize(value).map_err(EncodeError::new)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        bincode::deserialize(bytes).map_err(DecodeError::new)
    }
}
