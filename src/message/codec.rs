//! Codec boundary: the core sees opaque payload bytes only.

use thiserror::Error;

/// Error returned by a `Codec` implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// A pluggable wire codec, injected at dispatcher registration time.
///
/// The core never depends on a concrete codec (binary, JSON, protobuf are
/// all interchangeable); this trait is the seam.
pub trait Codec<T>: Send + Sync + 'static {
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Transparent codec for types already expressed as bytes, used in tests
/// and by dispatchers that do their own (de)serialization.
pub struct IdentityCodec;

impl Codec<Vec<u8>> for IdentityCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_codec_round_trips() {
        let codec = IdentityCodec;
        let original = vec![1u8, 2, 3];
        let encoded = codec.encode(&original).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }
}
