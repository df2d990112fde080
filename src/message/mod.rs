//! Envelope and codec boundary types.

mod codec;
mod envelope;

pub use codec::{Codec, CodecError, IdentityCodec};
pub use envelope::Envelope;
