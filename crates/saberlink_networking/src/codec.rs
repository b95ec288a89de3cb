//! # Wire Codec
//!
//! JSON encoding of [`PeerMessage`]. Receivers discriminate on the `type` tag.

use crate::error::CodecError;
use saberlink_shared::PeerMessage;

/// Largest payload accepted from a peer.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Encodes a message.
///
/// # Errors
///
/// Serialization failure, or an encoded size above [`MAX_MESSAGE_SIZE`].
pub fn encode(message: &PeerMessage) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

/// Decodes a message.
///
/// # Errors
///
/// Oversized payloads and anything that is not a known message.
pub fn decode(bytes: &[u8]) -> Result<PeerMessage, CodecError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}
