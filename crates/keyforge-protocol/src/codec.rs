//! Codec trait and implementations for login frames.
//!
//! The handler never touches `serde_json` directly; it goes through a
//! [`Codec`] so a binary encoding can replace JSON without touching the
//! request-handling code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;
#[cfg(feature = "json")]
use crate::{ComboTokenData, ComboTokenRequest};

/// Encodes values to frame bytes and decodes frame bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use keyforge_protocol::{ClientRequest, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = Envelope {
///     seq: 3,
///     body: ClientRequest::ResetPassword { username: "bob".into() },
/// };
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: Envelope<ClientRequest> = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(feature = "json")]
impl ComboTokenRequest {
    /// Decodes the nested `data` document.
    ///
    /// Game clients always send this field as a JSON string, whatever
    /// codec carries the outer frame.
    ///
    /// # Errors
    /// - `ProtocolError::InvalidMessage` if `data` is empty
    /// - `ProtocolError::Decode` if it is not a valid [`ComboTokenData`]
    pub fn decode_data(&self) -> Result<ComboTokenData, ProtocolError> {
        if self.data.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "combo token request carries no data".into(),
            ));
        }
        serde_json::from_str(&self.data).map_err(ProtocolError::Decode)
    }
}
