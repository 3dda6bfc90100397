/// 编解码器实现
///
/// Frame boundaries come from `tokio_util::codec::LengthDelimitedCodec`
/// (4-byte big-endian prefix); this module turns one frame body into one
/// message and back.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// 单帧最大长度
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// 编解码器trait
pub trait Codec: Send {
    type Item: Send;
    type Error: std::error::Error + Send;

    /// 解码一帧
    fn decode(&self, frame: &[u8]) -> Result<Self::Item, Self::Error>;

    /// 编码为一帧
    fn encode(&self, item: &Self::Item) -> Result<Bytes, Self::Error>;
}

/// JSON编解码器
pub struct JsonCodec<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Send,
{
    type Item = T;
    type Error = CodecError;

    fn decode(&self, frame: &[u8]) -> Result<Self::Item, Self::Error> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                len: frame.len(),
                max: MAX_FRAME_LEN,
            });
        }
        Ok(serde_json::from_slice(frame)?)
    }

    fn encode(&self, item: &Self::Item) -> Result<Bytes, Self::Error> {
        let encoded = serde_json::to_vec(item)?;
        if encoded.len() > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                len: encoded.len(),
                max: MAX_FRAME_LEN,
            });
        }
        Ok(Bytes::from(encoded))
    }
}

/// 编解码错误
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Frame too large: {len} bytes (max: {max})")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::protocol::{PeerReply, PeerRequest};

    #[test]
    fn test_json_codec_request() {
        let codec = JsonCodec::<PeerRequest>::new();
        let frame = codec.encode(&PeerRequest::GetOrders).unwrap();
        assert_eq!(&frame[..], br#"{"type":"getOrders"}"#);
        assert_eq!(codec.decode(&frame).unwrap(), PeerRequest::GetOrders);
    }

    #[test]
    fn test_json_codec_bad_frame() {
        let codec = JsonCodec::<PeerReply>::new();
        assert!(matches!(codec.decode(b"[1,2").unwrap_err(), CodecError::Json(_)));
    }

    #[test]
    fn test_unknown_variant_cannot_be_encoded() {
        let codec = JsonCodec::<PeerRequest>::new();
        assert!(codec.encode(&PeerRequest::Unknown).is_err());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let codec = JsonCodec::<PeerReply>::new();
        let frame = vec![b' '; MAX_FRAME_LEN + 1];
        assert!(matches!(
            codec.decode(&frame).unwrap_err(),
            CodecError::FrameTooLarge { .. }
        ));
    }
}
