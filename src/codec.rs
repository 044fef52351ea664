//! The codec port (spec.md C2): opaque byte <-> [`Message`] conversion.
//!
//! Pure, no I/O. Backends that serialize messages onto the wire (relational
//! `content BLOB`, key-value hash values, log topic values) go through a
//! `Codec` rather than hard-coding a format, so callers can swap in their
//! own payload framing without touching the state machine.

use crate::error::QueueError;
use crate::message::Message;
use bytes::Bytes;

/// Encodes and decodes whole [`Message`] values to and from opaque bytes.
pub trait Codec: Send + Sync {
    fn encode(&self, msg: &Message) -> Result<Bytes, QueueError>;
    fn decode(&self, bytes: &[u8]) -> Result<Message, QueueError>;
}

/// A codec that stores the message id, retry metadata, and payload as a
/// small length-prefixed binary frame. Reasonable default for backends that
/// don't otherwise dictate a wire format; concrete message subtypes (e.g.
/// UTF-8 text messages) are out of scope here per spec.md §1 and are left
/// to crate consumers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, msg: &Message) -> Result<Bytes, QueueError> {
        let mut out = Vec::with_capacity(32 + msg.payload().len());
        out.extend_from_slice(&msg.id().to_le_bytes());
        out.extend_from_slice(&msg.num_requeues().to_le_bytes());
        let original = msg.original_timestamp().map(|t| t.timestamp_millis()).unwrap_or(-1);
        let current = msg.timestamp().map(|t| t.timestamp_millis()).unwrap_or(-1);
        out.extend_from_slice(&original.to_le_bytes());
        out.extend_from_slice(&current.to_le_bytes());
        out.extend_from_slice(&(msg.payload().len() as u64).to_le_bytes());
        out.extend_from_slice(msg.payload());
        Ok(Bytes::from(out))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Message, QueueError> {
        const HEADER_LEN: usize = 8 + 4 + 8 + 8 + 8;
        if bytes.len() < HEADER_LEN {
            return Err(QueueError::Serialization(format!(
                "frame too short: {} bytes, need at least {}",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let id = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let num_requeues = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let original_ms = i64::from_le_bytes(bytes[12..20].try_into().unwrap());
        let current_ms = i64::from_le_bytes(bytes[20..28].try_into().unwrap());
        let payload_len = u64::from_le_bytes(bytes[28..36].try_into().unwrap()) as usize;

        let payload = bytes
            .get(36..36 + payload_len)
            .ok_or_else(|| QueueError::Serialization("payload length exceeds frame".into()))?;

        let mut msg = Message::new(id, Bytes::copy_from_slice(payload));
        msg.set_num_requeues(num_requeues);
        if let Some(t) = chrono::DateTime::from_timestamp_millis(original_ms) {
            msg.set_original_timestamp(t);
        }
        if let Some(t) = chrono::DateTime::from_timestamp_millis(current_ms) {
            msg.set_timestamp(t);
        }
        Ok(msg)
    }
}
