//! Core key types for slicedb.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::cmp::Ordering;

/// Sequence numbers identify write order; 56 usable bits.
pub type SequenceNumber = u64;

/// Value type indicator in internal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    /// Normal value.
    Value = 1,
    /// Deletion marker (tombstone).
    Deletion = 2,
}

impl ValueType {
    /// Create from byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(ValueType::Value),
            2 => Some(ValueType::Deletion),
            _ => None,
        }
    }

    /// Convert to byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Internal key format used for file boundaries and slices.
///
/// An internal key combines:
/// - User key (the key provided by the user)
/// - Sequence number (version for MVCC)
/// - Value type (Value or Deletion)
///
/// Encoded format:
/// ```text
/// [user_key][packed sequence+type (8 bytes)]
/// ```
///
/// The sequence and value_type are packed into 8 bytes with sequence
/// in the high 56 bits and value_type in the low 8 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    /// The user-provided key.
    user_key: Bytes,
    /// Sequence number (version).
    sequence: SequenceNumber,
    /// Value type.
    value_type: ValueType,
}

impl InternalKey {
    /// Maximum sequence number (56 bits).
    pub const MAX_SEQUENCE: u64 = (1 << 56) - 1;

    /// Create a new internal key.
    pub fn new(user_key: impl Into<Bytes>, sequence: SequenceNumber, value_type: ValueType) -> Self {
        debug_assert!(sequence <= Self::MAX_SEQUENCE);
        Self {
            user_key: user_key.into(),
            sequence,
            value_type,
        }
    }

    /// Create an internal key for a stored value.
    pub fn for_value(user_key: impl Into<Bytes>, sequence: SequenceNumber) -> Self {
        Self::new(user_key, sequence, ValueType::Value)
    }

    /// Get the user key.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    /// Get the sequence number.
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Get the value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Encode the internal key to bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.user_key.len() + 8);
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Encode into an existing buffer.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.user_key);
        let packed = (self.sequence << 8) | (self.value_type.to_byte() as u64);
        buf.put_u64(packed);
    }

    /// Decode an internal key from bytes.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }

        let user_key_len = data.len() - 8;
        let user_key = Bytes::copy_from_slice(&data[..user_key_len]);

        let mut packed_bytes = &data[user_key_len..];
        let packed = packed_bytes.get_u64();

        let value_type = ValueType::from_byte((packed & 0xFF) as u8)?;
        let sequence = packed >> 8;

        Some(Self {
            user_key,
            sequence,
            value_type,
        })
    }

    /// Get the encoded length.
    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + 8
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare user keys; for the same user key a newer sequence
        // sorts first so readers see the latest version.
        match self.user_key.cmp(&other.user_key) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
