//! The typed envelope carried over a [`Transport`](crate::Transport).

use halo_core::codec::{write_length_prefixed_bytes, write_u64_le, write_u8, Reader};
use halo_core::{CodecError, TickId};

/// What a message is for. Determines how the receiver demultiplexes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    /// Entities changing owner: one bundle per neighbour per tick, plus
    /// one per routed non-neighbour destination.
    Migration,
    /// Halo pieces of every field, one per neighbour per tick.
    Halo,
    /// Collective barrier arrival or release.
    Barrier,
    /// Remote point query.
    QueryRequest,
    /// Answer to a remote point query.
    QueryResponse,
    /// Data changing hands during re-partitioning.
    Repartition,
    /// Direct-delivery plan: who sends to whom outside the neighbourhood.
    Route,
}

impl MessageKind {
    const ALL: [MessageKind; 7] = [
        MessageKind::Migration,
        MessageKind::Halo,
        MessageKind::Barrier,
        MessageKind::QueryRequest,
        MessageKind::QueryResponse,
        MessageKind::Repartition,
        MessageKind::Route,
    ];

    /// Wire tag.
    pub fn tag(self) -> u8 {
        match self {
            MessageKind::Migration => 1,
            MessageKind::Halo => 2,
            MessageKind::Barrier => 3,
            MessageKind::QueryRequest => 4,
            MessageKind::QueryResponse => 5,
            MessageKind::Repartition => 6,
            MessageKind::Route => 7,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or(CodecError::InvalidTag { tag })
    }
}

/// A message: kind, the tick it belongs to, and an opaque body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Demultiplexing key.
    pub kind: MessageKind,
    /// Logical clock of the sender when the message was produced.
    pub tick: TickId,
    /// Payload, interpreted by the layer that sent it.
    pub body: Vec<u8>,
}

impl Message {
    /// A message of `kind` for `tick`.
    pub fn new(kind: MessageKind, tick: TickId, body: Vec<u8>) -> Self {
        Self { kind, tick, body }
    }

    /// Encode as `[tag u8][tick u64][len u32][body]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 8 + 4 + self.body.len());
        write_u8(&mut out, self.kind.tag());
        write_u64_le(&mut out, self.tick.0);
        write_length_prefixed_bytes(&mut out, &self.body);
        out
    }

    /// Decode a complete payload. Trailing bytes are an error.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let kind = MessageKind::from_tag(r.read_u8()?)?;
        let tick = TickId(r.read_u64_le()?);
        let body = r.read_length_prefixed_bytes()?.to_vec();
        r.finish()?;
        Ok(Self { kind, tick, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tags_are_distinct() {
        for a in MessageKind::ALL {
            for b in MessageKind::ALL {
                assert_eq!(a == b, a.tag() == b.tag());
            }
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut bytes = Message::new(MessageKind::Halo, TickId(1), vec![]).encode();
        bytes[0] = 0xEE;
        assert_eq!(
            Message::decode(&bytes),
            Err(CodecError::InvalidTag { tag: 0xEE })
        );
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = Message::new(MessageKind::Barrier, TickId(0), vec![1]).encode();
        bytes.push(0);
        assert!(matches!(
            Message::decode(&bytes),
            Err(CodecError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn layout_is_tag_tick_body() {
        let bytes = Message::new(MessageKind::Migration, TickId(2), vec![9, 8]).encode();
        assert_eq!(bytes, vec![1, 2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 9, 8]);
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = Message::decode(&bytes);
        }
    }
}
