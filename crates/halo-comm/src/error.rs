//! Transport failures.

use halo_core::{CodecError, Pid, TickId};
use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::message::MessageKind;

/// A message could not be delivered or understood.
///
/// Every variant is fatal to the tick in progress: the caller must not
/// continue with partial halo data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// No matching message arrived within the configured wait.
    Timeout {
        /// The peer being waited on.
        peer: Pid,
        /// What was expected.
        kind: MessageKind,
        /// How long the wait lasted.
        waited: Duration,
    },
    /// The peer's endpoint is gone.
    Disconnected {
        /// The unreachable peer.
        peer: Pid,
    },
    /// Every peer endpoint is gone; nothing can arrive any more.
    Closed,
    /// A payload failed to decode.
    Malformed {
        /// Sender of the payload.
        from: Pid,
        /// Decoder failure.
        source: CodecError,
    },
    /// A message for a different tick arrived where the current one was
    /// expected.
    OutOfOrder {
        /// Sender.
        from: Pid,
        /// Message kind.
        kind: MessageKind,
        /// Tick being processed.
        expected: TickId,
        /// Tick carried by the message.
        got: TickId,
    },
    /// A process tried to message itself.
    SelfSend {
        /// The sending pid.
        pid: Pid,
    },
    /// The destination is outside the group.
    UnknownPeer {
        /// The requested pid.
        pid: Pid,
        /// Group size.
        count: usize,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { peer, kind, waited } => {
                write!(f, "timed out after {waited:?} waiting for {kind:?} from {peer}")
            }
            Self::Disconnected { peer } => write!(f, "peer {peer} disconnected"),
            Self::Closed => write!(f, "all peers disconnected"),
            Self::Malformed { from, .. } => write!(f, "malformed message from {from}"),
            Self::OutOfOrder {
                from,
                kind,
                expected,
                got,
            } => write!(
                f,
                "{kind:?} from {from} carries tick {} while tick {} is in progress",
                got.0, expected.0
            ),
            Self::SelfSend { pid } => write!(f, "{pid} attempted to send to itself"),
            Self::UnknownPeer { pid, count } => {
                write!(f, "pid {pid} out of range for a group of {count}")
            }
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_chains_codec_error() {
        let err = TransportError::Malformed {
            from: Pid(3),
            source: CodecError::TrailingBytes { count: 2 },
        };
        assert_eq!(err.to_string(), "malformed message from P3");
        assert!(err.source().is_some());
    }

    #[test]
    fn timeout_names_peer_and_kind() {
        let err = TransportError::Timeout {
            peer: Pid(1),
            kind: MessageKind::Halo,
            waited: Duration::from_millis(5),
        };
        assert_eq!(err.to_string(), "timed out after 5ms waiting for Halo from P1");
    }
}
