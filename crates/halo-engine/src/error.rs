//! Synchronisation failures.

use halo_comm::TransportError;
use halo_core::{AccessError, CodecError, ConfigError, EntityId, FieldId, Pid, TickId};
use std::error::Error;
use std::fmt;

/// A tick (or collective operation) could not complete.
///
/// Transport and codec failures carry the process, tick and peer so the
/// aborted run can be diagnosed from the log line alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// Sending or receiving failed.
    Transport {
        /// This process.
        pid: Pid,
        /// Tick in progress.
        tick: TickId,
        /// Underlying failure (names the peer).
        source: TransportError,
    },
    /// A peer's payload did not decode against the local layout.
    Codec {
        /// This process.
        pid: Pid,
        /// Tick in progress.
        tick: TickId,
        /// Sender of the payload.
        peer: Pid,
        /// Underlying failure.
        source: CodecError,
    },
    /// One entity arrived from two sources in the same tick, or arrived
    /// while already owned here.
    MigrationRace {
        /// The entity.
        entity: EntityId,
        /// First holder seen.
        first: Pid,
        /// Second holder seen.
        second: Pid,
    },
    /// A field access failed.
    Access(AccessError),
    /// Invalid configuration for a collective operation.
    Config(ConfigError),
    /// Re-partitioning was requested with migrations still queued.
    PendingMigrations {
        /// Entities waiting in outboxes.
        count: usize,
    },
    /// A remote point query was answered with an error.
    RemoteQuery {
        /// The process that answered.
        peer: Pid,
        /// Its error message.
        reason: String,
    },
    /// A field handle does not belong to this node.
    UnknownField {
        /// The handle's field id.
        id: FieldId,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { pid, tick, .. } => {
                write!(f, "{pid} tick {}: transport failure", tick.0)
            }
            Self::Codec {
                pid, tick, peer, ..
            } => write!(f, "{pid} tick {}: undecodable payload from {peer}", tick.0),
            Self::MigrationRace {
                entity,
                first,
                second,
            } => write!(f, "entity {entity} migrated from both {first} and {second}"),
            Self::Access(e) => write!(f, "access: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::PendingMigrations { count } => {
                write!(f, "{count} migrations still queued")
            }
            Self::RemoteQuery { peer, reason } => {
                write!(f, "remote query to {peer} failed: {reason}")
            }
            Self::UnknownField { id } => write!(f, "field {} is not registered here", id.0),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Codec { source, .. } => Some(source),
            Self::Access(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AccessError> for SyncError {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}

impl From<ConfigError> for SyncError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
