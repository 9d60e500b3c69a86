//! Error types shared across the workspace.
//!
//! Organised by failure class: configuration (fatal before the run starts),
//! partition geometry, field access (programming errors in calling code),
//! and the wire codec.

use std::error::Error;
use std::fmt;

use crate::id::{EntityId, Pid};

// ── ConfigError ────────────────────────────────────────────────────

/// Invalid partition, AOI, or process-count combination.
///
/// Always surfaced at startup, before any tick runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The domain has a zero extent.
    EmptyDomain,
    /// A domain extent is too large for `i32` coordinates.
    DomainTooLarge {
        /// Which axis.
        name: &'static str,
        /// The configured extent.
        value: u32,
        /// Largest accepted extent.
        max: u32,
    },
    /// A partition count of zero was requested.
    ZeroPartitions,
    /// The partition count does not match the communication group size.
    GroupSizeMismatch {
        /// Partitions in the scheme.
        partitions: usize,
        /// Processes in the transport group.
        group: usize,
    },
    /// The AOI exceeds half the shortest owned side, so one neighbour could
    /// not supply a full halo.
    AoiTooLarge {
        /// Offending axis (`"x"` or `"y"`).
        axis: &'static str,
        /// Configured AOI on that axis.
        aoi: u32,
        /// Shortest owned side on that axis.
        min_side: u32,
    },
    /// A requested decomposition does not fit the domain.
    InvalidDecomposition {
        /// What went wrong.
        reason: String,
    },
    /// Partition geometry could not be built.
    Partition(PartitionError),
    /// A field parameter is invalid.
    InvalidField {
        /// Description of the validation failure.
        reason: String,
    },
    /// The exchange timeout is zero.
    ZeroTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDomain => write!(f, "domain must have at least one cell"),
            Self::DomainTooLarge { name, value, max } => {
                write!(f, "domain {name} {value} exceeds maximum {max}")
            }
            Self::ZeroPartitions => write!(f, "partition count must be at least 1"),
            Self::GroupSizeMismatch { partitions, group } => write!(
                f,
                "partition scheme has {partitions} partitions but the transport group has {group} processes"
            ),
            Self::AoiTooLarge {
                axis,
                aoi,
                min_side,
            } => write!(
                f,
                "aoi {aoi} on axis {axis} exceeds half the shortest owned side ({min_side})"
            ),
            Self::InvalidDecomposition { reason } => {
                write!(f, "invalid decomposition: {reason}")
            }
            Self::Partition(e) => write!(f, "partition: {e}"),
            Self::InvalidField { reason } => write!(f, "invalid field: {reason}"),
            Self::ZeroTimeout => write!(f, "exchange timeout must be non-zero"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Partition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartitionError> for ConfigError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

// ── PartitionError ─────────────────────────────────────────────────

/// Errors from partition geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionError {
    /// A point lies outside a bounded domain.
    OutOfDomain {
        /// The offending point.
        point: String,
    },
    /// The owned regions do not tile the domain exactly.
    InvalidCoverage {
        /// What went wrong.
        reason: String,
    },
    /// A partition was assigned no cells.
    EmptyRegion {
        /// The partition with the empty region.
        pid: Pid,
    },
    /// A pid outside `0..num_partitions` was requested.
    UnknownPid {
        /// The requested pid.
        pid: Pid,
        /// Number of partitions.
        count: usize,
    },
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfDomain { point } => write!(f, "point {point} is outside the domain"),
            Self::InvalidCoverage { reason } => write!(f, "invalid coverage: {reason}"),
            Self::EmptyRegion { pid } => write!(f, "partition {pid} owns no cells"),
            Self::UnknownPid { pid, count } => {
                write!(f, "pid {pid} out of range for {count} partitions")
            }
        }
    }
}

impl Error for PartitionError {}

// ── AccessError ────────────────────────────────────────────────────

/// Invalid reads or writes against a field.
///
/// These are programming errors in the calling agent code and fail loudly
/// rather than being clamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// The point is outside a bounded domain.
    OutOfDomain {
        /// The offending point.
        point: String,
        /// The domain rectangle.
        domain: String,
    },
    /// A write targeted a point this process does not own (halo replicas
    /// are read-only).
    NotOwned {
        /// The offending point.
        point: String,
        /// The process that attempted the write.
        pid: Pid,
    },
    /// A local read fell outside owned ∪ halo.
    OutsideHalo {
        /// The offending point.
        point: String,
        /// The process that owns the point.
        owner: Pid,
    },
    /// No entity with this id is stored locally.
    UnknownEntity {
        /// The missing id.
        id: EntityId,
    },
    /// An entity with this id is already stored locally.
    DuplicateEntity {
        /// The duplicated id.
        id: EntityId,
    },
    /// The entity is a halo replica and cannot be mutated here.
    ReplicaWrite {
        /// The replica's id.
        id: EntityId,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfDomain { point, domain } => {
                write!(f, "point {point} outside domain {domain}")
            }
            Self::NotOwned { point, pid } => {
                write!(f, "point {point} is not owned by {pid}; halo cells are read-only")
            }
            Self::OutsideHalo { point, owner } => {
                write!(f, "point {point} is outside the local halo (owner {owner})")
            }
            Self::UnknownEntity { id } => write!(f, "entity {id} is not stored locally"),
            Self::DuplicateEntity { id } => write!(f, "entity {id} is already stored locally"),
            Self::ReplicaWrite { id } => {
                write!(f, "entity {id} is a halo replica and cannot be mutated")
            }
        }
    }
}

impl Error for AccessError {}

// ── CodecError ─────────────────────────────────────────────────────

/// Malformed encoded data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended early.
    Truncated {
        /// Bytes the read required.
        needed: usize,
        /// Bytes that were left.
        available: usize,
    },
    /// Bytes were left over after decoding.
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },
    /// An enum or flag tag is not recognised.
    InvalidTag {
        /// The unrecognised tag.
        tag: u8,
    },
    /// Structurally valid bytes that describe an impossible value.
    Invalid {
        /// Human-readable description.
        detail: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated input: needed {needed} bytes, {available} available")
            }
            Self::TrailingBytes { count } => write!(f, "{count} trailing bytes"),
            Self::InvalidTag { tag } => write!(f, "invalid tag {tag}"),
            Self::Invalid { detail } => write!(f, "invalid data: {detail}"),
        }
    }
}

impl Error for CodecError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exposes_partition_source() {
        let e = ConfigError::from(PartitionError::EmptyRegion { pid: Pid(2) });
        assert!(e.source().is_some());
        assert_eq!(e.to_string(), "partition: partition P2 owns no cells");
    }

    #[test]
    fn not_owned_message_names_pid() {
        let e = AccessError::NotOwned {
            point: "(5, 4)".into(),
            pid: Pid(0),
        };
        assert!(e.to_string().contains("P0"));
    }
}
