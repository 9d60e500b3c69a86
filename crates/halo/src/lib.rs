//! Halo: partitioned spatial fields for distributed agent-based simulation.
//!
//! The global domain is cut into one rectangle per process. Each process
//! keeps its own rectangle plus a read-only border (the halo) wide enough
//! for neighbourhood queries, and a once-per-tick sync refreshes the
//! border from the neighbours and hands over agents that crossed a cut.
//!
//! This is the facade crate re-exporting the sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use halo::prelude::*;
//! use std::sync::Arc;
//!
//! let domain = GlobalDomain::new(16, 16, Boundary::Toroidal).unwrap();
//! let partition: Arc<dyn Partition> = Arc::new(GridPartition::new(domain, 1, 1).unwrap());
//! let mut node = Node::new(NodeConfig::default(), partition, SingleProcess).unwrap();
//! let heat = node.add_grid_field("heat", 0.0f64);
//!
//! node.field_mut(heat).unwrap().set(GridPoint::new(0, 0), 1.0).unwrap();
//! node.step().unwrap();
//!
//! // The halo cell just past the far corner now mirrors the origin.
//! let field = node.field(heat).unwrap();
//! assert_eq!(field.storage().get(GridPoint::new(16, 16)), Some(1.0));
//! assert_eq!(field.get(GridPoint::new(-16, 0)).unwrap(), 1.0);
//! assert_eq!(node.tick(), TickId(1));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `halo-core` | IDs, geometry, domain, wire codec, errors |
//! | [`space`] | `halo-space` | Partitions and halo layouts |
//! | [`storage`] | `halo-storage` | Grid and object storages |
//! | [`comm`] | `halo-comm` | Transport contract, mailbox, in-process cluster |
//! | [`engine`] | `halo-engine` | Halo fields, nodes and the synchroniser |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, geometry and the wire codec (`halo-core`).
pub use halo_core as types;

/// Partitions and per-process halo layouts (`halo-space`).
///
/// [`space::GridPartition`] for uniform blocks, [`space::RectPartition`]
/// for explicit rectangles.
pub use halo_space as space;

/// Process-local field storage (`halo-storage`).
pub use halo_storage as storage;

/// Point-to-point messaging (`halo-comm`).
///
/// Implement [`comm::Transport`] to run over another message-passing
/// runtime; [`comm::LocalCluster`] runs a whole group in one process.
pub use halo_comm as comm;

/// Halo fields, nodes and the per-tick synchroniser (`halo-engine`).
pub use halo_engine as engine;

/// Common imports for typical Halo usage.
///
/// ```rust
/// use halo::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use halo_core::{
        Aoi, Boundary, Entity, EntityId, FieldId, GlobalDomain, GridPoint, IdAllocator, IntRect, Pid,
        Position, TickId, Wire,
    };

    // Errors
    pub use halo_core::{AccessError, CodecError, ConfigError, PartitionError};

    // Space
    pub use halo_space::{GridPartition, HaloLayout, Partition, RectPartition};

    // Storage
    pub use halo_storage::{CellValue, GridStorage, Location, ObjectStorage, Storage};

    // Transport
    pub use halo_comm::{ChannelTransport, LocalCluster, SingleProcess, Transport, TransportError};

    // Engine
    pub use halo_engine::{
        ClusterConfig, FieldHandle, HaloField, Moved, Node, NodeConfig, PartitionScheme, SyncError,
        SyncMetrics, SyncReport,
    };
}
