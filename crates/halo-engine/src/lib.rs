//! Distributed fields and the per-tick synchroniser.
//!
//! A [`Node`] is one process of a partitioned simulation. Fields are
//! registered on it as typed [`FieldHandle`]s; agent code reads and
//! writes them through [`HaloField`], and the scheduler calls
//! [`Node::step`] once per tick to migrate entities, refresh halos and
//! pass the barrier.
//!
//! Grid fields ([`GridStorage`](halo_storage::GridStorage)) are dense cell
//! values. Object fields ([`ObjectStorage`](halo_storage::ObjectStorage))
//! hold entities with identity that move between partitions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod field;
pub mod metrics;
pub mod node;
mod query;
pub mod storage;

pub use config::{ClusterConfig, NodeConfig, PartitionScheme};
pub use error::SyncError;
pub use field::{FieldHandle, HaloField, Moved, SyncField};
pub use metrics::{SyncMetrics, SyncReport};
pub use node::Node;
pub use storage::FieldStorage;
