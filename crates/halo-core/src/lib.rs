//! Core types for Halo distributed fields.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other crate in the workspace: partition and
//! entity identifiers, 2D geometry, the global domain, the binary wire
//! codec used for halo packs and migrations, and the error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod domain;
pub mod entity;
pub mod error;
pub mod geom;
pub mod id;

pub use codec::{Reader, Wire};
pub use domain::{Boundary, GlobalDomain};
pub use entity::Entity;
pub use error::{AccessError, CodecError, ConfigError, PartitionError};
pub use geom::{Aoi, GridPoint, IntRect, Position};
pub use id::{EntityId, FieldId, IdAllocator, Pid, TickId};
