//! Process-local field storage for Halo.
//!
//! A storage holds the data of one field over a rectangle of *extended*
//! coordinates (owned region plus halo). The [`Storage`] trait is the
//! narrow interface the synchroniser needs: deterministic [`pack`] of a
//! sub-rectangle and [`unpack`] of a peer's blob into halo replicas.
//!
//! [`pack`]: Storage::pack
//! [`unpack`]: Storage::unpack
//!
//! Two implementations are provided:
//!
//! - [`GridStorage`]: dense row-major cell values (`f64`, `i32`, or any
//!   [`CellValue`])
//! - [`ObjectStorage`]: identity-keyed entities at [`Location`]s, with
//!   bucketed spatial lookup

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod grid;
pub mod location;
pub mod object;
pub mod storage;

pub use grid::{DoubleGridStorage, GridStorage, IntGridStorage};
pub use location::Location;
pub use object::ObjectStorage;
pub use storage::{CellValue, Storage};
