//! Domain partitioning and halo geometry.
//!
//! This crate defines the [`Partition`] trait, which assigns every process a
//! disjoint owned rectangle of the [`GlobalDomain`](halo_core::GlobalDomain),
//! together with two schemes and the per-process [`HaloLayout`].
//!
//! # Schemes
//!
//! - [`GridPartition`]: uniform `px × py` block (Moore) decomposition
//! - [`RectPartition`]: explicit, possibly non-uniform rectangles
//!
//! # Halo layout
//!
//! A [`HaloLayout`] is computed identically on every process from the
//! partition and the AOI. It lists the halo pieces each neighbour supplies
//! ([`HaloLink`]) in a fixed order, so sender and receiver agree on the
//! shape of every exchanged blob without negotiating.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod grid;
pub mod layout;
pub mod partition;
pub mod rects;

#[cfg(test)]
pub(crate) mod compliance;

pub use grid::GridPartition;
pub use layout::{halo_region, neighbors, validate_aoi, HaloLayout, HaloLink};
pub use partition::Partition;
pub use rects::{RectPartition, RectPartitionBuilder};
