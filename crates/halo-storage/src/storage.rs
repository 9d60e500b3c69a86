//! The `Storage` trait and cell value bound.

use halo_core::{CodecError, IntRect, Reader, Wire};
use std::fmt;

/// A value stored in a dense grid cell.
///
/// Blanket-implemented for every type meeting the bounds, so `f64`, `i32`,
/// `u8`, `bool` and user-defined `Copy` records with a `Wire` encoding all
/// qualify.
pub trait CellValue: Copy + Default + PartialEq + fmt::Debug + Send + Sync + Wire + 'static {}

impl<T> CellValue for T where T: Copy + Default + PartialEq + fmt::Debug + Send + Sync + Wire + 'static {}

/// Process-local data of one field over owned ∪ halo.
///
/// Coordinates are extended (see `halo_space::HaloLayout`). Entries are
/// either authoritative (inside the owned region, written by local code)
/// or replicas (halo copies, written only by [`unpack`](Self::unpack)).
///
/// # Determinism
///
/// [`pack`](Self::pack) must emit entries in a stable order fixed by the
/// data alone, so packing unchanged data twice yields identical bytes.
pub trait Storage: Send + 'static {
    /// Rectangle this storage can hold entries for.
    fn bounds(&self) -> IntRect;

    /// Append every authoritative entry inside `region` to `out`, with
    /// coordinates relative to `region.min`. Returns the entry count.
    fn pack(&self, region: IntRect, out: &mut Vec<u8>) -> usize;

    /// Replace the replicas inside `region` with a blob produced by
    /// [`pack`](Self::pack) over a region of the same shape.
    ///
    /// Existing replicas in `region` are cleared first. Returns the number
    /// of entries read.
    fn unpack(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError>;

    /// Take ownership of the entries in a packed blob, without clearing.
    ///
    /// Used when a region changes hands during re-partitioning.
    fn adopt(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError>;

    /// Drop replica data inside `region`.
    fn clear_region(&mut self, region: IntRect);

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether the storage holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild over new `bounds`, keeping authoritative entries inside
    /// `owned`. Replicas are dropped; the next sync restores them.
    fn resize(&mut self, bounds: IntRect, owned: IntRect);
}
