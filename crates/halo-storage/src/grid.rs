//! Dense row-major cell storage.

use crate::storage::{CellValue, Storage};
use halo_core::codec::{write_u32_le, Reader};
use halo_core::{CodecError, GridPoint, IntRect};

/// Dense storage of one value per cell over a rectangle.
///
/// Untouched cells hold the default value given at construction. The
/// buffer is row-major: `y` outer, `x` inner, matching
/// [`IntRect::iter`].
#[derive(Clone, Debug, PartialEq)]
pub struct GridStorage<T: CellValue> {
    bounds: IntRect,
    default: T,
    cells: Vec<T>,
}

/// Grid of doubles.
pub type DoubleGridStorage = GridStorage<f64>;

/// Grid of integers.
pub type IntGridStorage = GridStorage<i32>;

impl<T: CellValue> GridStorage<T> {
    /// Storage over `bounds` with every cell set to `default`.
    pub fn new(bounds: IntRect, default: T) -> Self {
        Self {
            bounds,
            default,
            cells: vec![default; bounds.area()],
        }
    }

    /// The value untouched cells hold.
    pub fn default_value(&self) -> T {
        self.default
    }

    fn index(&self, p: GridPoint) -> Option<usize> {
        self.bounds
            .contains(p)
            .then(|| self.bounds.offset_of(p))
    }

    /// Value at `p`, or `None` outside the bounds.
    pub fn get(&self, p: GridPoint) -> Option<T> {
        self.index(p).map(|i| self.cells[i])
    }

    /// Mutable access to the cell at `p`.
    pub fn get_mut(&mut self, p: GridPoint) -> Option<&mut T> {
        let i = self.index(p)?;
        Some(&mut self.cells[i])
    }

    /// Write `value` at `p`, returning the previous value.
    ///
    /// `None` (and no write) when `p` is outside the bounds.
    pub fn set(&mut self, p: GridPoint, value: T) -> Option<T> {
        let slot = self.get_mut(p)?;
        Some(std::mem::replace(slot, value))
    }

    /// Restore the default at `p`, returning the previous value.
    pub fn reset(&mut self, p: GridPoint) -> Option<T> {
        let default = self.default;
        self.set(p, default)
    }

    /// Set every cell in `region` (clipped to the bounds) to `value`.
    pub fn fill_region(&mut self, region: IntRect, value: T) {
        let region = region.clip(&self.bounds);
        for y in region.min.y..region.max.y {
            let start = self.bounds.offset_of(GridPoint::new(region.min.x, y));
            self.cells[start..start + region.width() as usize].fill(value);
        }
    }

    /// Cells of `region` (clipped to the bounds) in row-major order.
    pub fn iter_region(&self, region: IntRect) -> impl Iterator<Item = (GridPoint, T)> + '_ {
        let region = region.clip(&self.bounds);
        region
            .iter()
            .map(move |p| (p, self.cells[self.bounds.offset_of(p)]))
    }

    /// The whole buffer in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    fn read_into(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        let count = r.read_u32_le()? as usize;
        if count != region.area() {
            return Err(CodecError::Invalid {
                detail: format!("grid section of {count} cells for region {region}"),
            });
        }
        for p in region.iter() {
            let v = T::decode(r)?;
            if let Some(i) = self.index(p) {
                self.cells[i] = v;
            }
        }
        Ok(count)
    }
}

impl<T: CellValue> Storage for GridStorage<T> {
    fn bounds(&self) -> IntRect {
        self.bounds
    }

    /// Writes a `u32` cell count followed by the raw values in row-major
    /// order. Cells outside the bounds encode as the default.
    fn pack(&self, region: IntRect, out: &mut Vec<u8>) -> usize {
        let count = region.area();
        write_u32_le(out, count as u32);
        for p in region.iter() {
            self.get(p).unwrap_or(self.default).encode(out);
        }
        count
    }

    fn unpack(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        self.read_into(region, r)
    }

    fn adopt(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        self.read_into(region, r)
    }

    fn clear_region(&mut self, region: IntRect) {
        let default = self.default;
        self.fill_region(region, default);
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn resize(&mut self, bounds: IntRect, owned: IntRect) {
        let mut next = GridStorage::new(bounds, self.default);
        let keep = self.bounds.intersect(&bounds).and_then(|b| b.intersect(&owned));
        if let Some(overlap) = keep {
            for p in overlap.iter() {
                next.cells[bounds.offset_of(p)] = self.cells[self.bounds.offset_of(p)];
            }
        }
        *self = next;
    }
}
