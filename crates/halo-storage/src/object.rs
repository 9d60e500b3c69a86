//! Identity-keyed entity storage with bucketed spatial lookup.

use crate::location::Location;
use crate::storage::Storage;
use halo_core::codec::{patch_u32_le, reserve_u32, Reader};
use halo_core::{AccessError, CodecError, Entity, EntityId, GridPoint, IntRect};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::cmp::Ordering;

#[derive(Clone, Debug)]
struct Entry<L, E> {
    loc: L,
    entity: E,
}

/// Reference from a bucket to an entry. Buckets keep slots sorted, which
/// fixes the order of every scan and pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    id: EntityId,
    replica: bool,
}

/// Entities stored by identity, indexed by location.
///
/// Authoritative entries and halo replicas live in separate id maps: on a
/// toroidal axis with a single partition an entity can sit in the owned
/// region and, wrapped, in the halo at the same time. Lookup, insertion
/// and removal by id are O(1).
///
/// Space is cut into square buckets of `bucket × bucket` cells. Spatial
/// queries visit only the buckets they overlap.
#[derive(Clone, Debug)]
pub struct ObjectStorage<L: Location, E: Entity> {
    bounds: IntRect,
    bucket: u32,
    cols: usize,
    rows: usize,
    owned: IndexMap<EntityId, Entry<L, E>>,
    replicas: IndexMap<EntityId, Entry<L, E>>,
    buckets: Vec<SmallVec<[Slot; 4]>>,
}

impl<L: Location, E: Entity> ObjectStorage<L, E> {
    /// Empty storage over `bounds` with buckets of `bucket` cells a side
    /// (at least 1).
    pub fn new(bounds: IntRect, bucket: u32) -> Self {
        let bucket = bucket.max(1);
        let cols = bounds.width().div_ceil(bucket) as usize;
        let rows = bounds.height().div_ceil(bucket) as usize;
        Self {
            bounds,
            bucket,
            cols,
            rows,
            owned: IndexMap::new(),
            replicas: IndexMap::new(),
            buckets: vec![SmallVec::new(); cols * rows],
        }
    }

    /// Bucket side length in cells.
    pub fn bucket(&self) -> u32 {
        self.bucket
    }

    // ── Bucket bookkeeping ──────────────────────────────────────

    fn bucket_coords(&self, cell: GridPoint) -> (i64, i64) {
        let b = i64::from(self.bucket);
        (
            (i64::from(cell.x) - i64::from(self.bounds.min.x)).div_euclid(b),
            (i64::from(cell.y) - i64::from(self.bounds.min.y)).div_euclid(b),
        )
    }

    fn bucket_index(&self, cell: GridPoint) -> Option<usize> {
        if !self.bounds.contains(cell) {
            return None;
        }
        let (bx, by) = self.bucket_coords(cell);
        Some(by as usize * self.cols + bx as usize)
    }

    fn link(&mut self, cell: GridPoint, slot: Slot) {
        if let Some(i) = self.bucket_index(cell) {
            let bucket = &mut self.buckets[i];
            if let Err(at) = bucket.binary_search(&slot) {
                bucket.insert(at, slot);
            }
        }
    }

    fn unlink(&mut self, cell: GridPoint, slot: Slot) {
        if let Some(i) = self.bucket_index(cell) {
            let bucket = &mut self.buckets[i];
            if let Ok(at) = bucket.binary_search(&slot) {
                bucket.remove(at);
            }
        }
    }

    fn resolve(&self, slot: Slot) -> Option<&Entry<L, E>> {
        if slot.replica {
            self.replicas.get(&slot.id)
        } else {
            self.owned.get(&slot.id)
        }
    }

    /// Slots of the buckets overlapping `rect`, buckets row-major.
    fn slots_in(&self, rect: IntRect) -> Vec<Slot> {
        let Some(clip) = rect.intersect(&self.bounds) else {
            return Vec::new();
        };
        let (bx0, by0) = self.bucket_coords(clip.min);
        let (bx1, by1) = self.bucket_coords(GridPoint::new(clip.max.x - 1, clip.max.y - 1));
        let mut out = Vec::new();
        for by in by0..=by1 {
            for bx in bx0..=bx1 {
                out.extend_from_slice(&self.buckets[by as usize * self.cols + bx as usize]);
            }
        }
        out
    }

    fn out_of_bounds(&self, loc: L) -> AccessError {
        AccessError::OutOfDomain {
            point: loc.to_string(),
            domain: self.bounds.to_string(),
        }
    }

    // ── Authoritative entries ───────────────────────────────────

    /// Store `entity` at `loc`, moving it if already present.
    ///
    /// Returns the previous location. Identity is preserved across the move.
    pub fn insert(&mut self, entity: E, loc: L) -> Result<Option<L>, AccessError> {
        if !self.bounds.contains(loc.cell()) {
            return Err(self.out_of_bounds(loc));
        }
        let id = entity.id();
        let slot = Slot { id, replica: false };
        let prev = self.owned.get(&id).map(|e| e.loc);
        if let Some(prev) = prev {
            self.unlink(prev.cell(), slot);
        }
        self.owned.insert(id, Entry { loc, entity });
        self.link(loc.cell(), slot);
        Ok(prev)
    }

    /// Move an existing entity to `to`, returning where it was.
    pub fn relocate(&mut self, id: EntityId, to: L) -> Result<L, AccessError> {
        if !self.bounds.contains(to.cell()) {
            return Err(self.out_of_bounds(to));
        }
        let from = match self.owned.get_mut(&id) {
            Some(entry) => std::mem::replace(&mut entry.loc, to),
            None => return Err(AccessError::UnknownEntity { id }),
        };
        let slot = Slot { id, replica: false };
        self.unlink(from.cell(), slot);
        self.link(to.cell(), slot);
        Ok(from)
    }

    /// Remove an entity, returning its location and state.
    pub fn remove(&mut self, id: EntityId) -> Option<(L, E)> {
        let entry = self.owned.swap_remove(&id)?;
        self.unlink(entry.loc.cell(), Slot { id, replica: false });
        Some((entry.loc, entry.entity))
    }

    /// Whether an authoritative entry with this id exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.owned.contains_key(&id)
    }

    /// Location of an authoritative entry.
    pub fn location(&self, id: EntityId) -> Option<L> {
        self.owned.get(&id).map(|e| e.loc)
    }

    /// State of an authoritative entry.
    pub fn get(&self, id: EntityId) -> Option<&E> {
        self.owned.get(&id).map(|e| &e.entity)
    }

    /// Mutable state of an authoritative entry. Use
    /// [`relocate`](Self::relocate) to change its location.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut E> {
        self.owned.get_mut(&id).map(|e| &mut e.entity)
    }

    /// Number of authoritative entries.
    pub fn owned_len(&self) -> usize {
        self.owned.len()
    }

    /// Authoritative entries in storage order.
    pub fn iter_owned(&self) -> impl Iterator<Item = (L, &E)> + '_ {
        self.owned.values().map(|e| (e.loc, &e.entity))
    }

    // ── Replicas ────────────────────────────────────────────────

    /// Store a read-only halo copy of `entity` at `loc`.
    pub fn insert_replica(&mut self, entity: E, loc: L) -> Result<(), AccessError> {
        if !self.bounds.contains(loc.cell()) {
            return Err(self.out_of_bounds(loc));
        }
        let id = entity.id();
        let slot = Slot { id, replica: true };
        if let Some(prev) = self.replicas.get(&id).map(|e| e.loc) {
            self.unlink(prev.cell(), slot);
        }
        self.replicas.insert(id, Entry { loc, entity });
        self.link(loc.cell(), slot);
        Ok(())
    }

    /// The halo copy of an entity, if one is stored.
    pub fn replica(&self, id: EntityId) -> Option<(L, &E)> {
        self.replicas.get(&id).map(|e| (e.loc, &e.entity))
    }

    /// Number of halo copies.
    pub fn replica_len(&self) -> usize {
        self.replicas.len()
    }

    /// Halo copies in storage order.
    pub fn iter_replicas(&self) -> impl Iterator<Item = (L, &E)> + '_ {
        self.replicas.values().map(|e| (e.loc, &e.entity))
    }

    // ── Spatial queries ─────────────────────────────────────────

    /// Everything (authoritative and replica) whose cell is `cell`.
    pub fn objects_at(&self, cell: GridPoint) -> Vec<(L, &E)> {
        self.objects_in(IntRect::new(cell, cell.shift(1, 1)))
    }

    /// Everything whose cell lies in `rect`, in bucket then id order.
    pub fn objects_in(&self, rect: IntRect) -> Vec<(L, &E)> {
        self.slots_in(rect)
            .into_iter()
            .filter_map(|s| self.resolve(s))
            .filter(|e| rect.contains(e.loc.cell()))
            .map(|e| (e.loc, &e.entity))
            .collect()
    }

    /// Everything within Euclidean `radius` of `center`, nearest first
    /// (ties by id).
    pub fn within(&self, center: L, radius: f64) -> Vec<(L, &E)> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let c = center.cell();
        let k = radius.ceil().min(f64::from(i32::MAX / 4)) as i32 + 1;
        let rect = IntRect::from_bounds(c.x - k, c.y - k, c.x + k + 1, c.y + k + 1);
        let mut found: Vec<(f64, L, &E)> = self
            .objects_in(rect)
            .into_iter()
            .map(|(loc, e)| (center.distance(loc), loc, e))
            .filter(|(d, _, _)| *d <= radius)
            .collect();
        sort_by_distance(&mut found);
        found.into_iter().map(|(_, loc, e)| (loc, e)).collect()
    }

    /// Other entities within `radius` of the authoritative entity `id`.
    pub fn neighbors_within(&self, id: EntityId, radius: f64) -> Result<Vec<(L, &E)>, AccessError> {
        let center = self.location(id).ok_or(AccessError::UnknownEntity { id })?;
        let mut out = self.within(center, radius);
        out.retain(|(_, e)| e.id() != id);
        Ok(out)
    }

    /// The `k` entries nearest to `center`, nearest first (ties by id),
    /// skipping `exclude`.
    ///
    /// Searches outward one ring of buckets at a time and stops as soon as
    /// no unvisited bucket can hold anything closer than the current
    /// `k`-th candidate.
    pub fn nearest(&self, center: L, k: usize, exclude: Option<EntityId>) -> Vec<(L, &E)> {
        if k == 0 || self.buckets.is_empty() {
            return Vec::new();
        }
        let inside = self.bounds.contains(center.cell());
        let (cx, cy) = self.bucket_coords(center.cell());
        let (cols, rows) = (self.cols as i64, self.rows as i64);
        let cx = cx.clamp(0, cols - 1);
        let cy = cy.clamp(0, rows - 1);
        let max_ring = cols.max(rows);

        let mut found: Vec<(f64, L, &E)> = Vec::new();
        for ring in 0..=max_ring {
            for by in (cy - ring)..=(cy + ring) {
                for bx in (cx - ring)..=(cx + ring) {
                    let on_ring = (bx - cx).abs() == ring || (by - cy).abs() == ring;
                    if !on_ring || bx < 0 || by < 0 || bx >= cols || by >= rows {
                        continue;
                    }
                    for &slot in &self.buckets[(by * cols + bx) as usize] {
                        if Some(slot.id) == exclude {
                            continue;
                        }
                        if let Some(e) = self.resolve(slot) {
                            found.push((center.distance(e.loc), e.loc, &e.entity));
                        }
                    }
                }
            }
            if inside && found.len() >= k {
                sort_by_distance(&mut found);
                if found[k - 1].0 <= (ring * i64::from(self.bucket)) as f64 {
                    break;
                }
            }
        }
        sort_by_distance(&mut found);
        found.truncate(k);
        found.into_iter().map(|(_, loc, e)| (loc, e)).collect()
    }

    /// The `k` entities nearest to the authoritative entity `id`.
    pub fn nearest_neighbors(&self, id: EntityId, k: usize) -> Result<Vec<(L, &E)>, AccessError> {
        let center = self.location(id).ok_or(AccessError::UnknownEntity { id })?;
        Ok(self.nearest(center, k, Some(id)))
    }

    fn read_section(
        &mut self,
        region: IntRect,
        r: &mut Reader<'_>,
        replica: bool,
    ) -> Result<usize, CodecError> {
        let count = r.read_u32_le()? as usize;
        for _ in 0..count {
            let loc = L::decode(r)?.shift(region.min.x, region.min.y);
            let entity = E::decode(r)?;
            if !region.contains(loc.cell()) {
                return Err(CodecError::Invalid {
                    detail: format!("entity {} at {loc} outside section {region}", entity.id()),
                });
            }
            let stored = if replica {
                self.insert_replica(entity, loc)
            } else {
                self.insert(entity, loc).map(|_| ())
            };
            stored.map_err(|e| CodecError::Invalid {
                detail: e.to_string(),
            })?;
        }
        Ok(count)
    }
}

fn sort_by_distance<L, E: Entity>(found: &mut [(f64, L, &E)]) {
    found.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.2.id().cmp(&b.2.id()))
    });
}

impl<L: Location, E: Entity> Storage for ObjectStorage<L, E> {
    fn bounds(&self) -> IntRect {
        self.bounds
    }

    /// Writes a `u32` count, then per entity its location relative to
    /// `region.min` followed by its wire encoding. Entities are ordered by
    /// bucket (row-major) then id.
    fn pack(&self, region: IntRect, out: &mut Vec<u8>) -> usize {
        let at = reserve_u32(out);
        let mut count = 0usize;
        for slot in self.slots_in(region).into_iter().filter(|s| !s.replica) {
            let Some(e) = self.resolve(slot) else { continue };
            if !region.contains(e.loc.cell()) {
                continue;
            }
            e.loc.shift(-region.min.x, -region.min.y).encode(out);
            e.entity.encode(out);
            count += 1;
        }
        patch_u32_le(out, at, count as u32);
        count
    }

    fn unpack(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        self.clear_region(region);
        self.read_section(region, r, true)
    }

    fn adopt(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        self.read_section(region, r, false)
    }

    fn clear_region(&mut self, region: IntRect) {
        let stale: Vec<(EntityId, L)> = self
            .slots_in(region)
            .into_iter()
            .filter(|s| s.replica)
            .filter_map(|s| self.replicas.get(&s.id).map(|e| (s.id, e.loc)))
            .filter(|(_, loc)| region.contains(loc.cell()))
            .collect();
        for (id, loc) in stale {
            self.replicas.swap_remove(&id);
            self.unlink(loc.cell(), Slot { id, replica: true });
        }
    }

    fn len(&self) -> usize {
        self.owned.len() + self.replicas.len()
    }

    fn resize(&mut self, bounds: IntRect, owned: IntRect) {
        let bucket = self.bucket;
        let old = std::mem::replace(self, Self::new(bounds, bucket));
        for (_, entry) in old.owned {
            if owned.contains(entry.loc.cell()) && bounds.contains(entry.loc.cell()) {
                // Inside the new bounds by the check above.
                let _ = self.insert(entry.entity, entry.loc);
            }
        }
    }
}
