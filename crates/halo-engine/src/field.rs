//! Fields that span the partition: local storage plus halo bookkeeping.
//!
//! A [`HaloField`] owns one process's slice of a distributed field. Its
//! storage covers the owned region grown by the AOI, in extended
//! coordinates. Reads resolve anywhere in that rectangle; writes must
//! land in the owned region. Object fields additionally queue entities
//! that leave the owned region for shipment at the next sync.

use crate::error::SyncError;
use crate::storage::FieldStorage;
use halo_core::codec::write_u32_le;
use halo_core::{
    AccessError, CodecError, Entity, EntityId, FieldId, GridPoint, IntRect, Pid, Reader, TickId,
};
use halo_space::{HaloLayout, Partition};
use halo_storage::{CellValue, GridStorage, Location, ObjectStorage};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// ── FieldHandle ────────────────────────────────────────────────────

/// Typed reference to a field registered on a [`Node`](crate::Node).
pub struct FieldHandle<S> {
    id: FieldId,
    _storage: PhantomData<fn() -> S>,
}

impl<S> FieldHandle<S> {
    pub(crate) fn new(id: FieldId) -> Self {
        Self {
            id,
            _storage: PhantomData,
        }
    }

    /// The field's id, its registration index.
    pub fn id(&self) -> FieldId {
        self.id
    }
}

impl<S> Clone for FieldHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for FieldHandle<S> {}

impl<S> PartialEq for FieldHandle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<S> Eq for FieldHandle<S> {}

impl<S> fmt::Debug for FieldHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldHandle").field(&self.id).finish()
    }
}

// ── Moved ──────────────────────────────────────────────────────────

/// Result of [`HaloField::move_entity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Moved {
    /// Still owned here.
    Local,
    /// Left the owned region; shipped to `to` at the next sync.
    Migrating {
        /// The new owner.
        to: Pid,
    },
}

// ── HaloField ──────────────────────────────────────────────────────

#[derive(Default)]
struct Outbox {
    count: u32,
    bytes: Vec<u8>,
    ids: Vec<EntityId>,
}

/// One process's view of a distributed field.
pub struct HaloField<S: FieldStorage> {
    id: FieldId,
    name: String,
    layout: Arc<HaloLayout>,
    partition: Arc<dyn Partition>,
    storage: S,
    outbox: BTreeMap<Pid, Outbox>,
    in_flight: BTreeMap<Pid, Vec<EntityId>>,
}

impl<S: FieldStorage> HaloField<S> {
    pub(crate) fn new(
        id: FieldId,
        name: String,
        layout: Arc<HaloLayout>,
        partition: Arc<dyn Partition>,
        storage: S,
    ) -> Self {
        Self {
            id,
            name,
            layout,
            partition,
            storage,
            outbox: BTreeMap::new(),
            in_flight: BTreeMap::new(),
        }
    }

    /// Registration id.
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Name given at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning process.
    pub fn pid(&self) -> Pid {
        self.layout.pid()
    }

    /// Current halo geometry.
    pub fn layout(&self) -> &HaloLayout {
        &self.layout
    }

    /// Read-only access to the underlying storage, in extended
    /// coordinates.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Entities queued for shipment at the next sync.
    pub fn pending_migrations(&self) -> usize {
        self.outbox.values().map(|o| o.ids.len()).sum()
    }

    /// Entities shipped but not yet acknowledged by their receiver.
    pub fn in_flight(&self) -> usize {
        self.in_flight.values().map(Vec::len).sum()
    }

    /// Resolve a domain point to its local extended coordinate.
    fn locate(&self, point: GridPoint) -> Result<GridPoint, AccessError> {
        let wrapped = self.layout.domain().wrap_point(point)?;
        match self.layout.localize(wrapped) {
            Some(local) => Ok(local),
            None => Err(AccessError::OutsideHalo {
                point: point.to_string(),
                owner: self.owner_of(wrapped)?,
            }),
        }
    }

    /// Resolve a domain point that must be owned here.
    fn locate_owned(&self, point: GridPoint) -> Result<GridPoint, AccessError> {
        let wrapped = self.layout.domain().wrap_point(point)?;
        if self.layout.is_owned(wrapped) {
            Ok(wrapped)
        } else {
            Err(AccessError::NotOwned {
                point: point.to_string(),
                pid: self.pid(),
            })
        }
    }

    fn owner_of(&self, wrapped: GridPoint) -> Result<Pid, AccessError> {
        self.partition
            .to_partition_id(wrapped)
            .map_err(|_| AccessError::OutOfDomain {
                point: wrapped.to_string(),
                domain: self.layout.domain().rect().to_string(),
            })
    }
}

// ── Grid fields ────────────────────────────────────────────────────

impl<T: CellValue> HaloField<GridStorage<T>> {
    /// Value at a domain point in the owned region or halo.
    ///
    /// Halo values are as of the last sync.
    pub fn get(&self, point: GridPoint) -> Result<T, AccessError> {
        let local = self.locate(point)?;
        Ok(self.storage.get(local).unwrap_or(self.storage.default_value()))
    }

    /// Write an owned cell, returning the previous value.
    pub fn set(&mut self, point: GridPoint, value: T) -> Result<T, AccessError> {
        let local = self.locate_owned(point)?;
        Ok(self.storage.set(local, value).unwrap_or(self.storage.default_value()))
    }

    /// Restore an owned cell to the field default, returning the previous
    /// value.
    pub fn reset(&mut self, point: GridPoint) -> Result<T, AccessError> {
        let local = self.locate_owned(point)?;
        Ok(self.storage.reset(local).unwrap_or(self.storage.default_value()))
    }

    /// Owned cells, row-major.
    pub fn iter_owned(&self) -> impl Iterator<Item = (GridPoint, T)> + '_ {
        self.storage.iter_region(self.layout.owned())
    }
}

// ── Object fields ──────────────────────────────────────────────────

impl<L: Location, E: Entity> HaloField<ObjectStorage<L, E>> {
    fn globalize(&self, loc: L) -> L {
        loc.wrap(self.layout.domain()).unwrap_or(loc)
    }

    fn globalized<'a>(&self, found: Vec<(L, &'a E)>) -> Vec<(L, &'a E)> {
        found.into_iter().map(|(loc, e)| (self.globalize(loc), e)).collect()
    }

    fn not_held(&self, id: EntityId) -> AccessError {
        if self.storage.replica(id).is_some() {
            AccessError::ReplicaWrite { id }
        } else {
            AccessError::UnknownEntity { id }
        }
    }

    /// Create an entity at an owned location.
    pub fn add(&mut self, entity: E, loc: L) -> Result<(), AccessError> {
        let id = entity.id();
        let wrapped = loc.wrap(self.layout.domain())?;
        if !self.layout.is_owned(wrapped.cell()) {
            return Err(AccessError::NotOwned {
                point: loc.to_string(),
                pid: self.pid(),
            });
        }
        if self.storage.contains(id) {
            return Err(AccessError::DuplicateEntity { id });
        }
        self.storage.insert(entity, wrapped).map(|_| ())
    }

    /// Delete an owned entity, returning its state.
    pub fn remove(&mut self, id: EntityId) -> Result<E, AccessError> {
        match self.storage.remove(id) {
            Some((_, entity)) => Ok(entity),
            None => Err(self.not_held(id)),
        }
    }

    /// Move an owned entity.
    ///
    /// A destination inside the owned region relocates in place. Any other
    /// destination in the domain removes the entity here and queues it for
    /// its new owner, neighbour or not. It stops being visible locally
    /// until the next sync delivers it.
    pub fn move_entity(&mut self, id: EntityId, to: L) -> Result<Moved, AccessError> {
        if !self.storage.contains(id) {
            return Err(self.not_held(id));
        }
        let wrapped = to.wrap(self.layout.domain())?;
        if self.layout.is_owned(wrapped.cell()) {
            self.storage.relocate(id, wrapped)?;
            return Ok(Moved::Local);
        }
        let owner = self.owner_of(wrapped.cell())?;
        let Some((_, entity)) = self.storage.remove(id) else {
            return Err(AccessError::UnknownEntity { id });
        };
        let out = self.outbox.entry(owner).or_default();
        wrapped.encode(&mut out.bytes);
        entity.encode(&mut out.bytes);
        out.count += 1;
        out.ids.push(id);
        Ok(Moved::Migrating { to: owner })
    }

    /// Entities (owned and replicas) in the cell at a domain point.
    pub fn objects_at(&self, point: GridPoint) -> Result<Vec<(L, &E)>, AccessError> {
        let local = self.locate(point)?;
        Ok(self.globalized(self.storage.objects_at(local)))
    }

    /// An entity held here, owned or replica.
    pub fn entity(&self, id: EntityId) -> Option<&E> {
        self.storage
            .get(id)
            .or_else(|| self.storage.replica(id).map(|(_, e)| e))
    }

    /// Mutable state of an owned entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut E, AccessError> {
        if !self.storage.contains(id) {
            return Err(self.not_held(id));
        }
        self.storage
            .get_mut(id)
            .ok_or(AccessError::UnknownEntity { id })
    }

    /// Location of an owned entity.
    pub fn location(&self, id: EntityId) -> Option<L> {
        self.storage.location(id)
    }

    /// Owned entities in storage order.
    pub fn owned_entities(&self) -> impl Iterator<Item = (L, &E)> + '_ {
        self.storage.iter_owned()
    }

    /// Halo replicas, with domain locations.
    pub fn halo_entities(&self) -> impl Iterator<Item = (L, &E)> + '_ {
        self.storage
            .iter_replicas()
            .map(move |(loc, e)| (self.globalize(loc), e))
    }

    /// Entities within `radius` of owned entity `id`, excluding it.
    ///
    /// Sees across partition boundaries up to the AOI.
    pub fn neighbors_within(&self, id: EntityId, radius: f64) -> Result<Vec<(L, &E)>, AccessError> {
        if !self.storage.contains(id) {
            return Err(self.not_held(id));
        }
        Ok(self.globalized(self.storage.neighbors_within(id, radius)?))
    }

    /// Up to `k` entities nearest owned entity `id`, excluding it.
    pub fn nearest_neighbors(&self, id: EntityId, k: usize) -> Result<Vec<(L, &E)>, AccessError> {
        if !self.storage.contains(id) {
            return Err(self.not_held(id));
        }
        Ok(self.globalized(self.storage.nearest_neighbors(id, k)?))
    }
}

// ── SyncField ──────────────────────────────────────────────────────

/// The type-erased face of a [`HaloField`] the synchroniser drives.
///
/// Implemented for every `HaloField<S>`; not meant to be implemented
/// elsewhere.
pub trait SyncField: Send + 'static {
    /// Registration id.
    fn id(&self) -> FieldId;

    /// Registration name.
    fn name(&self) -> &str;

    /// Append this field's section of the halo message for `peer`.
    fn pack_halo(&self, peer: Pid, out: &mut Vec<u8>) -> usize;

    /// Merge this field's section of `peer`'s halo message.
    fn unpack_halo(&mut self, peer: Pid, r: &mut Reader<'_>) -> Result<usize, CodecError>;

    /// Copy owned data into the halo wherever a torus wraps onto self.
    fn wrap_self(&mut self) -> Result<usize, CodecError>;

    /// Append the queued migrations for `peer` and mark them in flight.
    fn drain_outbox(&mut self, peer: Pid, out: &mut Vec<u8>) -> usize;

    /// Adopt this field's section of `from`'s migration message.
    ///
    /// `seen` records where each id arrived from this tick.
    fn apply_migrations(
        &mut self,
        from: Pid,
        tick: TickId,
        r: &mut Reader<'_>,
        seen: &mut HashMap<EntityId, Pid>,
    ) -> Result<usize, SyncError>;

    /// Forget in-flight entities sent to `peer`. Returns how many.
    fn release(&mut self, peer: Pid) -> usize;

    /// Forget every in-flight entity. Only valid once the whole group has
    /// passed the barrier of the round that shipped them.
    fn release_all(&mut self) -> usize;

    /// Add every pid with queued migrations to `out`.
    fn queued_peers(&self, out: &mut BTreeSet<Pid>);

    /// Entities queued for shipment.
    fn pending(&self) -> usize;

    /// Encode the data at a domain point for a remote query.
    fn answer(&self, point: GridPoint, out: &mut Vec<u8>) -> Result<(), AccessError>;

    /// Pack authoritative data inside a domain rectangle.
    fn pack_owned(&self, region: IntRect, out: &mut Vec<u8>) -> usize;

    /// Take ownership of data packed by [`pack_owned`](Self::pack_owned).
    fn adopt(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError>;

    /// Switch to a new layout, keeping owned data that stays owned.
    fn on_partition_change(&mut self, layout: Arc<HaloLayout>, partition: Arc<dyn Partition>);

    /// For downcasting to the concrete field.
    fn as_any(&self) -> &dyn Any;

    /// For downcasting to the concrete field.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: FieldStorage> SyncField for HaloField<S> {
    fn id(&self) -> FieldId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pack_halo(&self, peer: Pid, out: &mut Vec<u8>) -> usize {
        self.layout
            .links_to(peer)
            .map(|link| self.storage.pack(link.source, out))
            .sum()
    }

    fn unpack_halo(&mut self, peer: Pid, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        let layout = Arc::clone(&self.layout);
        let mut n = 0;
        for link in layout.links_from(peer) {
            n += self.storage.unpack(link.target, r)?;
        }
        Ok(n)
    }

    fn wrap_self(&mut self) -> Result<usize, CodecError> {
        let layout = Arc::clone(&self.layout);
        let mut buf = Vec::new();
        let mut n = 0;
        for link in layout.self_links() {
            buf.clear();
            self.storage.pack(link.source, &mut buf);
            let mut r = Reader::new(&buf);
            n += self.storage.unpack(link.target, &mut r)?;
            r.finish()?;
        }
        Ok(n)
    }

    fn drain_outbox(&mut self, peer: Pid, out: &mut Vec<u8>) -> usize {
        let Some(queued) = self.outbox.remove(&peer) else {
            write_u32_le(out, 0);
            return 0;
        };
        write_u32_le(out, queued.count);
        out.extend_from_slice(&queued.bytes);
        let n = queued.ids.len();
        self.in_flight.entry(peer).or_default().extend(queued.ids);
        n
    }

    fn apply_migrations(
        &mut self,
        from: Pid,
        tick: TickId,
        r: &mut Reader<'_>,
        seen: &mut HashMap<EntityId, Pid>,
    ) -> Result<usize, SyncError> {
        let pid = self.pid();
        let codec = |source| SyncError::Codec {
            pid,
            tick,
            peer: from,
            source,
        };
        let count = r.read_u32_le().map_err(codec)? as usize;
        for _ in 0..count {
            let migrant = S::decode_migrant(r).map_err(codec)?;
            let entity = S::migrant_id(&migrant);
            if self.storage.holds(entity) {
                return Err(SyncError::MigrationRace {
                    entity,
                    first: pid,
                    second: from,
                });
            }
            if let Some(&first) = seen.get(&entity) {
                return Err(SyncError::MigrationRace {
                    entity,
                    first,
                    second: from,
                });
            }
            let cell = S::migrant_cell(&migrant);
            if !self.layout.is_owned(cell) {
                return Err(SyncError::Access(AccessError::NotOwned {
                    point: cell.to_string(),
                    pid,
                }));
            }
            self.storage.store_migrant(migrant)?;
            seen.insert(entity, from);
        }
        Ok(count)
    }

    fn release(&mut self, peer: Pid) -> usize {
        self.in_flight.remove(&peer).map_or(0, |ids| ids.len())
    }

    fn release_all(&mut self) -> usize {
        let n = self.in_flight();
        self.in_flight.clear();
        n
    }

    fn queued_peers(&self, out: &mut BTreeSet<Pid>) {
        out.extend(self.outbox.keys().copied());
    }

    fn pending(&self) -> usize {
        self.pending_migrations()
    }

    fn answer(&self, point: GridPoint, out: &mut Vec<u8>) -> Result<(), AccessError> {
        let local = self.locate(point)?;
        self.storage.encode_at(local, out);
        Ok(())
    }

    fn pack_owned(&self, region: IntRect, out: &mut Vec<u8>) -> usize {
        self.storage.pack(region, out)
    }

    fn adopt(&mut self, region: IntRect, r: &mut Reader<'_>) -> Result<usize, CodecError> {
        self.storage.adopt(region, r)
    }

    fn on_partition_change(&mut self, layout: Arc<HaloLayout>, partition: Arc<dyn Partition>) {
        self.storage.resize(layout.halo(), layout.owned());
        self.layout = layout;
        self.partition = partition;
        self.in_flight.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
