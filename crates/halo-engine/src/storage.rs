//! What the engine needs from a storage beyond packing.

use halo_core::codec::write_u32_le;
use halo_core::{AccessError, CodecError, Entity, EntityId, GridPoint, Reader};
use halo_storage::{CellValue, GridStorage, Location, ObjectStorage, Storage};
use std::convert::Infallible;

/// A [`Storage`] a [`HaloField`](crate::HaloField) can drive.
///
/// Adds remote query encoding and, for storages whose entries have
/// identity, whole-entry migration. Dense grids never migrate; their
/// `Migrant` is uninhabited.
pub trait FieldStorage: Storage {
    /// An entry shipped to its new owner.
    type Migrant;

    /// Encode what lives at extended point `p` for a remote query.
    fn encode_at(&self, p: GridPoint, out: &mut Vec<u8>);

    /// Decode one migrant.
    fn decode_migrant(r: &mut Reader<'_>) -> Result<Self::Migrant, CodecError>;

    /// Identity of a migrant.
    fn migrant_id(m: &Self::Migrant) -> EntityId;

    /// Cell a migrant lands in.
    fn migrant_cell(m: &Self::Migrant) -> GridPoint;

    /// Whether an authoritative entry with this id exists.
    fn holds(&self, id: EntityId) -> bool;

    /// Store a migrant as authoritative.
    fn store_migrant(&mut self, m: Self::Migrant) -> Result<(), AccessError>;
}

impl<T: CellValue> FieldStorage for GridStorage<T> {
    type Migrant = Infallible;

    fn encode_at(&self, p: GridPoint, out: &mut Vec<u8>) {
        self.get(p).unwrap_or(self.default_value()).encode(out);
    }

    fn decode_migrant(_r: &mut Reader<'_>) -> Result<Infallible, CodecError> {
        Err(CodecError::Invalid {
            detail: "grid fields carry no migrants".into(),
        })
    }

    fn migrant_id(m: &Infallible) -> EntityId {
        match *m {}
    }

    fn migrant_cell(m: &Infallible) -> GridPoint {
        match *m {}
    }

    fn holds(&self, _id: EntityId) -> bool {
        false
    }

    fn store_migrant(&mut self, m: Infallible) -> Result<(), AccessError> {
        match m {}
    }
}

impl<L: Location, E: Entity> FieldStorage for ObjectStorage<L, E> {
    type Migrant = (L, E);

    /// A `u32` count, then location and entity for everything in the cell.
    fn encode_at(&self, p: GridPoint, out: &mut Vec<u8>) {
        let found = self.objects_at(p);
        write_u32_le(out, found.len() as u32);
        for (loc, e) in found {
            loc.encode(out);
            e.encode(out);
        }
    }

    fn decode_migrant(r: &mut Reader<'_>) -> Result<(L, E), CodecError> {
        Ok((L::decode(r)?, E::decode(r)?))
    }

    fn migrant_id(m: &(L, E)) -> EntityId {
        m.1.id()
    }

    fn migrant_cell(m: &(L, E)) -> GridPoint {
        m.0.cell()
    }

    fn holds(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn store_migrant(&mut self, (loc, entity): (L, E)) -> Result<(), AccessError> {
        self.insert(entity, loc).map(|_| ())
    }
}
