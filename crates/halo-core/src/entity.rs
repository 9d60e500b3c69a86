//! The contract for objects that live in object fields and migrate.

use crate::codec::Wire;
use crate::id::EntityId;

/// An object with a stable global identity.
///
/// Entities are stored by identity, replicated into neighbouring halos as
/// read-only copies, and shipped whole (identity plus state) when they move
/// to another partition. `Wire` carries the state; the id must be part of
/// the encoding so the receiver reconstructs the same identity.
pub trait Entity: Clone + Send + Wire + 'static {
    /// Globally unique identity, preserved across migration.
    fn id(&self) -> EntityId;
}
