//! # Entity Management
//!
//! Entities are dense 32-bit identifiers drawn from a fixed pool.
//!
//! - Ids are recycled FIFO: a destroyed id goes to the back of the queue
//! - Each live entity carries a [`Signature`] recording its component types
//! - There is no generation counter, so a stale id may address a newer entity

use std::collections::VecDeque;
use std::fmt;

use super::component::ComponentTypeId;

/// Default maximum number of simultaneously alive entities.
pub const MAX_ENTITIES: usize = 10_000;

/// Maximum number of distinct component types (width of a [`Signature`]).
pub const MAX_COMPONENTS: usize = 64;

/// Opaque dense entity identifier.
///
/// [`Entity::NULL`] (all bits set) denotes "no entity" and is what
/// [`EntityDirectory::create`] returns once the pool is exhausted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Sentinel meaning "no entity".
    pub const NULL: Self = Self(u32::MAX);

    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the id as an array index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is the null sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Entity(NULL)")
        } else {
            write!(f, "Entity({})", self.0)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fixed-width component bitmask.
///
/// Bit *i* set means "has component type *i*".
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u64);

impl Signature {
    /// The empty signature.
    pub const EMPTY: Self = Self(0);

    /// Builds a signature from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns a copy with the bit for `id` set.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | (1 << id.index()))
    }

    /// Returns a copy with the bit for `id` cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, id: ComponentTypeId) -> Self {
        Self(self.0 & !(1 << id.index()))
    }

    /// Sets the bit for `id`.
    #[inline]
    pub fn insert(&mut self, id: ComponentTypeId) {
        self.0 |= 1 << id.index();
    }

    /// Clears the bit for `id`.
    #[inline]
    pub fn remove(&mut self, id: ComponentTypeId) {
        self.0 &= !(1 << id.index());
    }

    /// Checks the bit for `id`.
    #[inline]
    #[must_use]
    pub const fn contains(self, id: ComponentTypeId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    /// Checks whether every bit of `required` is present in `self`.
    #[inline]
    #[must_use]
    pub const fn is_superset_of(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of component types in the signature.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#b})", self.0)
    }
}

impl std::ops::BitOr for Signature {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Issues, revokes and tags entity ids.
///
/// All per-entity arrays are sized once at construction; nothing on the
/// create/destroy path reallocates.
pub struct EntityDirectory {
    /// Signature per entity slot.
    signatures: Box<[Signature]>,
    /// Liveness flag per entity slot.
    alive: Box<[bool]>,
    /// Recycle queue, pre-seeded with every id in ascending order.
    free_ids: VecDeque<u32>,
    /// Number of live entities.
    live_count: usize,
}

impl EntityDirectory {
    /// Creates a directory able to hold `capacity` live entities.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or does not fit below the null sentinel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity < u32::MAX as usize,
            "Capacity must leave room for the null entity"
        );

        Self {
            signatures: vec![Signature::EMPTY; capacity].into_boxed_slice(),
            alive: vec![false; capacity].into_boxed_slice(),
            free_ids: Self::seed(capacity),
            live_count: 0,
        }
    }

    // capacity < u32::MAX is checked in `new`
    #[allow(clippy::cast_possible_truncation)]
    fn seed(capacity: usize) -> VecDeque<u32> {
        (0..capacity as u32).collect()
    }

    /// Returns the maximum number of live entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.alive.len()
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Issues a fresh entity id.
    ///
    /// # Returns
    ///
    /// The new id, or [`Entity::NULL`] if every id is in use.
    pub fn create(&mut self) -> Entity {
        let Some(id) = self.free_ids.pop_front() else {
            return Entity::NULL;
        };

        let index = id as usize;
        self.alive[index] = true;
        self.signatures[index] = Signature::EMPTY;
        self.live_count += 1;

        Entity(id)
    }

    /// Revokes an entity id and queues it for reuse.
    ///
    /// # Returns
    ///
    /// `false` if the id was out of range or not alive (nothing happens).
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let index = entity.index();
        self.signatures[index] = Signature::EMPTY;
        self.alive[index] = false;
        self.free_ids.push_back(entity.0);
        self.live_count -= 1;

        true
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Replaces the signature of a live entity.
    ///
    /// Setting the signature of a dead entity is a programmer error; it is
    /// fatal in debug builds and ignored in release builds.
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) {
        debug_assert!(
            self.is_alive(entity),
            "set_signature on dead entity {entity}"
        );
        if self.is_alive(entity) {
            self.signatures[entity.index()] = signature;
        }
    }

    /// Returns the signature of an entity ([`Signature::EMPTY`] if dead).
    #[inline]
    #[must_use]
    pub fn signature(&self, entity: Entity) -> Signature {
        if self.is_alive(entity) {
            self.signatures[entity.index()]
        } else {
            Signature::EMPTY
        }
    }

    /// Iterates over live entities in ascending id order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| Entity(index as u32))
    }

    /// Returns the directory to its post-construction state.
    pub fn reset(&mut self) {
        let capacity = self.capacity();
        self.signatures.fill(Signature::EMPTY);
        self.alive.fill(false);
        self.free_ids = Self::seed(capacity);
        self.live_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_issues_lowest_ids_first() {
        let mut directory = EntityDirectory::new(8);
        assert_eq!(directory.create(), Entity::from_raw(0));
        assert_eq!(directory.create(), Entity::from_raw(1));
        assert_eq!(directory.live_count(), 2);
    }

    #[test]
    fn test_full_returns_null() {
        let mut directory = EntityDirectory::new(2);
        assert!(!directory.create().is_null());
        assert!(!directory.create().is_null());
        assert!(directory.create().is_null());
        assert_eq!(directory.live_count(), 2);
    }

    #[test]
    fn test_destroy_recycles_id() {
        let mut directory = EntityDirectory::new(1);
        let a = directory.create();
        assert!(directory.destroy(a));
        assert!(!directory.is_alive(a));
        assert!(!directory.destroy(a));

        let b = directory.create();
        assert_eq!(a, b);
        assert!(directory.signature(b).is_empty());
    }

    #[test]
    fn test_destroy_out_of_range_is_noop() {
        let mut directory = EntityDirectory::new(4);
        assert!(!directory.destroy(Entity::from_raw(99)));
        assert!(!directory.destroy(Entity::NULL));
        assert_eq!(directory.live_count(), 0);
    }

    #[test]
    fn test_signature_bits() {
        let mut directory = EntityDirectory::new(4);
        let e = directory.create();
        let sig = Signature::EMPTY
            .with(ComponentTypeId::new(5))
            .with(ComponentTypeId::new(63));
        directory.set_signature(e, sig);

        assert!(directory.signature(e).contains(ComponentTypeId::new(5)));
        assert!(directory.signature(e).contains(ComponentTypeId::new(63)));
        assert!(!directory.signature(e).contains(ComponentTypeId::new(4)));

        directory.destroy(e);
        assert_eq!(directory.signature(e), Signature::EMPTY);
    }

    #[test]
    fn test_superset() {
        let a = ComponentTypeId::new(0);
        let b = ComponentTypeId::new(1);
        let both = Signature::EMPTY.with(a).with(b);
        assert!(both.is_superset_of(Signature::EMPTY.with(a)));
        assert!(!Signature::EMPTY.with(a).is_superset_of(both));
        assert_eq!(both.without(b), Signature::EMPTY.with(a));
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_reset() {
        let mut directory = EntityDirectory::new(3);
        let _ = directory.create();
        let _ = directory.create();
        directory.reset();
        assert_eq!(directory.live_count(), 0);
        assert_eq!(directory.create(), Entity::from_raw(0));
        assert_eq!(directory.iter_alive().count(), 1);
    }
}
