//! # Component Storage
//!
//! Packed storage for a single component type.
//!
//! The storage keeps three views in sync:
//! - `dense`: component values, contiguous, no holes
//! - `entity_to_slot`: sparse entity -> slot map
//! - `slot_to_entity`: back-index used when a removal swaps the last value
//!   into the hole
//!
//! Insert, remove and lookup are O(1). Removal does not preserve insertion
//! order.

use std::any::Any;
use std::collections::HashMap;

use super::component::Component;
use super::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// Type-erased view of a [`ComponentStore`].
///
/// Lets the world iterate every store without knowing component types.
/// Typed access goes through [`as_any`](ErasedStore::as_any) downcasts.
pub trait ErasedStore: Any {
    /// Drops the entity's component, if any.
    fn on_entity_destroyed(&mut self, entity: Entity);

    /// Checks whether the entity has a component in this store.
    fn has(&self, entity: Entity) -> bool;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities in slot order.
    fn entities(&self) -> &[Entity];

    /// Drops every component.
    fn clear(&mut self);

    /// Name of the stored type.
    fn type_name(&self) -> &'static str;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Packed storage for component type `C`.
///
/// # Example
///
/// ```rust,ignore
/// let mut store: ComponentStore<Health> = ComponentStore::new(10_000);
/// store.insert(entity, Health(100))?;
/// assert_eq!(store.get(entity), Some(&Health(100)));
/// ```
pub struct ComponentStore<C: Component> {
    /// Component values, slots `[0, len)`.
    dense: Vec<C>,
    /// Entity -> slot.
    entity_to_slot: HashMap<Entity, usize>,
    /// Slot -> entity.
    slot_to_entity: Vec<Entity>,
    /// Maximum number of components.
    capacity: usize,
}

impl<C: Component> ComponentStore<C> {
    /// Creates an empty store able to hold `capacity` components.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            dense: Vec::new(),
            entity_to_slot: HashMap::new(),
            slot_to_entity: Vec::new(),
            capacity,
        }
    }

    /// Returns the capacity of this store.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if the store holds nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Appends a component for `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if the entity already has one
    /// - [`EcsError::StoreFull`] if the store is at capacity
    pub fn insert(&mut self, entity: Entity, component: C) -> EcsResult<()> {
        if self.entity_to_slot.contains_key(&entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                type_name: std::any::type_name::<C>(),
            });
        }
        if self.dense.len() >= self.capacity {
            return Err(EcsError::StoreFull {
                type_name: std::any::type_name::<C>(),
                capacity: self.capacity,
            });
        }

        let slot = self.dense.len();
        self.dense.push(component);
        self.slot_to_entity.push(entity);
        self.entity_to_slot.insert(entity, slot);

        Ok(())
    }

    /// Removes the entity's component by swapping the last value into its slot.
    ///
    /// # Returns
    ///
    /// The removed component, or `None` if the entity had none.
    pub fn remove(&mut self, entity: Entity) -> Option<C> {
        let slot = self.entity_to_slot.remove(&entity)?;
        let last = self.dense.len() - 1;

        if slot != last {
            let moved = self.slot_to_entity[last];
            self.entity_to_slot.insert(moved, slot);
        }

        self.slot_to_entity.swap_remove(slot);
        Some(self.dense.swap_remove(slot))
    }

    /// Gets the entity's component.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&C> {
        let slot = *self.entity_to_slot.get(&entity)?;
        Some(&self.dense[slot])
    }

    /// Gets the entity's component mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut C> {
        let slot = *self.entity_to_slot.get(&entity)?;
        Some(&mut self.dense[slot])
    }

    /// Checks whether the entity has a component here.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entity_to_slot.contains_key(&entity)
    }

    /// Returns the slot holding the entity's component.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.entity_to_slot.get(&entity).copied()
    }

    /// Returns the entity owning `slot`.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, slot: usize) -> Option<Entity> {
        self.slot_to_entity.get(slot).copied()
    }

    /// Entities in slot order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.slot_to_entity
    }

    /// Raw component data in slot order, ignoring the entity mapping.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.dense
    }

    /// Mutable raw component data in slot order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.dense
    }

    /// Iterates over `(entity, component)` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &C)> {
        self.slot_to_entity.iter().copied().zip(self.dense.iter())
    }

    /// Iterates mutably over `(entity, component)` in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut C)> {
        self.slot_to_entity.iter().copied().zip(self.dense.iter_mut())
    }
}

impl<C: Component> ErasedStore for ComponentStore<C> {
    fn on_entity_destroyed(&mut self, entity: Entity) {
        let _ = self.remove(entity);
    }

    fn has(&self, entity: Entity) -> bool {
        self.contains(entity)
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn entities(&self) -> &[Entity] {
        &self.slot_to_entity
    }

    fn clear(&mut self) {
        self.dense.clear();
        self.slot_to_entity.clear();
        self.entity_to_slot.clear();
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
