//! # System Scheduler
//!
//! Keeps systems sorted by ascending priority (ties in registration order)
//! and maintains each system's matched-entity set.
//!
//! ```text
//!  add / remove / destroy
//!          │
//!          ▼
//!   on_entity_signature_changed ──> for each system: (sig & req) == req ?
//!                                        insert / remove in matched set
//! ```
//!
//! The scheduler never runs systems itself: [`World::tick`] takes each
//! system out of its slot, runs it against the world and puts it back.
//! Registering a system while a tick is in progress is not supported.

use std::collections::BTreeSet;

use super::entity::{Entity, Signature};
use super::system::{System, SystemId};
use super::world::World;

/// One registered system and its bookkeeping.
struct SystemSlot {
    id: SystemId,
    name: String,
    priority: i32,
    signature: Signature,
    enabled: bool,
    matched: BTreeSet<Entity>,
    /// `None` while the system is running.
    system: Option<Box<dyn System>>,
}

/// Registry of systems and their matched-entity sets.
#[derive(Default)]
pub struct SystemScheduler {
    /// Sorted by priority, stable with respect to registration.
    slots: Vec<SystemSlot>,
    next_id: u32,
    initialized: bool,
}

/// Whether an entity with `signature` belongs to a system requiring `required`.
///
/// An empty requirement matches nothing.
#[inline]
#[must_use]
pub fn signature_matches(signature: Signature, required: Signature) -> bool {
    !required.is_empty() && signature.is_superset_of(required)
}

impl SystemScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether [`World::initialize`] has run.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Inserts a system and seeds its matched set from the world's live entities.
    pub(crate) fn register(
        &mut self,
        world: &World,
        mut system: Box<dyn System>,
        priority: i32,
        signature: Signature,
    ) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;

        let mut matched = BTreeSet::new();
        for entity in world.entities() {
            if signature_matches(world.signature(entity), signature) {
                system.on_entity_added(world, entity);
                matched.insert(entity);
            }
        }

        tracing::debug!(
            system = system.name(),
            %id,
            priority,
            matched = matched.len(),
            "system registered"
        );

        self.slots.push(SystemSlot {
            id,
            name: system.name().to_owned(),
            priority,
            signature,
            enabled: true,
            matched,
            system: Some(system),
        });
        self.sort();

        id
    }

    fn sort(&mut self) {
        // stable: equal priorities keep registration order
        self.slots.sort_by_key(|slot| (slot.priority, slot.id));
    }

    fn slot(&self, id: SystemId) -> Option<&SystemSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    fn slot_mut(&mut self, id: SystemId) -> Option<&mut SystemSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    /// Replaces a system's requirement and rebuilds its matched set.
    ///
    /// # Returns
    ///
    /// `false` if the id is unknown.
    pub(crate) fn set_signature(&mut self, world: &World, id: SystemId, signature: Signature) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };

        slot.signature = signature;
        for entity in world.entities() {
            Self::reconcile(slot, world, entity, world.signature(entity));
        }
        true
    }

    /// Changes a system's priority, re-sorting the run order.
    pub(crate) fn set_priority(&mut self, id: SystemId, priority: i32) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.priority = priority;
        self.sort();
        true
    }

    /// Enables or disables a system.
    pub(crate) fn set_enabled(&mut self, id: SystemId, enabled: bool) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.enabled = enabled;
        true
    }

    /// Whether a system is enabled (`None` if unknown).
    #[must_use]
    pub fn is_enabled(&self, id: SystemId) -> Option<bool> {
        self.slot(id).map(|slot| slot.enabled)
    }

    /// A system's required signature.
    #[must_use]
    pub fn signature(&self, id: SystemId) -> Option<Signature> {
        self.slot(id).map(|slot| slot.signature)
    }

    /// A system's name.
    #[must_use]
    pub fn name(&self, id: SystemId) -> Option<&str> {
        self.slot(id).map(|slot| slot.name.as_str())
    }

    /// A system's matched entities, ascending.
    #[must_use]
    pub fn matched(&self, id: SystemId) -> Option<&BTreeSet<Entity>> {
        self.slot(id).map(|slot| &slot.matched)
    }

    /// System ids in run order.
    #[must_use]
    pub fn ids(&self) -> Vec<SystemId> {
        self.slots.iter().map(|slot| slot.id).collect()
    }

    fn reconcile(slot: &mut SystemSlot, world: &World, entity: Entity, signature: Signature) {
        let matches = signature_matches(signature, slot.signature);
        let present = slot.matched.contains(&entity);

        if matches && !present {
            slot.matched.insert(entity);
            if let Some(system) = slot.system.as_mut() {
                system.on_entity_added(world, entity);
            }
        } else if !matches && present {
            slot.matched.remove(&entity);
            if let Some(system) = slot.system.as_mut() {
                system.on_entity_removed(world, entity);
            }
        }
    }

    /// Re-evaluates every system against the entity's new signature.
    pub fn on_entity_signature_changed(&mut self, world: &World, entity: Entity, signature: Signature) {
        for slot in &mut self.slots {
            Self::reconcile(slot, world, entity, signature);
        }
    }

    /// Removes the entity from every matched set.
    pub fn on_entity_destroyed(&mut self, world: &World, entity: Entity) {
        for slot in &mut self.slots {
            if slot.matched.remove(&entity) {
                if let Some(system) = slot.system.as_mut() {
                    system.on_entity_removed(world, entity);
                }
            }
        }
    }

    /// Takes a system out of its slot for the duration of a call.
    ///
    /// # Returns
    ///
    /// The system with a snapshot of its matched set, or `None` if the id is
    /// unknown, the system is disabled (when `only_enabled`), or it is
    /// already taken.
    pub(crate) fn take(
        &mut self,
        id: SystemId,
        only_enabled: bool,
    ) -> Option<(Box<dyn System>, Vec<Entity>)> {
        let slot = self.slot_mut(id)?;
        if only_enabled && !slot.enabled {
            return None;
        }
        let system = slot.system.take()?;
        Some((system, slot.matched.iter().copied().collect()))
    }

    /// Puts a system taken with [`take`](Self::take) back into its slot.
    pub(crate) fn restore(&mut self, id: SystemId, system: Box<dyn System>) {
        if let Some(slot) = self.slot_mut(id) {
            slot.system = Some(system);
        }
    }

    /// Drops every system.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::ComponentTypeId;

    #[test]
    fn test_empty_requirement_matches_nothing() {
        let anything = Signature::from_bits(u64::MAX);
        assert!(!signature_matches(anything, Signature::EMPTY));
    }

    #[test]
    fn test_superset_matches() {
        let a = ComponentTypeId::new(0);
        let b = ComponentTypeId::new(1);
        let required = Signature::EMPTY.with(a);
        assert!(signature_matches(Signature::EMPTY.with(a).with(b), required));
        assert!(!signature_matches(Signature::EMPTY.with(b), required));
    }
}
