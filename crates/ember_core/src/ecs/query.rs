//! # Component Queries
//!
//! [`ComponentSet`] is implemented for tuples of one to six component types.
//! It drives [`World::for_each`](crate::World::for_each) and the derivation of
//! system signatures from a list of types.

use super::component::Component;
use super::entity::{Entity, Signature};
use super::registry::ComponentRegistry;
use super::storage::ComponentStore;

/// A tuple of component types queried together.
///
/// # Example
///
/// ```rust,ignore
/// world.for_each::<(Position, Velocity)>(|entity, (position, velocity)| {
///     println!("{entity}: {position:?} {velocity:?}");
/// });
/// ```
pub trait ComponentSet: 'static {
    /// Resolved stores, one per tuple member.
    type Stores<'w>: Copy;

    /// Borrowed components, one per tuple member.
    type Item<'w>;

    /// Looks up every member's store.
    ///
    /// Returns `None` if any member is unregistered.
    fn stores(registry: &ComponentRegistry) -> Option<Self::Stores<'_>>;

    /// Combined signature of all members, or `None` if any is unregistered.
    fn signature(registry: &ComponentRegistry) -> Option<Signature>;

    /// Entities of the smallest member store; every match is among them.
    fn candidates<'w>(stores: Self::Stores<'w>) -> &'w [Entity];

    /// Fetches the entity's components if it holds every member.
    fn fetch<'w>(stores: Self::Stores<'w>, entity: Entity) -> Option<Self::Item<'w>>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Stores<'w> = ($(&'w ComponentStore<$name>,)+);
            type Item<'w> = ($(&'w $name,)+);

            fn stores(registry: &ComponentRegistry) -> Option<Self::Stores<'_>> {
                Some(($(registry.store::<$name>()?,)+))
            }

            fn signature(registry: &ComponentRegistry) -> Option<Signature> {
                let mut signature = Signature::EMPTY;
                $(signature.insert(registry.id_of::<$name>()?);)+
                Some(signature)
            }

            #[allow(non_snake_case)]
            fn candidates<'w>(stores: Self::Stores<'w>) -> &'w [Entity] {
                let ($($name,)+) = stores;
                let mut smallest: Option<&'w [Entity]> = None;
                $(
                    let entities = $name.entities();
                    if smallest.map_or(true, |current| entities.len() < current.len()) {
                        smallest = Some(entities);
                    }
                )+
                smallest.unwrap_or(&[])
            }

            #[allow(non_snake_case)]
            fn fetch<'w>(stores: Self::Stores<'w>, entity: Entity) -> Option<Self::Item<'w>> {
                let ($($name,)+) = stores;
                Some(($($name.get(entity)?,)+))
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;

    struct Left(u8);
    impl Component for Left {}

    struct Right(u8);
    impl Component for Right {}

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new(8);
        registry.register::<Left>().unwrap();
        registry.register::<Right>().unwrap();
        registry
    }

    #[test]
    fn test_signature_of_tuple() {
        let registry = registry();
        let signature = <(Left, Right)>::signature(&registry).unwrap();
        assert_eq!(signature.bits(), 0b11);
    }

    #[test]
    fn test_unregistered_member() {
        struct Unknown;
        impl Component for Unknown {}

        let registry = registry();
        assert!(<(Left, Unknown)>::signature(&registry).is_none());
        assert!(<(Unknown,)>::stores(&registry).is_none());
    }

    #[test]
    fn test_candidates_pick_smallest_store() {
        let mut registry = registry();
        for id in 0..4 {
            registry
                .store_mut::<Left>()
                .unwrap()
                .insert(Entity::from_raw(id), Left(0))
                .unwrap();
        }
        registry
            .store_mut::<Right>()
            .unwrap()
            .insert(Entity::from_raw(2), Right(7))
            .unwrap();

        let stores = <(Left, Right)>::stores(&registry).unwrap();
        assert_eq!(<(Left, Right)>::candidates(stores), &[Entity::from_raw(2)]);

        let (left, right) = <(Left, Right)>::fetch(stores, Entity::from_raw(2)).unwrap();
        assert_eq!((left.0, right.0), (0, 7));
        assert!(<(Left, Right)>::fetch(stores, Entity::from_raw(1)).is_none());
    }
}
