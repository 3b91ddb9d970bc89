//! # Component System
//!
//! Components are plain data attached to entities. Each distinct type is
//! assigned a [`ComponentTypeId`] the first time it is registered with a
//! world; the id is the bit the type occupies in entity signatures.

use std::fmt;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, Default)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: 'static {}

/// Per-world identifier of a registered component type (0-63).
///
/// Assigned monotonically in registration order. Not stable across
/// processes or across [`World::reset`](crate::World::reset).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeId(u8);

impl ComponentTypeId {
    /// Wraps a raw id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not fit a signature bit.
    #[inline]
    #[must_use]
    pub const fn new(id: u8) -> Self {
        assert!((id as usize) < super::entity::MAX_COMPONENTS, "component type id out of range");
        Self(id)
    }

    /// Returns the bit index of this type.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Human-readable entity name.
///
/// Attached by [`World::create_named_entity`](crate::World::create_named_entity),
/// looked up by [`World::find_by_name`](crate::World::find_by_name).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Component for Name {}

impl Name {
    /// Returns the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Free-form grouping label.
///
/// Many entities may share a tag; [`World::find_by_tag`](crate::World::find_by_tag)
/// returns all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Component for Tag {}

impl Tag {
    /// Returns the tag as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
