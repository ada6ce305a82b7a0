//! Typed indices for the node and variable arenas

use serde::{Deserialize, Serialize};

/// A `u32` index naming one slot of a [`PrimaryMap`]
pub trait EntityRef: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    fn new(index: u32) -> Self;
    fn index(self) -> u32;
}

/// Declare an index newtype such as `NodeId` or `VariableId`
#[macro_export]
macro_rules! define_entity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $crate::entity::EntityRef for $name {
            fn new(index: u32) -> Self {
                Self(index)
            }

            fn index(self) -> u32 {
                self.0
            }
        }
    };
}

/// Arena that only grows. Slots are never freed, so a detached syntax node
/// keeps its id for as long as the function lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryMap<K: EntityRef, V> {
    items: Vec<V>,
    #[serde(skip)]
    key: std::marker::PhantomData<K>,
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            key: std::marker::PhantomData,
        }
    }

    /// Store a value in the next slot and return its id
    pub fn push(&mut self, value: V) -> K {
        let id = K::new(self.items.len() as u32);
        self.items.push(value);
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.items
            .iter()
            .enumerate()
            .map(|(slot, value)| (K::new(slot as u32), value))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.items.iter_mut()
    }
}

impl<K: EntityRef, V> std::ops::Index<K> for PrimaryMap<K, V> {
    type Output = V;

    fn index(&self, id: K) -> &V {
        &self.items[id.index() as usize]
    }
}

impl<K: EntityRef, V> std::ops::IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, id: K) -> &mut V {
        &mut self.items[id.index() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::define_entity!(SlotId);

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut names: PrimaryMap<SlotId, &str> = PrimaryMap::new();
        let x = names.push("x");
        let y = names.push("y");

        assert_eq!((x.index(), y.index()), (0, 1));
        assert_eq!(names[y], "y");
        assert_eq!(names.len(), 2);

        names[x] = "z";
        let listed: Vec<_> = names.iter().map(|(id, name)| (id, *name)).collect();
        assert_eq!(listed, vec![(x, "z"), (y, "y")]);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut names: PrimaryMap<SlotId, String> = PrimaryMap::new();
        names.push("x".to_string());

        assert_eq!(serde_json::to_string(&names).unwrap(), r#"["x"]"#);
    }
}
