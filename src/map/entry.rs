use std::fmt;
use std::mem;

use compare::{Compare, Natural};

use super::RbMap;
use crate::cursor::Cursor;
use crate::node::NodeId;

use Entry::*;

/// A view into a single key's slot in an [`RbMap`], which is either
/// [`Vacant`] or [`Occupied`].
///
/// Constructed by [`RbMap::entry`]; lets "look up, then insert or update" run
/// on a single tree descent.
pub enum Entry<'a, K, V, C = Natural<K>>
where
    C: Compare<K>,
{
    /// The key is not in the map.
    Vacant(VacantEntry<'a, K, V, C>),
    /// The key is already in the map.
    Occupied(OccupiedEntry<'a, K, V, C>),
}

impl<'a, K, V, C: Compare<K>> Entry<'a, K, V, C> {
    /// Inserts `default` if vacant; returns a mutable reference to the value
    /// either way.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_rbmap::RbMap;
    ///
    /// let mut map: RbMap<&str, u32> = RbMap::new();
    /// map.entry("poneyland").or_insert(3);
    /// assert_eq!(map[&"poneyland"], 3);
    ///
    /// *map.entry("poneyland").or_insert(10) *= 2;
    /// assert_eq!(map[&"poneyland"], 6);
    /// ```
    #[inline]
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Occupied(entry) => entry.into_mut(),
            Vacant(entry) => entry.insert(default),
        }
    }

    /// Like [`or_insert`](Self::or_insert), computing the default only when
    /// it is needed.
    #[inline]
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Occupied(entry) => entry.into_mut(),
            Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), giving the closure
    /// access to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_rbmap::RbMap;
    ///
    /// let mut map: RbMap<&str, usize> = RbMap::new();
    /// map.entry("poneyland").or_insert_with_key(|key| key.len());
    /// assert_eq!(map[&"poneyland"], 9);
    /// ```
    #[inline]
    pub fn or_insert_with_key(self, default: impl FnOnce(&K) -> V) -> &'a mut V {
        match self {
            Occupied(entry) => entry.into_mut(),
            Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }

    /// The entry's key.
    #[inline]
    pub fn key(&self) -> &K {
        match self {
            Occupied(entry) => entry.key(),
            Vacant(entry) => entry.key(),
        }
    }

    /// Mutates the value before any other resolution, if occupied.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_rbmap::RbMap;
    ///
    /// let mut map: RbMap<&str, u32> = RbMap::new();
    /// map.entry("poneyland").and_modify(|v| *v += 1).or_insert(42);
    /// assert_eq!(map[&"poneyland"], 42);
    ///
    /// map.entry("poneyland").and_modify(|v| *v += 1).or_insert(42);
    /// assert_eq!(map[&"poneyland"], 43);
    /// ```
    #[inline]
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Occupied(mut entry) => {
                f(entry.get_mut());
                Occupied(entry)
            }
            Vacant(entry) => Vacant(entry),
        }
    }
}

impl<'a, K, V: Default, C: Compare<K>> Entry<'a, K, V, C> {
    /// Inserts `V::default()` if vacant; returns a mutable reference to the
    /// value either way.
    #[inline]
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Compare<K>> fmt::Debug for Entry<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vacant(entry) => f.debug_tuple("Entry").field(entry).finish(),
            Occupied(entry) => f.debug_tuple("Entry").field(entry).finish(),
        }
    }
}

/// A view into a key with no entry yet.
pub struct VacantEntry<'a, K, V, C = Natural<K>>
where
    C: Compare<K>,
{
    pub(super) map: &'a mut RbMap<K, V, C>,
    pub(super) key: K,
}

impl<'a, K, V, C: Compare<K>> VacantEntry<'a, K, V, C> {
    /// The key that would be inserted.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes the key back without inserting.
    #[inline]
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the key with this value and returns a mutable reference to
    /// the stored value.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, key } = self;
        let (cursor, inserted) = map.insert(key, value);
        debug_assert!(inserted, "vacant entry's key appeared during insert");
        map.node_mut(cursor.node).value_mut()
    }
}

impl<K: fmt::Debug, V, C: Compare<K>> fmt::Debug for VacantEntry<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VacantEntry").field(self.key()).finish()
    }
}

/// A view into a key's existing entry.
pub struct OccupiedEntry<'a, K, V, C = Natural<K>>
where
    C: Compare<K>,
{
    pub(super) map: &'a mut RbMap<K, V, C>,
    pub(super) node: NodeId,
}

impl<'a, K, V, C: Compare<K>> OccupiedEntry<'a, K, V, C> {
    /// The entry's key.
    #[inline]
    pub fn key(&self) -> &K {
        self.map.node(self.node).key()
    }

    /// A cursor to this entry, usable after the entry view is gone.
    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.map.cursor(self.node)
    }

    /// A reference to the value.
    #[inline]
    pub fn get(&self) -> &V {
        self.map.node(self.node).value()
    }

    /// A mutable reference to the value, borrowing the view.
    ///
    /// For a reference outliving the view, see [`into_mut`](Self::into_mut).
    #[inline]
    pub fn get_mut(&mut self) -> &mut V {
        self.map.node_mut(self.node).value_mut()
    }

    /// Converts the view into a mutable reference to the value, bound to the
    /// map's borrow.
    #[inline]
    pub fn into_mut(self) -> &'a mut V {
        self.map.node_mut(self.node).value_mut()
    }

    /// Replaces the value, returning the previous one.
    #[inline]
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, returning its value.
    #[inline]
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the key and value.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_rbmap::{Entry, RbMap};
    ///
    /// let mut map: RbMap<&str, u32> = RbMap::new();
    /// map.insert("poneyland", 12);
    /// if let Entry::Occupied(entry) = map.entry("poneyland") {
    ///     assert_eq!(entry.remove_entry(), ("poneyland", 12));
    /// }
    /// assert!(!map.contains_key(&"poneyland"));
    /// ```
    #[inline]
    pub fn remove_entry(self) -> (K, V) {
        self.map.erase_at(self.node)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Compare<K>> fmt::Debug for OccupiedEntry<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OccupiedEntry")
            .field("key", self.key())
            .field("value", self.get())
            .finish()
    }
}
