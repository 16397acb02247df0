use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ops;
use std::ptr::NonNull;

use compare::{natural, Compare, Natural};
use slab::Slab;
use smallvec::SmallVec;

pub use entry::{Entry, OccupiedEntry, VacantEntry};

use crate::cursor::{next_map_id, Cursor};
use crate::error::Error;
use crate::node::{Color, Node, NodeId};

mod entry;

/// Ancestors of the node under repair, root first. Built during one
/// root-to-target descent and consumed walking back up; nodes do not store
/// parent links, so this stack is the only way up.
type PathStack = SmallVec<[NodeId; 16]>;

/// Which child slot of a parent a new node is attached to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// An ordered map: a red-black tree over slab-allocated nodes, threaded onto
/// a sorted doubly-linked list bounded by two sentinels.
///
/// The tree gives O(log n) lookup, insertion, and erasure; the list gives
/// O(1) ordered stepping and makes the in-order successor of any node its
/// list neighbor. Entries are addressed by copyable [`Cursor`]s which remain
/// valid across mutations that don't erase the entry they point at.
///
/// Ordering comes from a [`Compare`] comparator, by default the key's natural
/// order. Keys that compare equal are the same entry: the map never holds two
/// equivalent keys.
///
/// # Examples
///
/// ```
/// use linked_rbmap::RbMap;
///
/// let mut map = RbMap::new();
/// map.insert("b", 2);
/// map.insert("a", 1);
/// map.insert("c", 3);
///
/// assert_eq!(
///     map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
///     [("a", 1), ("b", 2), ("c", 3)],
/// );
/// ```
pub struct RbMap<K, V, C = Natural<K>>
where
    C: Compare<K>,
{
    nodes: Slab<Node<K, V>>,
    root: Option<NodeId>,
    /// Sentinel before the first entry; `head.next` is the minimum or `tail`.
    head: NodeId,
    /// Sentinel after the last entry; `tail.prev` is the maximum or `head`.
    tail: NodeId,
    len: usize,
    cmp: C,
    id: u64,
}

impl<K: Ord, V> RbMap<K, V> {
    /// Creates an empty map ordered by the keys' natural order.
    #[inline]
    pub fn new() -> Self {
        Self::with_comparator(natural())
    }
}

impl<K, V, C: Compare<K>> RbMap<K, V, C> {
    /// Creates an empty map ordered by the given comparator.
    ///
    /// The comparator must be a strict weak ordering: keys for which it
    /// returns [`Ordering::Equal`] are treated as the same key.
    #[inline]
    pub fn with_comparator(cmp: C) -> Self {
        let mut nodes = Slab::with_capacity(2);
        let (head, tail) = Self::seed_sentinels(&mut nodes);
        RbMap {
            nodes,
            root: None,
            head,
            tail,
            len: 0,
            cmp,
            id: next_map_id(),
        }
    }

    /// The comparator the map orders its keys with.
    #[inline]
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    // region length
    /// The number of entries in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Drops every entry. Cursors to dropped entries become invalid; the end
    /// cursor stays the end cursor.
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
        let (head, tail) = Self::seed_sentinels(&mut self.nodes);
        self.head = head;
        self.tail = tail;
        self.root = None;
        self.len = 0;
    }
    // endregion

    // region retrieval
    /// A reference to the value for this key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.locate(key).map(|id| self.node(id).value())
    }

    /// A mutable reference to the value for this key.
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.locate(key)?;
        Some(self.node_mut(id).value_mut())
    }

    /// A reference to the value for this key, or [`Error::KeyNotFound`].
    #[inline]
    pub fn at(&self, key: &K) -> Result<&V, Error> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// A mutable reference to the value for this key, or
    /// [`Error::KeyNotFound`].
    #[inline]
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V, Error> {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Whether the map contains this key.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    /// How many entries hold this key: 0 or 1, since keys are unique.
    #[inline]
    pub fn count(&self, key: &K) -> usize {
        self.locate(key).is_some() as usize
    }

    /// A cursor to the entry with this key, or [`end`](Self::end) if absent.
    #[inline]
    pub fn find(&self, key: &K) -> Cursor {
        match self.locate(key) {
            Some(id) => self.cursor(id),
            None => self.end(),
        }
    }

    /// The smallest entry, or [`Error::Empty`].
    #[inline]
    pub fn first_key_value(&self) -> Result<(&K, &V), Error> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        Ok(self.node(self.node(self.head).next).key_value())
    }

    /// The largest entry, or [`Error::Empty`].
    #[inline]
    pub fn last_key_value(&self) -> Result<(&K, &V), Error> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        Ok(self.node(self.node(self.tail).prev).key_value())
    }
    // endregion

    // region cursors
    /// A cursor to the smallest entry, or [`end`](Self::end) if the map is
    /// empty.
    #[inline]
    pub fn begin(&self) -> Cursor {
        self.cursor(self.node(self.head).next)
    }

    /// The cursor one past the largest entry. It never dereferences, but it
    /// can be stepped back from and compared against.
    #[inline]
    pub fn end(&self) -> Cursor {
        self.cursor(self.tail)
    }

    /// The cursor to the next entry in ascending order, or the end cursor
    /// when stepping off the largest entry.
    ///
    /// Fails with [`Error::InvalidCursor`] for a foreign or stale cursor, or
    /// when stepping past [`end`](Self::end).
    #[inline]
    pub fn advance(&self, cursor: Cursor) -> Result<Cursor, Error> {
        if cursor.map != self.id || cursor.node == self.tail {
            return Err(Error::InvalidCursor);
        }
        let node = self
            .nodes
            .get(cursor.node.index())
            .filter(|node| !node.is_sentinel())
            .ok_or(Error::InvalidCursor)?;
        Ok(self.cursor(node.next))
    }

    /// The cursor to the previous entry in ascending order. Stepping back
    /// from the end cursor yields the largest entry.
    ///
    /// Fails with [`Error::InvalidCursor`] for a foreign or stale cursor, or
    /// when stepping before the smallest entry.
    #[inline]
    pub fn advance_back(&self, cursor: Cursor) -> Result<Cursor, Error> {
        if cursor.map != self.id || cursor.node == self.node(self.head).next {
            return Err(Error::InvalidCursor);
        }
        let node = if cursor.node == self.tail {
            self.node(self.tail)
        } else {
            self.nodes
                .get(cursor.node.index())
                .filter(|node| !node.is_sentinel())
                .ok_or(Error::InvalidCursor)?
        };
        Ok(self.cursor(node.prev))
    }

    /// The entry the cursor refers to.
    ///
    /// Fails with [`Error::InvalidCursor`] for the end cursor, a foreign
    /// cursor, or a cursor whose entry has been erased.
    #[inline]
    pub fn key_value(&self, cursor: Cursor) -> Result<(&K, &V), Error> {
        let id = self.cursor_node(cursor)?;
        Ok(self.node(id).key_value())
    }

    /// The entry the cursor refers to, value mutable.
    #[inline]
    pub fn key_value_mut(&mut self, cursor: Cursor) -> Result<(&K, &mut V), Error> {
        let id = self.cursor_node(cursor)?;
        Ok(self.node_mut(id).key_value_mut())
    }

    /// Resolves a cursor to a live, entry-bearing node of this map.
    #[inline]
    fn cursor_node(&self, cursor: Cursor) -> Result<NodeId, Error> {
        if cursor.map != self.id {
            return Err(Error::InvalidCursor);
        }
        match self.nodes.get(cursor.node.index()) {
            Some(node) if !node.is_sentinel() => Ok(cursor.node),
            _ => Err(Error::InvalidCursor),
        }
    }

    #[inline]
    fn cursor(&self, node: NodeId) -> Cursor {
        Cursor { map: self.id, node }
    }
    // endregion

    // region insertion
    /// Inserts a key-value pair.
    ///
    /// If an equivalent key is already present the map is left untouched and
    /// the existing entry's cursor is returned with `false`; otherwise the
    /// new entry's cursor is returned with `true`.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_rbmap::RbMap;
    ///
    /// let mut map = RbMap::new();
    /// let (first, inserted) = map.insert(5, "a");
    /// assert!(inserted);
    ///
    /// let (again, inserted) = map.insert(5, "z");
    /// assert!(!inserted);
    /// assert_eq!(again, first);
    /// assert_eq!(map.at(&5), Ok(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (Cursor, bool) {
        if self.root.is_none() {
            let (head, tail) = (self.head, self.tail);
            let id = NodeId(self.nodes.insert(Node::new(key, value, Color::Black, head, tail)));
            self.node_mut(head).next = id;
            self.node_mut(tail).prev = id;
            self.root = Some(id);
            self.len += 1;
            return (self.cursor(id), true);
        }

        let mut path = PathStack::new();
        if let Some(existing) = self.descend(&key, &mut path) {
            return (self.cursor(existing), false);
        }

        let parent = *path.last().expect("descent from a non-empty tree visits the root");
        let side = match self.cmp.compare(&key, self.node(parent).key()) {
            Ordering::Less => Side::Left,
            _ => Side::Right,
        };
        // A left child precedes its parent in sorted order, a right child
        // follows it, so the list position is known without another walk.
        let (prev, next) = match side {
            Side::Left => (self.node(parent).prev, parent),
            Side::Right => (parent, self.node(parent).next),
        };
        let id = NodeId(self.nodes.insert(Node::new(key, value, Color::Red, prev, next)));
        self.attach(id, parent, side);
        self.len += 1;

        if self.node(parent).color == Color::Red {
            self.insert_rebalance(id, &mut path);
        }
        (self.cursor(id), true)
    }

    /// The entry for this key, for in-place update or default insertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_rbmap::RbMap;
    ///
    /// let mut map: RbMap<&str, u32> = RbMap::new();
    /// *map.entry("seen").or_default() += 1;
    /// *map.entry("seen").or_default() += 1;
    /// assert_eq!(map.at(&"seen"), Ok(&2));
    /// ```
    #[inline]
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, C> {
        match self.locate(&key) {
            Some(node) => Entry::Occupied(OccupiedEntry { map: self, node }),
            None => Entry::Vacant(VacantEntry { map: self, key }),
        }
    }
    // endregion

    // region removal
    /// Removes the entry the cursor refers to and returns it.
    ///
    /// Fails with [`Error::InvalidCursor`] if the cursor is foreign, is the
    /// end cursor, or refers to an already-erased entry; the map is unchanged
    /// on failure. All other cursors stay valid.
    #[inline]
    pub fn erase(&mut self, cursor: Cursor) -> Result<(K, V), Error> {
        let target = self.cursor_node(cursor)?;
        Ok(self.erase_at(target))
    }

    /// Removes the entry with an equivalent key and returns it.
    #[inline]
    pub fn remove_key_value(&mut self, key: &K) -> Option<(K, V)> {
        let id = self.locate(key)?;
        Some(self.erase_at(id))
    }

    /// Removes the entry with an equivalent key and returns its value.
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_key_value(key).map(|(_, value)| value)
    }

    /// Removes and returns the smallest entry.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        if self.len == 0 {
            return None;
        }
        let first = self.node(self.head).next;
        Some(self.erase_at(first))
    }

    /// Removes and returns the largest entry.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        if self.len == 0 {
            return None;
        }
        let last = self.node(self.tail).prev;
        Some(self.erase_at(last))
    }
    // endregion

    // region iteration
    /// Iterates the entries in ascending key order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            front: self.node(self.head).next,
            back: self.node(self.tail).prev,
            remaining: self.len,
        }
    }

    /// Iterates the entries in ascending key order, values mutable.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let front = self.node(self.head).next;
        let back = self.node(self.tail).prev;
        let remaining = self.len;
        IterMut {
            nodes: NonNull::from(&mut self.nodes),
            front,
            back,
            remaining,
            _p: PhantomData,
        }
    }

    /// Iterates the keys in ascending order.
    #[inline]
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates the values in ascending key order.
    #[inline]
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Iterates the values in ascending key order, mutably.
    #[inline]
    pub fn values_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, value)| value)
    }
    // endregion

    // region diagnostics
    /// Checks every structural invariant, *panic*ing on the first violation:
    /// root blackness, no red-red edges, equal black-height on all paths, BST
    /// ordering, list/tree agreement, and the length bookkeeping.
    ///
    /// Ideally this is a no-op; tests run it after every mutation.
    pub fn validate(&self) {
        match self.root {
            Some(root) => {
                assert_eq!(self.node(root).color, Color::Black, "root must be black");
                self.validate_subtree(root, None, None);
            }
            None => assert_eq!(self.len, 0, "empty tree with nonzero len"),
        }

        let mut in_order = Vec::with_capacity(self.len);
        self.push_in_order(self.root, &mut in_order);
        assert_eq!(in_order.len(), self.len, "len out of sync with tree node count");
        let mut cur = self.node(self.head).next;
        for &id in &in_order {
            assert_eq!(cur, id, "traversal list diverges from tree in-order");
            cur = self.node(cur).next;
        }
        assert_eq!(cur, self.tail, "traversal list extends past the last tree node");
    }

    /// The tree's height in nodes; 0 for an empty map. Bounded by
    /// 2·log2(len + 1) while the invariants hold.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root)
    }

    /// Checks ordering, coloring, and black-height below `id`, returning the
    /// subtree's black-height. Recursion depth is the tree height.
    fn validate_subtree(&self, id: NodeId, lo: Option<&K>, hi: Option<&K>) -> usize {
        let node = self.node(id);
        let key = node.key();
        if let Some(lo) = lo {
            assert_eq!(self.cmp.compare(lo, key), Ordering::Less, "BST order violated");
        }
        if let Some(hi) = hi {
            assert_eq!(self.cmp.compare(key, hi), Ordering::Less, "BST order violated");
        }
        if node.color == Color::Red {
            for child in [node.left, node.right].into_iter().flatten() {
                assert_eq!(self.node(child).color, Color::Black, "red node has a red child");
            }
        }
        let left_height = node.left.map_or(0, |left| self.validate_subtree(left, lo, Some(key)));
        let right_height = node.right.map_or(0, |right| self.validate_subtree(right, Some(key), hi));
        assert_eq!(left_height, right_height, "black-height differs between subtrees");
        left_height + (node.color == Color::Black) as usize
    }

    fn push_in_order(&self, node: Option<NodeId>, out: &mut Vec<NodeId>) {
        if let Some(id) = node {
            self.push_in_order(self.node(id).left, out);
            out.push(id);
            self.push_in_order(self.node(id).right, out);
        }
    }

    fn subtree_height(&self, node: Option<NodeId>) -> usize {
        match node {
            None => 0,
            Some(id) => {
                let left = self.subtree_height(self.node(id).left);
                let right = self.subtree_height(self.node(id).right);
                1 + left.max(right)
            }
        }
    }
    // endregion

    // region node storage
    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    /// Allocates the two boundary sentinels and links them to each other;
    /// their outward links self-loop and are never followed.
    fn seed_sentinels(nodes: &mut Slab<Node<K, V>>) -> (NodeId, NodeId) {
        let head = NodeId(nodes.insert(Node::sentinel()));
        let tail = NodeId(nodes.insert(Node::sentinel()));
        nodes[head.index()].prev = head;
        nodes[head.index()].next = tail;
        nodes[tail.index()].prev = head;
        nodes[tail.index()].next = tail;
        (head, tail)
    }

    /// Frees a node's slot and hands back its entry. The node must already be
    /// detached from both the tree and the traversal list.
    #[inline]
    fn release(&mut self, id: NodeId) -> (K, V) {
        self.nodes.remove(id.index()).into_entry()
    }
    // endregion

    // region lookup engine
    /// Binary-search descent to the node with an equivalent key.
    fn locate(&self, key: &K) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            match self.cmp.compare(key, self.node(id).key()) {
                Ordering::Less => cur = self.node(id).left,
                Ordering::Greater => cur = self.node(id).right,
                Ordering::Equal => return Some(id),
            }
        }
        None
    }

    /// Like [`locate`](Self::locate), but records every visited ancestor on
    /// `path`. On a miss the path ends at the would-be attachment parent.
    fn descend(&self, key: &K, path: &mut PathStack) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            match self.cmp.compare(key, self.node(id).key()) {
                Ordering::Less => {
                    path.push(id);
                    cur = self.node(id).left;
                }
                Ordering::Greater => {
                    path.push(id);
                    cur = self.node(id).right;
                }
                Ordering::Equal => return Some(id),
            }
        }
        None
    }
    // endregion

    // region structural editing
    /// Hooks a freshly allocated node under `parent`, updating the tree link
    /// and the traversal-list neighbors together so the two structures cannot
    /// drift apart. The node's own list links were set at construction.
    fn attach(&mut self, id: NodeId, parent: NodeId, side: Side) {
        match side {
            Side::Left => {
                debug_assert!(self.node(parent).left.is_none(), "attach over an existing child");
                self.node_mut(parent).left = Some(id);
            }
            Side::Right => {
                debug_assert!(self.node(parent).right.is_none(), "attach over an existing child");
                self.node_mut(parent).right = Some(id);
            }
        }
        let prev = self.node(id).prev;
        let next = self.node(id).next;
        self.node_mut(prev).next = id;
        self.node_mut(next).prev = id;
    }

    /// Bypasses a node in the traversal list. Its own links are left behind
    /// and must not be followed again.
    fn unlink(&mut self, id: NodeId) {
        let prev = self.node(id).prev;
        let next = self.node(id).next;
        self.node_mut(prev).next = next;
        self.node_mut(next).prev = prev;
    }

    /// Replaces `old` with `new` in the child slot of the node atop `path`,
    /// or at the root if the path is empty.
    fn relink(&mut self, old: NodeId, new: NodeId, path: &PathStack) {
        match path.last() {
            None => self.root = Some(new),
            Some(&up) => {
                if self.node(up).left == Some(old) {
                    self.node_mut(up).left = Some(new);
                } else {
                    self.node_mut(up).right = Some(new);
                }
            }
        }
    }

    /// Right rotation about `id`; returns the new subtree root.
    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let pivot = self.node(id).left.expect("right rotation requires a left child");
        let inner = self.node(pivot).right;
        self.node_mut(id).left = inner;
        self.node_mut(pivot).right = Some(id);
        pivot
    }

    /// Left rotation about `id`; returns the new subtree root.
    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let pivot = self.node(id).right.expect("left rotation requires a right child");
        let inner = self.node(pivot).left;
        self.node_mut(id).right = inner;
        self.node_mut(pivot).left = Some(id);
        pivot
    }

    /// Double rotation for the left-right shape.
    fn rotate_left_right(&mut self, id: NodeId) -> NodeId {
        let left = self.node(id).left.expect("double rotation requires a left child");
        let new_left = self.rotate_left(left);
        self.node_mut(id).left = Some(new_left);
        self.rotate_right(id)
    }

    /// Double rotation for the right-left shape.
    fn rotate_right_left(&mut self, id: NodeId) -> NodeId {
        let right = self.node(id).right.expect("double rotation requires a right child");
        let new_right = self.rotate_right(right);
        self.node_mut(id).right = Some(new_right);
        self.rotate_left(id)
    }
    // endregion

    // region insert rebalancing
    /// Restores the red-black invariants after hooking in the red node `t`
    /// whose parent (atop `path`) is also red.
    fn insert_rebalance(&mut self, mut t: NodeId, path: &mut PathStack) {
        let Some(mut parent) = path.pop() else { return };
        while self.node(parent).color == Color::Red {
            if Some(parent) == self.root {
                // A red root is the only remaining violation.
                self.node_mut(parent).color = Color::Black;
                return;
            }
            let grand = path.pop().expect("red non-root node must have a grandparent");
            let parent_on_left = self.node(grand).left == Some(parent);
            let uncle = if parent_on_left {
                self.node(grand).right
            } else {
                self.node(grand).left
            };
            let uncle_red = uncle.map_or(false, |u| self.node(u).color == Color::Red);

            if !uncle_red {
                // Black or absent uncle: one of the four rotation shapes
                // repairs the tree locally and the walk stops here.
                let top = if parent_on_left {
                    if self.node(parent).left == Some(t) {
                        self.node_mut(parent).color = Color::Black;
                        self.node_mut(grand).color = Color::Red;
                        self.rotate_right(grand)
                    } else {
                        self.node_mut(grand).color = Color::Red;
                        self.node_mut(t).color = Color::Black;
                        self.rotate_left_right(grand)
                    }
                } else if self.node(parent).right == Some(t) {
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grand).color = Color::Red;
                    self.rotate_left(grand)
                } else {
                    self.node_mut(grand).color = Color::Red;
                    self.node_mut(t).color = Color::Black;
                    self.rotate_right_left(grand)
                };
                self.relink(grand, top, path);
                return;
            }

            // Red uncle: push the red violation up one level with a color
            // flip and keep walking.
            let uncle = uncle.expect("red uncle exists");
            self.node_mut(grand).color = Color::Red;
            self.node_mut(parent).color = Color::Black;
            self.node_mut(uncle).color = Color::Black;
            if Some(grand) == self.root {
                self.node_mut(grand).color = Color::Black;
                return;
            }
            t = grand;
            let Some(up) = path.pop() else { return };
            parent = up;
        }
    }
    // endregion

    // region erase engine
    /// Detaches `target` from the tree and the traversal list, rebalances,
    /// frees its slot, and returns its entry.
    pub(crate) fn erase_at(&mut self, target: NodeId) -> (K, V) {
        let mut path = PathStack::new();
        let found = {
            let key = self.node(target).key();
            self.descend(key, &mut path)
        };
        debug_assert_eq!(found, Some(target), "node to erase must be reachable by its own key");

        let mut t = target;
        // A node with two children is replaced by its structural successor,
        // which is `target.next` by the list invariant. The successor takes
        // over the target's slot (and color), so the node physically detached
        // from the tree is the successor's old position.
        let mut spliced = false;
        let mut slot_parent = None;
        if self.node(t).left.is_some() && self.node(t).right.is_some() {
            slot_parent = path.last().copied();
            // The successor stands in for the target on the path, because it
            // will occupy the target's slot by the time the path is consumed.
            path.push(self.node(t).next);
            let mut down = self.node(t).right.expect("two-child node lost its right child");
            while let Some(left) = self.node(down).left {
                path.push(down);
                down = left;
            }
            debug_assert_eq!(down, self.node(t).next, "successor must be the list neighbor");
            t = down;
            spliced = true;
        }

        self.len -= 1;

        // Root with at most one child: promote the child and stop.
        if Some(t) == self.root {
            let child = self.node(t).left.or(self.node(t).right);
            self.root = child;
            if let Some(child) = child {
                self.node_mut(child).color = Color::Black;
            }
            self.unlink(t);
            return self.release(t);
        }

        let parent = path.pop().expect("non-root node must have ancestors on the path");
        let removed = t;
        let child = self.node(removed).left.or(self.node(removed).right);
        if self.node(parent).left == Some(removed) {
            self.node_mut(parent).left = child;
        } else {
            self.node_mut(parent).right = child;
        }
        let removed_was_red = self.node(removed).color == Color::Red;

        let entry;
        if spliced {
            // `removed` is the successor. The node leaving the map is the
            // original target; splice the successor into its slot, updating
            // tree links, color, and list links together.
            let dead = self.node(removed).prev;
            debug_assert_eq!(dead, target, "successor's list predecessor must be the target");
            match slot_parent {
                None => self.root = Some(removed),
                Some(up) => {
                    if self.node(up).left == Some(dead) {
                        self.node_mut(up).left = Some(removed);
                    } else {
                        self.node_mut(up).right = Some(removed);
                    }
                }
            }
            if self.node(dead).right != Some(removed) {
                // When the successor was the target's direct right child, its
                // right link was already fixed by the detach above.
                let right = self.node(dead).right;
                self.node_mut(removed).right = right;
            }
            let left = self.node(dead).left;
            self.node_mut(removed).left = left;
            let color = self.node(dead).color;
            self.node_mut(removed).color = color;
            let before = self.node(dead).prev;
            self.node_mut(removed).prev = before;
            self.node_mut(before).next = removed;
            entry = self.release(dead);
        } else {
            self.unlink(removed);
            entry = self.release(removed);
        }

        if removed_was_red {
            return entry;
        }
        if let Some(child) = child {
            // A black node with one child: the child is necessarily red, so
            // recoloring it black restores the black-height.
            self.node_mut(child).color = Color::Black;
            return entry;
        }
        // A black node with no children leaves a double-black deficiency at
        // the vacated position.
        path.push(parent);
        self.erase_rebalance(None, &mut path);
        entry
    }

    /// Repairs the double-black deficiency at the vacated child slot `t` of
    /// the node atop `path`, walking upward as far as the deficiency
    /// propagates.
    fn erase_rebalance(&mut self, mut t: Option<NodeId>, path: &mut PathStack) {
        let Some(mut parent) = path.pop() else { return };
        loop {
            let on_left = self.node(parent).left == t;
            let sibling = if on_left {
                self.node(parent).right
            } else {
                self.node(parent).left
            }
            .expect("double-black node must have a sibling");

            if self.node(sibling).color == Color::Red {
                // Red sibling: rotate it above the parent. The deficiency is
                // unchanged but the new sibling is black.
                self.node_mut(sibling).color = Color::Black;
                self.node_mut(parent).color = Color::Red;
                let top = if on_left {
                    self.rotate_left(parent)
                } else {
                    self.rotate_right(parent)
                };
                self.relink(parent, top, path);
                path.push(top);
                continue;
            }

            let sib_left = self.node(sibling).left;
            let sib_right = self.node(sibling).right;
            let sib_left_black = sib_left.map_or(true, |n| self.node(n).color == Color::Black);
            let sib_right_black = sib_right.map_or(true, |n| self.node(n).color == Color::Black);

            if sib_left_black && sib_right_black {
                // All-black sibling: recolor it red, trading the deficiency
                // for one at the parent.
                self.node_mut(sibling).color = Color::Red;
                if self.node(parent).color == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    return;
                }
                if Some(parent) == self.root {
                    return;
                }
                t = Some(parent);
                let Some(up) = path.pop() else { return };
                parent = up;
                continue;
            }

            // Black sibling with a red child: one or two rotations restore
            // the black-height, the new subtree root taking the parent's
            // color.
            let parent_color = self.node(parent).color;
            let top = if on_left {
                // Sibling is the right child.
                if !sib_left_black {
                    let near = sib_left.expect("red inner child exists");
                    self.node_mut(near).color = parent_color;
                    self.node_mut(parent).color = Color::Black;
                    self.rotate_right_left(parent)
                } else {
                    let far = sib_right.expect("red outer child exists");
                    self.node_mut(sibling).color = parent_color;
                    self.node_mut(far).color = Color::Black;
                    self.node_mut(parent).color = Color::Black;
                    self.rotate_left(parent)
                }
            } else {
                // Sibling is the left child; the shapes mirror.
                if !sib_right_black {
                    let near = sib_right.expect("red inner child exists");
                    self.node_mut(near).color = parent_color;
                    self.node_mut(parent).color = Color::Black;
                    self.rotate_left_right(parent)
                } else {
                    let far = sib_left.expect("red outer child exists");
                    self.node_mut(sibling).color = parent_color;
                    self.node_mut(far).color = Color::Black;
                    self.node_mut(parent).color = Color::Black;
                    self.rotate_right(parent)
                }
            };
            self.relink(parent, top, path);
            return;
        }
    }
    // endregion
}

// region std trait impls
impl<K: Ord, V> Default for RbMap<K, V> {
    #[inline]
    fn default() -> Self {
        RbMap::new()
    }
}

impl<K: Clone, V: Clone, C: Compare<K> + Clone> Clone for RbMap<K, V, C> {
    /// Deep copy. Cloning the slab reproduces the node graph slot for slot,
    /// so every tree and list link carries over unchanged; the copy gets a
    /// fresh identity, so cursors are never transferable between the two
    /// maps, and mutating one map never affects the other.
    fn clone(&self) -> Self {
        RbMap {
            nodes: self.nodes.clone(),
            root: self.root,
            head: self.head,
            tail: self.tail,
            len: self.len,
            cmp: self.cmp.clone(),
            id: next_map_id(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Compare<K>> fmt::Debug for RbMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C: Compare<K>> PartialEq for RbMap<K, V, C> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C: Compare<K>> Eq for RbMap<K, V, C> {}

impl<'k, K, V, C: Compare<K>> ops::Index<&'k K> for RbMap<K, V, C> {
    type Output = V;

    #[inline]
    fn index(&self, key: &K) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, C: Compare<K>> Extend<(K, V)> for RbMap<K, V, C> {
    /// Inserts every pair; keys already present keep their existing value,
    /// matching [`insert`](RbMap::insert).
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RbMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RbMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C: Compare<K>> IntoIterator for &'a RbMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C: Compare<K>> IntoIterator for &'a mut RbMap<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, C: Compare<K>> IntoIterator for RbMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, C>;

    #[inline]
    fn into_iter(mut self) -> Self::IntoIter {
        // Consumption walks the list only; drop the tree's entry point.
        self.root = None;
        IntoIter { map: self }
    }
}
// endregion

// region iterators
/// Borrowing iterator over a map's entries in ascending key order.
pub struct Iter<'a, K, V> {
    nodes: &'a Slab<Node<K, V>>,
    /// Next entry to yield from the front; a sentinel iff `remaining == 0`.
    front: NodeId,
    /// Next entry to yield from the back; a sentinel iff `remaining == 0`.
    back: NodeId,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.front.index()];
        self.front = node.next;
        self.remaining -= 1;
        Some(node.key_value())
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.back.index()];
        self.back = node.prev;
        self.remaining -= 1;
        Some(node.key_value())
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

/// Borrowing iterator over a map's entries in ascending key order, values
/// mutable.
pub struct IterMut<'a, K, V> {
    nodes: NonNull<Slab<Node<K, V>>>,
    front: NodeId,
    back: NodeId,
    remaining: usize,
    _p: PhantomData<(&'a K, &'a mut V)>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    /// Every yielded pair lives in a distinct node, so handing out `'a`
    /// references one node at a time never aliases.
    #[inline]
    fn step(&mut self, backwards: bool) -> Option<(&'a K, &'a mut V)> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = unsafe { self.nodes.as_mut() };
        let node = if backwards {
            let node = &mut nodes[self.back.index()];
            self.back = node.prev;
            node
        } else {
            let node = &mut nodes[self.front.index()];
            self.front = node.next;
            node
        };
        self.remaining -= 1;
        let (key, value) = node.key_value_mut();
        Some(unsafe { (&*(key as *const K), &mut *(value as *mut V)) })
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.step(false)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.step(true)
    }
}

impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<'a, K, V> FusedIterator for IterMut<'a, K, V> {}

/// Owning iterator over a map's entries in ascending key order.
///
/// Entries are detached through the traversal list alone; whatever is left
/// when the iterator drops is freed by the slab.
pub struct IntoIter<K, V, C = Natural<K>>
where
    C: Compare<K>,
{
    map: RbMap<K, V, C>,
}

impl<K, V, C: Compare<K>> Iterator for IntoIter<K, V, C> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.map.len == 0 {
            return None;
        }
        let id = self.map.node(self.map.head).next;
        self.map.unlink(id);
        self.map.len -= 1;
        Some(self.map.nodes.remove(id.index()).into_entry())
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len, Some(self.map.len))
    }
}

impl<K, V, C: Compare<K>> DoubleEndedIterator for IntoIter<K, V, C> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.map.len == 0 {
            return None;
        }
        let id = self.map.node(self.map.tail).prev;
        self.map.unlink(id);
        self.map.len -= 1;
        Some(self.map.nodes.remove(id.index()).into_entry())
    }
}

impl<K, V, C: Compare<K>> ExactSizeIterator for IntoIter<K, V, C> {
    #[inline]
    fn len(&self) -> usize {
        self.map.len
    }
}

impl<K, V, C: Compare<K>> FusedIterator for IntoIter<K, V, C> {}
// endregion
