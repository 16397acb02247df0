/// Stable handle to a node's slot in the map's slab. Slots are reused only
/// after the node is erased, so a live node keeps its id for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(pub(crate) usize);

impl NodeId {
    /// Stand-in used while a node is being constructed, before it is linked.
    pub(crate) const PLACEHOLDER: NodeId = NodeId(usize::MAX);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// A node in the red-black tree.
///
/// `left`/`right` are the tree links (the owning shape: a node is reachable
/// from exactly one parent slot or from the root). `prev`/`next` thread every
/// node onto the sorted traversal list, bounded by the two sentinels; they are
/// plain non-owning ids. The list must mirror the tree's in-order sequence
/// after every mutation.
#[derive(Debug, Clone)]
pub(crate) struct Node<K, V> {
    /// `None` exactly for the two sentinels, which never enter the tree.
    pub(crate) entry: Option<(K, V)>,
    pub(crate) color: Color,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) prev: NodeId,
    pub(crate) next: NodeId,
}

impl<K, V> Node<K, V> {
    #[inline]
    pub(crate) fn new(key: K, value: V, color: Color, prev: NodeId, next: NodeId) -> Self {
        Node {
            entry: Some((key, value)),
            color,
            left: None,
            right: None,
            prev,
            next,
        }
    }

    /// A data-less boundary node. Its list links must be fixed up by the
    /// caller once its own id is known.
    #[inline]
    pub(crate) fn sentinel() -> Self {
        Node {
            entry: None,
            color: Color::Black,
            left: None,
            right: None,
            prev: NodeId::PLACEHOLDER,
            next: NodeId::PLACEHOLDER,
        }
    }

    #[inline]
    pub(crate) fn is_sentinel(&self) -> bool {
        self.entry.is_none()
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        match &self.entry {
            Some((key, _)) => key,
            None => unreachable!("sentinel node carries no entry"),
        }
    }

    #[inline]
    pub(crate) fn key_value(&self) -> (&K, &V) {
        match &self.entry {
            Some((key, value)) => (key, value),
            None => unreachable!("sentinel node carries no entry"),
        }
    }

    #[inline]
    pub(crate) fn key_value_mut(&mut self) -> (&K, &mut V) {
        match &mut self.entry {
            Some((key, value)) => (&*key, value),
            None => unreachable!("sentinel node carries no entry"),
        }
    }

    #[inline]
    pub(crate) fn value(&self) -> &V {
        self.key_value().1
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        self.key_value_mut().1
    }

    #[inline]
    pub(crate) fn into_entry(self) -> (K, V) {
        match self.entry {
            Some(entry) => entry,
            None => unreachable!("sentinel node carries no entry"),
        }
    }
}
