use std::sync::atomic::{AtomicU64, Ordering};

use crate::node::NodeId;

/// A copyable handle to one position in an [`RbMap`](crate::RbMap): either an
/// entry or the end position past the last entry.
///
/// A cursor borrows nothing; it pairs the identity of the map it came from
/// with the identity of a node, and every use goes back through the map
/// (e.g. [`RbMap::key_value`](crate::RbMap::key_value),
/// [`RbMap::advance`](crate::RbMap::advance)), which revalidates it. Cursors
/// stay valid across insertions and across erasures of any entry other than
/// the one they refer to.
///
/// Equality compares both the owning map and the position, so cursors from
/// different maps never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub(crate) map: u64,
    pub(crate) node: NodeId,
}

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(0);

/// Identity for a newly constructed (or deep-copied) map. Never reused, so a
/// cursor can always be matched against the map it was created from.
pub(crate) fn next_map_id() -> u64 {
    NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed)
}
