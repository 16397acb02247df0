use linked_rbmap::{Error, RbMap};

#[test]
fn walk_forward_and_back() {
    let map: RbMap<i32, &str> = [(1, "a"), (2, "b"), (3, "c")].into_iter().collect();

    let mut cursor = map.begin();
    let mut seen = Vec::new();
    while cursor != map.end() {
        let (key, value) = map.key_value(cursor).unwrap();
        seen.push((*key, *value));
        cursor = map.advance(cursor).unwrap();
    }
    assert_eq!(seen, [(1, "a"), (2, "b"), (3, "c")]);

    // and back down from the end position
    cursor = map.advance_back(cursor).unwrap();
    assert_eq!(map.key_value(cursor), Ok((&3, &"c")));
    cursor = map.advance_back(cursor).unwrap();
    cursor = map.advance_back(cursor).unwrap();
    assert_eq!(cursor, map.begin());
}

#[test]
fn empty_map_boundaries() {
    let map: RbMap<i32, ()> = RbMap::new();
    assert_eq!(map.begin(), map.end());
    assert_eq!(map.advance(map.end()), Err(Error::InvalidCursor));
    assert_eq!(map.advance_back(map.end()), Err(Error::InvalidCursor));
    assert_eq!(map.key_value(map.end()), Err(Error::InvalidCursor));
}

#[test]
fn end_cursor_never_dereferences() {
    let mut map = RbMap::new();
    map.insert(1, "a");

    let end = map.end();
    assert_eq!(map.key_value(end), Err(Error::InvalidCursor));
    assert_eq!(map.erase(end), Err(Error::InvalidCursor));
    assert_eq!(map.len(), 1);

    // stepping past either boundary is refused
    assert_eq!(map.advance(end), Err(Error::InvalidCursor));
    assert_eq!(map.advance_back(map.begin()), Err(Error::InvalidCursor));
}

#[test]
fn foreign_cursor_is_rejected() {
    let mut a = RbMap::new();
    let mut b = RbMap::new();
    let (in_a, _) = a.insert(1, "a");
    b.insert(1, "b");

    assert_eq!(b.key_value(in_a), Err(Error::InvalidCursor));
    assert_eq!(b.advance(in_a), Err(Error::InvalidCursor));
    assert_eq!(b.erase(in_a), Err(Error::InvalidCursor));
    assert_eq!(b.len(), 1);
    assert_ne!(a.end(), b.end());

    // a clone counts as a different map too
    let c = a.clone();
    assert_eq!(c.key_value(in_a), Err(Error::InvalidCursor));
    assert_eq!(a.key_value(in_a), Ok((&1, &"a")));
}

#[test]
fn cursors_survive_unrelated_mutations() {
    let mut map = RbMap::new();
    let (at_five, _) = map.insert(5, "five");

    // rebalancing moves the tree around but never a node's identity
    for key in 0..50 {
        map.insert(key, "x");
    }
    for key in (0..50).step_by(2) {
        if key != 5 {
            map.remove(&key);
        }
    }
    map.validate();
    assert_eq!(map.key_value(at_five), Ok((&5, &"five")));
}

#[test]
fn stale_cursor_after_erase() {
    let mut map = RbMap::new();
    let (cursor, _) = map.insert(1, "a");
    map.insert(2, "b");

    assert_eq!(map.erase(cursor), Ok((1, "a")));
    assert_eq!(map.key_value(cursor), Err(Error::InvalidCursor));
    assert_eq!(map.advance(cursor), Err(Error::InvalidCursor));
    assert_eq!(map.erase(cursor), Err(Error::InvalidCursor));
    assert_eq!(map.len(), 1);
}

#[test]
fn find_returns_end_on_miss() {
    let mut map = RbMap::new();
    map.insert(1, "a");
    map.insert(3, "c");

    let hit = map.find(&3);
    assert_eq!(map.key_value(hit), Ok((&3, &"c")));
    assert_eq!(map.find(&2), map.end());
}

#[test]
fn erase_returns_entry_and_neighbors_remain() {
    let mut map = RbMap::new();
    for key in 0..10 {
        map.insert(key, key * 10);
    }
    let cursor = map.find(&4);
    let after = map.advance(cursor).unwrap();
    let before = map.advance_back(cursor).unwrap();

    assert_eq!(map.erase(cursor), Ok((4, 40)));
    assert_eq!(map.key_value(before), Ok((&3, &30)));
    assert_eq!(map.key_value(after), Ok((&5, &50)));
    // the neighbors are now adjacent
    assert_eq!(map.advance(before), Ok(after));
    map.validate();
}

#[test]
fn key_value_mut_through_cursor() {
    let mut map = RbMap::new();
    let (cursor, _) = map.insert(1, 10);

    let (key, value) = map.key_value_mut(cursor).unwrap();
    assert_eq!(key, &1);
    *value += 5;
    assert_eq!(map.at(&1), Ok(&15));
}
