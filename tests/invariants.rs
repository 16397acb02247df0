use std::collections::BTreeMap;

use linked_rbmap::RbMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Random inserts and removes, checked against `std::collections::BTreeMap`
/// with every structural invariant revalidated after each mutation.
#[test]
fn random_mutations_match_model() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut map: RbMap<u16, u32> = RbMap::new();
    let mut model: BTreeMap<u16, u32> = BTreeMap::new();

    for step in 0..4_000u32 {
        let key = rng.gen_range(0..512);
        if rng.gen_bool(0.6) {
            let (_, inserted) = map.insert(key, step);
            // first value wins on duplicates
            assert_eq!(inserted, !model.contains_key(&key));
            model.entry(key).or_insert(step);
        } else {
            assert_eq!(map.remove(&key), model.remove(&key));
        }
        map.validate();
        assert_eq!(map.len(), model.len());
    }

    assert!(map.iter().map(|(k, v)| (*k, *v)).eq(model.iter().map(|(k, v)| (*k, *v))));
}

#[test]
fn random_cursor_walk_matches_model() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut map: RbMap<u32, u32> = RbMap::new();
    for _ in 0..300 {
        let key = rng.gen_range(0..1_000);
        map.insert(key, key);
    }

    // forward walk visits exactly the sorted keys
    let mut cursor = map.begin();
    let mut walked = Vec::new();
    while cursor != map.end() {
        walked.push(*map.key_value(cursor).unwrap().0);
        cursor = map.advance(cursor).unwrap();
    }
    assert_eq!(walked, map.keys().copied().collect::<Vec<_>>());

    // and the backward walk is its mirror
    let mut back = Vec::new();
    while cursor != map.begin() {
        cursor = map.advance_back(cursor).unwrap();
        back.push(*map.key_value(cursor).unwrap().0);
    }
    back.reverse();
    assert_eq!(back, walked);
}

#[test]
fn height_stays_logarithmic() {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut map: RbMap<u32, ()> = RbMap::new();
    for _ in 0..10_000 {
        map.insert(rng.gen(), ());
    }

    let bound = 2.0 * ((map.len() + 1) as f64).log2();
    assert!(
        map.height() as f64 <= bound,
        "height {} exceeds {:.1} for {} entries",
        map.height(),
        bound,
        map.len(),
    );
}

/// Erasure by cursor in random order, exercising every splice shape.
#[test]
fn erase_all_in_random_order() {
    let mut rng = SmallRng::seed_from_u64(0xdead);
    let mut map: RbMap<u32, u32> = RbMap::new();
    let mut cursors = Vec::new();
    for key in 0..500 {
        let (cursor, inserted) = map.insert(key, key);
        assert!(inserted);
        cursors.push((key, cursor));
    }

    while !cursors.is_empty() {
        let pick = rng.gen_range(0..cursors.len());
        let (key, cursor) = cursors.swap_remove(pick);
        assert_eq!(map.erase(cursor), Ok((key, key)));
        map.validate();
        // all surviving cursors still resolve
        if let Some(&(other_key, other)) = cursors.first() {
            assert_eq!(*map.key_value(other).unwrap().0, other_key);
        }
    }
    assert!(map.is_empty());
    map.validate();
}

#[test]
fn interleaved_pop_front_and_back() {
    let mut map: RbMap<i32, i32> = (0..100).map(|k| (k, k)).collect();
    let mut lo = 0;
    let mut hi = 99;
    while !map.is_empty() {
        assert_eq!(map.pop_first(), Some((lo, lo)));
        map.validate();
        if map.is_empty() {
            break;
        }
        assert_eq!(map.pop_last(), Some((hi, hi)));
        map.validate();
        lo += 1;
        hi -= 1;
    }
}
