//! Property-based tests for `coalesce_map::HashMap`.
//!
//! Each test drives the map with a randomized operation sequence while
//! maintaining a `std::collections::HashMap` model adjusted for the
//! first-write-wins insertion rule (`model.entry(k).or_insert(v)`). After
//! every operation the map must agree with the model on membership, values,
//! and length, and occupancy must stay at or below 80% of the slot count.
//!
//! Maps start at 4 slots so sequences of a few dozen operations exercise
//! growth, shrink, and the chain-repairing erase under real collisions.

use std::collections::HashMap as StdHashMap;

use proptest::prelude::*;

use coalesce_map::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, u16),
    Remove(u8),
    Get(u8),
    Update(u8, u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        any::<u8>().prop_map(Op::Remove),
        any::<u8>().prop_map(Op::Get),
        (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Update(k, v)),
    ]
}

proptest! {
    /// The map agrees with a first-write-wins model after every operation.
    #[test]
    fn matches_model_under_mixed_operations(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut map: HashMap<u8, u16> = HashMap::with_capacity(4);
        let mut model: StdHashMap<u8, u16> = StdHashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    map.insert(k, v);
                    model.entry(k).or_insert(v);
                }
                Op::Remove(k) => {
                    let removed = map.remove(&k);
                    prop_assert_eq!(removed, model.remove(&k));
                }
                Op::Get(k) => {
                    prop_assert_eq!(map.get(&k), model.get(&k));
                }
                Op::Update(k, v) => {
                    *map.entry(k).or_default() = v;
                    model.insert(k, v);
                }
            }

            prop_assert_eq!(map.len(), model.len());
            prop_assert!(map.len() * 100 <= map.capacity() * 80);
        }

        // Full membership check at the end of the run.
        for (k, v) in &model {
            prop_assert_eq!(map.at(k), Ok(v));
        }
    }

    /// Iteration yields exactly the model's pairs, regardless of the
    /// relocations erase performed along the way.
    #[test]
    fn iteration_matches_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut map: HashMap<u8, u16> = HashMap::with_capacity(4);
        let mut model: StdHashMap<u8, u16> = StdHashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    map.insert(k, v);
                    model.entry(k).or_insert(v);
                }
                Op::Remove(k) => {
                    map.remove(&k);
                    model.remove(&k);
                }
                Op::Get(_) => {}
                Op::Update(k, v) => {
                    *map.entry(k).or_default() = v;
                    model.insert(k, v);
                }
            }
        }

        let seen: StdHashMap<u8, u16> = map.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(seen.len(), map.len());
        prop_assert_eq!(seen, model);
    }

    /// Removing a key always leaves it absent and every other key intact.
    #[test]
    fn removal_is_precise(keys in prop::collection::hash_set(any::<u8>(), 1..100), victim in any::<u8>()) {
        let mut map: HashMap<u8, u32> = HashMap::with_capacity(4);
        for &k in &keys {
            map.insert(k, u32::from(k) * 7);
        }

        let expected = keys.contains(&victim).then(|| u32::from(victim) * 7);
        prop_assert_eq!(map.remove(&victim), expected);
        prop_assert!(!map.contains_key(&victim));

        for &k in &keys {
            if k != victim {
                prop_assert_eq!(map.at(&k), Ok(&(u32::from(k) * 7)));
            }
        }
    }

    /// Duplicate inserts never change a value; only the entry API does.
    #[test]
    fn first_write_wins(k in any::<u8>(), first in any::<u16>(), rest in prop::collection::vec(any::<u16>(), 1..20)) {
        let mut map: HashMap<u8, u16> = HashMap::new();
        map.insert(k, first);
        for &v in &rest {
            map.insert(k, v);
            prop_assert_eq!(map.get(&k), Some(&first));
        }
        prop_assert_eq!(map.len(), 1);
    }
}
