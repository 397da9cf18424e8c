//! Property-based tests for the map using proptest
//!
//! Random operation sequences are applied to both a `ConcurrentMap` and a plain
//! `HashMap`; the two must agree after every step.

use crate::map::{ConcurrentMap, Map};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, i32),
    Delete(u8),
    Get(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small key space so overwrites and deletes of present keys are common
    prop_oneof![
        3 => (0u8..32, any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        1 => (0u8..32).prop_map(Op::Delete),
        2 => (0u8..32).prop_map(Op::Get),
    ]
}

#[cfg(test)]
mod model_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_matches_hashmap_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let map = ConcurrentMap::new();
            let mut model = HashMap::new();

            for op in ops {
                match op {
                    Op::Set(k, v) => {
                        prop_assert_eq!(map.insert(k, v), model.insert(k, v));
                    }
                    Op::Delete(k) => {
                        Map::delete(&map, &k);
                        model.remove(&k);
                        prop_assert_eq!(map.get(&k), None);
                    }
                    Op::Get(k) => {
                        prop_assert_eq!(map.get(&k), model.get(&k).copied());
                    }
                }
                prop_assert_eq!(map.len(), model.len());
            }

            let mut visited = HashMap::new();
            map.for_each(|k, v| {
                // Each key must be visited exactly once
                assert!(visited.insert(*k, *v).is_none());
            });
            prop_assert_eq!(visited, model);
        }

        #[test]
        fn test_len_counts_distinct_keys(keys in prop::collection::vec(any::<u16>(), 0..300)) {
            let map = ConcurrentMap::new();
            for &key in &keys {
                map.insert(key, ());
            }

            let mut distinct = keys.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(map.len(), distinct.len());
            prop_assert_eq!(map.is_empty(), distinct.is_empty());
        }

        #[test]
        fn test_retain_matches_filter(
            entries in prop::collection::hash_map(any::<u32>(), any::<u32>(), 0..100),
            modulus in 1u32..8
        ) {
            let map: ConcurrentMap<u32, u32> = entries.clone().into_iter().collect();
            map.retain(|_, v| *v % modulus == 0);

            let expected: HashMap<u32, u32> = entries
                .into_iter()
                .filter(|(_, v)| v % modulus == 0)
                .collect();
            prop_assert_eq!(map.into_inner(), expected);
        }
    }
}

#[cfg(test)]
mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_no_lost_updates(num_threads in 1usize..8, keys_per_thread in 1usize..200) {
            let map = Arc::new(ConcurrentMap::new());

            let handles: Vec<_> = (0..num_threads)
                .map(|t| {
                    let map = Arc::clone(&map);
                    thread::spawn(move || {
                        for i in 0..keys_per_thread {
                            map.insert(t * keys_per_thread + i, t);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            prop_assert_eq!(map.len(), num_threads * keys_per_thread);
            for key in 0..num_threads * keys_per_thread {
                prop_assert_eq!(map.get(&key), Some(key / keys_per_thread));
            }
        }
    }
}
