//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache and the list against simple reference models.

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

use crate::cache::{Cache, Clock, EntryUpdate, List, ManualClock, SetOptions, Timestamp};

// == Test Configuration ==
const TEST_LRU_MAX_SIZE: usize = 5;
const TEST_BUCKET_SIZE: u64 = 50;

// == Strategies ==
/// Small key space so operations keep colliding on the same keys
fn key_strategy() -> impl Strategy<Value = u8> {
    0u8..12
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: u8, value: i32, ttl: Option<u64> },
    Get { key: u8 },
    Update { key: u8, value: i32 },
    Delete { key: u8 },
    Advance { by: u64 },
    DeleteExpired,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), any::<i32>(), prop::option::of(1u64..300))
            .prop_map(|(key, value, ttl)| CacheOp::Set { key, value, ttl }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => (key_strategy(), any::<i32>()).prop_map(|(key, value)| CacheOp::Update { key, value }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => (1u64..200).prop_map(|by| CacheOp::Advance { by }),
        1 => Just(CacheOp::DeleteExpired),
    ]
}

// == Reference Model ==
/// Straightforward LRU + TTL model: recency order as a Vec, least recent first.
#[derive(Default)]
struct Model {
    entries: HashMap<u8, (i32, Option<Timestamp>)>,
    order: Vec<u8>,
}

impl Model {
    fn touch(&mut self, key: u8) {
        self.order.retain(|k| *k != key);
        self.order.push(key);
    }

    fn remove(&mut self, key: u8) -> bool {
        self.order.retain(|k| *k != key);
        self.entries.remove(&key).is_some()
    }

    fn set(&mut self, key: u8, value: i32, exp: Option<Timestamp>) {
        self.entries.insert(key, (value, exp));
        self.touch(key);
        if self.entries.len() > TEST_LRU_MAX_SIZE {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    fn get(&mut self, key: u8, now: Timestamp) -> Option<i32> {
        let (value, exp) = *self.entries.get(&key)?;
        if exp.is_some_and(|exp| exp <= now) {
            return None;
        }
        self.touch(key);
        Some(value)
    }

    fn delete_expired(&mut self, now: Timestamp) -> usize {
        let due: Vec<u8> = self
            .entries
            .iter()
            .filter(|(_, (_, exp))| exp.is_some_and(|exp| exp <= now))
            .map(|(key, _)| *key)
            .collect();
        for key in &due {
            self.remove(*key);
        }
        due.len()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // *For any* sequence of operations, the cache agrees with the reference
    // model on contents, lookups, recency order and sweep counts, and its
    // store, LRU list and bucket index stay in sync.
    #[test]
    fn prop_cache_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let clock = ManualClock::new(0);
        let mut cache: Cache<u8, i32> = Cache::builder()
            .clock(clock.clone())
            .lru_max_size(TEST_LRU_MAX_SIZE)
            .expiry_bucket_size(TEST_BUCKET_SIZE)
            .build()
            .unwrap();
        let mut model = Model::default();

        for op in ops {
            let now = clock.now();
            match op {
                CacheOp::Set { key, value, ttl } => {
                    let exp = ttl.map(|ttl| now + ttl);
                    let options = SetOptions { exp, max_age: None };
                    cache.set_with(key, value, options);
                    model.set(key, value, exp);
                }
                CacheOp::Get { key } => {
                    let got = cache.get(&key).map(|entry| entry.value);
                    prop_assert_eq!(got, model.get(key, now), "get({}) mismatch", key);
                }
                CacheOp::Update { key, value } => {
                    let updated = cache.update(&key, EntryUpdate::new().value(value));
                    let expected = match model.entries.get_mut(&key) {
                        Some(entry) => {
                            entry.0 = value;
                            model.touch(key);
                            true
                        }
                        None => false,
                    };
                    prop_assert_eq!(updated, expected);
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.remove(key));
                }
                CacheOp::Advance { by } => {
                    clock.advance(by);
                }
                CacheOp::DeleteExpired => {
                    prop_assert_eq!(cache.delete_expired(), model.delete_expired(now));
                }
            }

            prop_assert_eq!(cache.len(), model.entries.len(), "size mismatch");
            prop_assert!(cache.len() <= TEST_LRU_MAX_SIZE);
            let order: Vec<u8> = cache.lru_keys().copied().collect();
            prop_assert_eq!(&order, &model.order, "recency order mismatch");
            cache.assert_consistent();
        }
    }

    // *For any* set of keys, setting each key twice leaves exactly one entry per key.
    #[test]
    fn prop_overwrite_keeps_size(keys in prop::collection::vec(key_strategy(), 1..40)) {
        let mut cache: Cache<u8, u8> = Cache::new();
        for key in &keys {
            cache.set(*key, *key);
            cache.set(*key, key.wrapping_add(1));
        }

        let distinct: std::collections::HashSet<_> = keys.iter().collect();
        prop_assert_eq!(cache.len(), distinct.len());
        cache.assert_consistent();
    }

    // *For any* list and amount, rotation matches VecDeque rotation.
    #[test]
    fn prop_rotate_matches_vecdeque(
        values in prop::collection::vec(any::<u16>(), 0..20),
        amount in -50isize..50
    ) {
        let mut list: List<u16> = values.iter().copied().collect();
        let mut expected: VecDeque<u16> = values.iter().copied().collect();

        let rotated = list.rotate(amount);

        let len = values.len();
        match len {
            0 => prop_assert_eq!(rotated, 0),
            1 => prop_assert_eq!(rotated, 1),
            _ => {
                let shift = amount.unsigned_abs() % len;
                prop_assert_eq!(rotated, shift);
                if amount >= 0 {
                    expected.rotate_left(shift);
                } else {
                    expected.rotate_right(shift);
                }
            }
        }
        prop_assert_eq!(list.to_vec(), Vec::from(expected));
        prop_assert_eq!(list.iter().rev().count(), len);
    }

    // *For any* list, trimming splits it exactly like slicing a Vec.
    #[test]
    fn prop_trim_splits_like_vec(
        values in prop::collection::vec(any::<u16>(), 0..20),
        n in 0usize..25,
        from_start in any::<bool>()
    ) {
        let mut list: List<u16> = values.iter().copied().collect();
        let taken = n.min(values.len());

        let detached = if from_start { list.trim_start(n) } else { list.trim_end(n) };

        if taken == 0 {
            prop_assert!(detached.is_none());
            prop_assert_eq!(list.to_vec(), values);
        } else {
            let detached = detached.unwrap().to_vec();
            if from_start {
                prop_assert_eq!(detached, values[..taken].to_vec());
                prop_assert_eq!(list.to_vec(), values[taken..].to_vec());
            } else {
                let split = values.len() - taken;
                prop_assert_eq!(detached, values[split..].to_vec());
                prop_assert_eq!(list.to_vec(), values[..split].to_vec());
            }
        }
    }
}
