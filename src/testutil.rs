use std::collections::BTreeMap;

use itertools::assert_equal;
use proptest::{collection::SizeRange, prelude::*};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::traits::{IntMapRead, IntMapWrite};

/// A single map mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Set(usize, u32),
    Unset(usize),
}

impl Op {
    /// Apply this op to both the map under test and a reference map.
    pub fn apply<M: IntMapWrite>(self, map: &mut M, reference: &mut BTreeMap<usize, u32>) {
        match self {
            Op::Set(key, value) => {
                map.set(key, value);
                reference.insert(key, value);
            }
            Op::Unset(key) => {
                let removed = map.unset(key);
                assert_eq!(
                    removed,
                    reference.remove(&key).is_some(),
                    "unset({key}) disagrees with reference"
                );
            }
        }
    }
}

/// Generates a seeded stream of random ops with keys in `[0, key_range)` and
/// values in `[0, value_range)`. Sets and unsets are equally likely.
pub struct OpGen {
    rng: StdRng,
    key_range: usize,
    value_range: u32,
}

impl OpGen {
    pub fn new(seed: u64, key_range: usize, value_range: u32) -> Self {
        let rng = StdRng::seed_from_u64(seed);
        Self { rng, key_range, value_range }
    }

    pub fn next_op(&mut self) -> Op {
        let key = self.rng.random_range(0..self.key_range);
        if self.rng.random_bool(0.5) {
            Op::Set(key, self.rng.random_range(0..self.value_range))
        } else {
            Op::Unset(key)
        }
    }

    /// Returns `len` random `(key, value)` pairs.
    pub fn pairs(&mut self, len: usize) -> Vec<(usize, u32)> {
        (0..len)
            .map(|_| {
                (
                    self.rng.random_range(0..self.key_range),
                    self.rng.random_range(0..self.value_range),
                )
            })
            .collect()
    }

    /// Returns `len` random keys.
    pub fn keys(&mut self, len: usize) -> Vec<usize> {
        (0..len)
            .map(|_| self.rng.random_range(0..self.key_range))
            .collect()
    }

    /// Returns true with probability `1/n`.
    pub fn one_in(&mut self, n: u32) -> bool {
        self.rng.random_ratio(1, n)
    }
}

/// A proptest strategy producing sequences of ops.
pub fn ops_strategy(
    key_range: usize,
    value_range: u32,
    len: impl Into<SizeRange>,
) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0..key_range, 0..value_range).prop_map(|(key, value)| Op::Set(key, value)),
        (0..key_range).prop_map(Op::Unset),
    ];
    proptest::collection::vec(op, len)
}

/// Assert that `map` agrees with `reference` for every key in
/// `[0, key_range)` and for every whole-map query.
#[track_caller]
pub fn check_against_reference<M: IntMapRead>(
    map: &M,
    reference: &BTreeMap<usize, u32>,
    key_range: usize,
) {
    for key in 0..key_range {
        assert_eq!(
            map.get(key),
            reference.get(&key).copied(),
            "incorrect result for key {key}"
        );
        assert_eq!(map.contains(key), reference.contains_key(&key));
    }

    assert_eq!(map.len(), reference.len(), "incorrect len");
    assert_eq!(map.is_empty(), reference.is_empty());
    assert_eq!(
        map.max_key(),
        reference.keys().next_back().copied(),
        "incorrect max_key"
    );
    assert_eq!(map.max_value(), reference.values().copied().max());

    let mut visited = Vec::with_capacity(reference.len());
    map.for_each(|key, value| visited.push((key, value)));
    assert_equal(visited, reference.iter().map(|(&k, &v)| (k, v)));
    assert_equal(map.iter(), reference.iter().map(|(&k, &v)| (k, v)));
}
