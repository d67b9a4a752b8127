use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
};

use either::Either;
use itertools::Itertools;

use crate::{
    ParseErr,
    inline::InlineMap,
    layout::{Layout, Nibble},
    overflow::OverflowMap,
    traits::{IntMapRead, IntMapWrite},
};

/// A map from small `usize` keys to small `u32` values which avoids
/// allocating while its contents fit into two machine words.
///
/// A new map stores up to `L::CAPACITY` keys with values up to
/// `L::MAX_VALUE` inline. The first [`set`](IntMapWrite::set) that needs a
/// larger key or value moves every pair into a heap allocated slot vector.
/// This promotion happens at most once and is never undone.
///
/// Cloning an inline map copies two words. Cloning a promoted map copies its
/// slot vector, so the two maps never share storage.
///
/// # Examples
///
/// ```
/// use fast_int_map::{FastIntMap, IntMapRead, IntMapWrite, StorageKind};
///
/// let mut map: FastIntMap = FastIntMap::new();
/// map.set(3, 5);
/// map.set(10, 2);
/// assert_eq!(map.get(3), Some(5));
/// assert_eq!(map.max_key(), Some(10));
/// assert_eq!(map.storage_kind(), StorageKind::Inline);
///
/// // 20 is past the inline capacity
/// map.set(20, 1);
/// assert_eq!(map.storage_kind(), StorageKind::Overflow);
/// assert_eq!(map.get(10), Some(2));
/// assert_eq!(map.max_key(), Some(20));
/// ```
pub struct FastIntMap<L: Layout = Nibble> {
    storage: Storage<L>,
}

static_assertions::const_assert!(std::mem::size_of::<FastIntMap>() <= 40);

enum Storage<L: Layout> {
    Inline(InlineMap<L>),
    Overflow(OverflowMap),
}

/// Which representation a [`FastIntMap`] currently uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Inline,
    Overflow,
}

impl<L: Layout> FastIntMap<L> {
    /// An empty map, suitable for usage in a const context.
    pub const EMPTY: Self = Self {
        storage: Storage::Inline(InlineMap::EMPTY),
    };

    /// Creates an empty map. Does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Returns the representation this map currently uses.
    #[inline]
    pub fn storage_kind(&self) -> StorageKind {
        match self.storage {
            Storage::Inline(_) => StorageKind::Inline,
            Storage::Overflow(_) => StorageKind::Overflow,
        }
    }

    /// Moves every inline pair into a new overflow store with room for
    /// `key`, and returns the store.
    #[cold]
    fn promote(&mut self, key: usize) -> &mut OverflowMap {
        if let Storage::Inline(inline) = self.storage {
            let slots = key
                .max(L::CAPACITY - 1)
                .checked_add(1)
                .expect("key out of range");
            log::trace!(
                "promoting FastIntMap<{}> with {} pairs to overflow store of {} slots",
                L::DEBUG_NAME,
                inline.len(),
                slots
            );
            let mut overflow = OverflowMap::with_slots(slots);
            for (k, v) in inline.iter() {
                overflow.set(k, v);
            }
            debug_assert_eq!(overflow.len(), inline.len(), "promotion lost pairs");
            self.storage = Storage::Overflow(overflow);
        }
        match &mut self.storage {
            Storage::Overflow(overflow) => overflow,
            Storage::Inline(_) => unreachable!("BUG: promotion left the map inline"),
        }
    }
}

impl<L: Layout> Default for FastIntMap<L> {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<L: Layout> Clone for FastIntMap<L> {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Inline(inline) => Storage::Inline(*inline),
            Storage::Overflow(overflow) => Storage::Overflow(overflow.clone()),
        };
        Self { storage }
    }

    /// Copies `source` into this map, reusing this map's overflow store if it
    /// has one. A promoted map stays promoted.
    fn clone_from(&mut self, source: &Self) {
        match (&mut self.storage, &source.storage) {
            (Storage::Overflow(dst), Storage::Overflow(src)) => dst.clone_from(src),
            (Storage::Overflow(dst), Storage::Inline(src)) => {
                dst.clear();
                for (key, value) in src.iter() {
                    dst.set(key, value);
                }
            }
            (dst, src) => {
                *dst = match src {
                    Storage::Inline(inline) => Storage::Inline(*inline),
                    Storage::Overflow(overflow) => Storage::Overflow(overflow.clone()),
                }
            }
        }
    }
}

impl<L: Layout> IntMapRead for FastIntMap<L> {
    #[inline]
    fn len(&self) -> usize {
        match &self.storage {
            Storage::Inline(inline) => inline.len(),
            Storage::Overflow(overflow) => overflow.len(),
        }
    }

    #[inline]
    fn get(&self, key: usize) -> Option<u32> {
        match &self.storage {
            Storage::Inline(inline) => inline.get(key),
            Storage::Overflow(overflow) => overflow.get(key),
        }
    }

    #[inline]
    fn max_key(&self) -> Option<usize> {
        match &self.storage {
            Storage::Inline(inline) => inline.max_key(),
            Storage::Overflow(overflow) => overflow.max_key(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (usize, u32)> {
        match &self.storage {
            Storage::Inline(inline) => Either::Left(inline.iter()),
            Storage::Overflow(overflow) => Either::Right(overflow.iter()),
        }
    }
}

impl<L: Layout> IntMapWrite for FastIntMap<L> {
    #[inline]
    fn set(&mut self, key: usize, value: u32) {
        match &mut self.storage {
            Storage::Inline(inline) if InlineMap::<L>::fits(key, value) => inline.set(key, value),
            Storage::Inline(_) => self.promote(key).set(key, value),
            Storage::Overflow(overflow) => overflow.set(key, value),
        }
    }

    #[inline]
    fn unset(&mut self, key: usize) -> bool {
        match &mut self.storage {
            Storage::Inline(inline) => inline.unset(key),
            Storage::Overflow(overflow) => overflow.unset(key),
        }
    }
}

impl<L: Layout> PartialEq for FastIntMap<L> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.storage, &other.storage) {
            (Storage::Inline(a), Storage::Inline(b)) => a == b,
            (Storage::Overflow(a), Storage::Overflow(b)) => a == b,
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl<L: Layout> Eq for FastIntMap<L> {}

impl<L: Layout> Debug for FastIntMap<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Formats the map as space separated `key:value` pairs in key order.
impl<L: Layout> Display for FastIntMap<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self
            .iter()
            .format_with(" ", |(key, value), f| f(&format_args!("{key}:{value}")));
        write!(f, "{pairs}")
    }
}

impl<L: Layout> FromStr for FastIntMap<L> {
    type Err = ParseErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = Self::EMPTY;
        for entry in s.split_whitespace() {
            let (key, value) = entry
                .split_once(':')
                .ok_or_else(|| ParseErr::MissingSeparator(entry.to_owned()))?;
            let key: usize = key
                .parse()
                .map_err(|_| ParseErr::InvalidKey(entry.to_owned()))?;
            let value: u32 = value
                .parse()
                .map_err(|_| ParseErr::InvalidValue(entry.to_owned()))?;
            if map.contains(key) {
                return Err(ParseErr::DuplicateKey(key));
            }
            map.set(key, value);
        }
        Ok(map)
    }
}

impl<L: Layout> FromIterator<(usize, u32)> for FastIntMap<L> {
    fn from_iter<I: IntoIterator<Item = (usize, u32)>>(iter: I) -> Self {
        let mut map = Self::EMPTY;
        map.extend(iter);
        map
    }
}

impl<L: Layout> Extend<(usize, u32)> for FastIntMap<L> {
    fn extend<I: IntoIterator<Item = (usize, u32)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;
    use itertools::assert_equal;
    use proptest::proptest;

    use super::*;
    use crate::{
        layout::{Byte, Crumb},
        testutil::{Op, OpGen, check_against_reference, ops_strategy},
    };

    #[test]
    fn test_scenario_promotion() {
        let mut map = FastIntMap::<Nibble>::EMPTY;
        map.set(3, 5);
        map.set(10, 2);
        assert_eq!(map.get(3), Some(5));
        assert_eq!(map.get(10), Some(2));
        assert_eq!(map.max_key(), Some(10));
        assert_eq!(map.storage_kind(), StorageKind::Inline);

        map.set(20, 1);
        assert_eq!(map.storage_kind(), StorageKind::Overflow);
        assert_eq!(map.get(3), Some(5));
        assert_eq!(map.get(10), Some(2));
        assert_eq!(map.get(20), Some(1));
        assert_eq!(map.max_key(), Some(20));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_scenario_empty() {
        let map = FastIntMap::<Nibble>::new();
        assert_eq!(map.max_key(), None);
        assert_eq!(map.max_value(), None);
        let mut visited = 0;
        map.for_each(|_, _| visited += 1);
        assert_eq!(visited, 0);
        assert!(map.is_empty());
        assert_eq!(map.to_string(), "");
    }

    #[test]
    fn test_promotion_on_large_value() {
        let mut map: FastIntMap = (0usize..16).map(|k| (k, k as u32)).collect();
        assert_eq!(map.storage_kind(), StorageKind::Inline);

        // key fits, value doesn't
        map.set(4, 16);
        assert_eq!(map.storage_kind(), StorageKind::Overflow);
        assert_eq!(map.get(4), Some(16));
        for key in (0..16).filter(|&k| k != 4) {
            assert_eq!(map.get(key), Some(key as u32), "key {key}");
        }
        assert_eq!(map.len(), 16);
        assert_eq!(map.max_value(), Some(16));
    }

    #[test]
    fn test_promotion_is_irreversible() {
        let mut map = FastIntMap::<Nibble>::EMPTY;
        map.set(100, 1);
        assert!(map.unset(100));
        assert!(map.is_empty());
        assert_eq!(map.storage_kind(), StorageKind::Overflow);

        map.set(1, 1);
        assert_eq!(map.storage_kind(), StorageKind::Overflow);
        assert_eq!(map.get(1), Some(1));
    }

    #[test]
    fn test_set_usize_max_keeps_pairs() {
        for promoted in [false, true] {
            let mut map = FastIntMap::<Nibble>::EMPTY;
            map.set(4, 7);
            if promoted {
                map.set(100, 1);
            }
            let before = map.clone();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                map.set(usize::MAX, 1);
            }));
            assert!(result.is_err());
            assert_eq!(map, before);
            assert_eq!(map.storage_kind(), before.storage_kind());
        }
    }

    #[test]
    fn test_get_and_unset_never_promote() {
        let mut map = FastIntMap::<Nibble>::EMPTY;
        map.set(2, 2);
        assert_eq!(map.get(1 << 40), None);
        assert!(!map.contains(16));
        assert!(!map.unset(1 << 40));
        assert!(!map.unset(16));
        assert_eq!(map.get_or(16, 99), 99);
        assert_eq!(map.get_or(2, 99), 2);
        assert_eq!(map.storage_kind(), StorageKind::Inline);
    }

    #[test]
    fn test_idempotent_unset() {
        for key in [1usize, 100] {
            let mut map = FastIntMap::<Nibble>::EMPTY;
            map.set(key, 3);
            map.set(0, 1);
            let before = map.clone();
            assert!(!map.unset(5));
            assert!(!map.unset(5));
            assert!(!map.unset(10_000));
            assert_eq!(map, before);
            assert_eq!(map.storage_kind(), before.storage_kind());
        }
    }

    #[test]
    fn test_clone_independence() {
        for promote in [false, true] {
            let mut a = FastIntMap::<Nibble>::EMPTY;
            a.set(1, 1);
            a.set(7, 3);
            if promote {
                a.set(64, 64);
            }
            let mut b = a.clone();
            assert_eq!(a, b);

            a.set(1, 2);
            a.unset(7);
            assert_eq!(b.get(1), Some(1));
            assert_eq!(b.get(7), Some(3));

            b.set(2, 2);
            b.set(1000, 5);
            assert_eq!(a.get(2), None);
            assert_eq!(a.get(1000), None);
            assert_eq!(b.storage_kind(), StorageKind::Overflow);
            assert_eq!(
                a.storage_kind(),
                if promote { StorageKind::Overflow } else { StorageKind::Inline }
            );
        }
    }

    #[test]
    fn test_clone_from_keeps_overflow() {
        let inline: FastIntMap = [(1, 1), (2, 2)].into_iter().collect();
        let overflow: FastIntMap = [(1, 1), (200, 2)].into_iter().collect();

        let mut dst = overflow.clone();
        dst.clone_from(&inline);
        assert_eq!(dst, inline);
        assert_eq!(dst.storage_kind(), StorageKind::Overflow);
        assert_eq!(dst.get(200), None);

        let mut dst = inline.clone();
        dst.clone_from(&overflow);
        assert_eq!(dst, overflow);
        assert_eq!(dst.storage_kind(), StorageKind::Overflow);

        let mut dst = FastIntMap::<Nibble>::EMPTY;
        dst.clone_from(&inline);
        assert_eq!(dst, inline);
        assert_eq!(dst.storage_kind(), StorageKind::Inline);

        let mut dst = FastIntMap::<Nibble>::EMPTY;
        dst.set(500, 1);
        dst.clone_from(&overflow);
        assert_eq!(dst, overflow);
        dst.set(1, 9);
        assert_eq!(overflow.get(1), Some(1));
    }

    #[test]
    fn test_eq_across_storage_kinds() {
        let inline: FastIntMap = [(1, 1), (2, 2)].into_iter().collect();
        let mut promoted = FastIntMap::<Nibble>::EMPTY;
        promoted.set(300, 1);
        promoted.unset(300);
        promoted.extend([(2, 2), (1, 1)]);
        assert_eq!(promoted.storage_kind(), StorageKind::Overflow);
        assert_eq!(inline, promoted);
        assert_eq!(promoted, inline);

        promoted.set(3, 3);
        assert_ne!(inline, promoted);
    }

    #[test]
    fn test_for_each_order() {
        for keys in [vec![9, 0, 4, 15], vec![9, 0, 400, 4, 15]] {
            let map: FastIntMap = keys.iter().map(|&k| (k, 1)).collect();
            let mut visited = vec![];
            map.for_each(|key, value| {
                assert_eq!(value, 1);
                visited.push(key);
            });
            assert_equal(visited, keys.iter().copied().sorted());
        }
    }

    #[test]
    fn test_display_and_parse() {
        let map: FastIntMap = [(10, 2), (3, 5), (42, 1000)].into_iter().collect();
        let text = map.to_string();
        assert_eq!(text, "3:5 10:2 42:1000");
        assert_eq!(text.parse::<FastIntMap>().unwrap(), map);
        assert_eq!(format!("{map:?}"), "{3: 5, 10: 2, 42: 1000}");

        let parsed: FastIntMap = " 1:1\t2:2 ".parse().unwrap();
        assert_eq!(parsed.storage_kind(), StorageKind::Inline);
        assert_eq!(parsed.len(), 2);
        assert!("".parse::<FastIntMap>().unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_matches!(
            "1:1 2".parse::<FastIntMap>(),
            Err(ParseErr::MissingSeparator(e)) if e == "2"
        );
        assert_matches!("x:1".parse::<FastIntMap>(), Err(ParseErr::InvalidKey(_)));
        assert_matches!("-1:1".parse::<FastIntMap>(), Err(ParseErr::InvalidKey(_)));
        assert_matches!("1:".parse::<FastIntMap>(), Err(ParseErr::InvalidValue(_)));
        assert_matches!("1:-3".parse::<FastIntMap>(), Err(ParseErr::InvalidValue(_)));
        assert_matches!("1:1 1:2".parse::<FastIntMap>(), Err(ParseErr::DuplicateKey(1)));
    }

    #[test]
    fn test_layouts() {
        let mut crumbs = FastIntMap::<Crumb>::EMPTY;
        for key in 0..32 {
            crumbs.set(key, 3);
        }
        assert_eq!(crumbs.storage_kind(), StorageKind::Inline);
        crumbs.set(0, 4);
        assert_eq!(crumbs.storage_kind(), StorageKind::Overflow);
        assert_eq!(crumbs.len(), 32);

        let mut bytes = FastIntMap::<Byte>::EMPTY;
        bytes.set(7, 255);
        assert_eq!(bytes.storage_kind(), StorageKind::Inline);
        bytes.set(8, 0);
        assert_eq!(bytes.storage_kind(), StorageKind::Overflow);
        assert_eq!(bytes.get(7), Some(255));
    }

    /// Random walk over set/unset/clone checked against a `BTreeMap` at
    /// every step, across key and value ranges on both sides of the inline
    /// capacity.
    #[test]
    fn test_matches_reference() {
        let cases = [
            (10, 10),
            (Nibble::CAPACITY, Nibble::MAX_VALUE + 1),
            (Nibble::CAPACITY + 1, Nibble::MAX_VALUE + 1),
            (Nibble::CAPACITY, Nibble::MAX_VALUE + 2),
            (100, 100),
        ];
        for (seed, (key_range, value_range)) in cases.into_iter().enumerate() {
            let mut op_gen = OpGen::new(seed as u64, key_range, value_range);
            let mut map = FastIntMap::<Nibble>::EMPTY;
            let mut reference = BTreeMap::new();
            for _ in 0..1000 {
                check_against_reference(&map, &reference, key_range);
                match op_gen.next_op() {
                    Op::Set(key, value) => {
                        map.set(key, value);
                        reference.insert(key, value);
                    }
                    Op::Unset(key) => {
                        assert_eq!(map.unset(key), reference.remove(&key).is_some());
                    }
                }
                if op_gen.one_in(10) {
                    // the next iteration checks that the clone kept the data
                    let mut old = map.clone();
                    old.set(1, 1);
                    old.set(key_range + 5, 0);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn test_matches_reference_proptest(ops in ops_strategy(40, 40, 0..256)) {
            let mut map = FastIntMap::<Nibble>::EMPTY;
            let mut reference = BTreeMap::new();
            for op in ops {
                op.apply(&mut map, &mut reference);
                check_against_reference(&map, &reference, 40);
            }
        }

        #[test]
        fn test_promotion_lossless_proptest(
            ops in ops_strategy(Nibble::CAPACITY, Nibble::MAX_VALUE + 1, 0..64),
            key in 0usize..1024,
            value in 0u32..1024,
        ) {
            let mut map = FastIntMap::<Nibble>::EMPTY;
            let mut reference = BTreeMap::new();
            for op in ops {
                op.apply(&mut map, &mut reference);
            }
            assert_eq!(map.storage_kind(), StorageKind::Inline);

            map.set(key, value);
            reference.insert(key, value);
            let expected_kind = if InlineMap::<Nibble>::fits(key, value) {
                StorageKind::Inline
            } else {
                StorageKind::Overflow
            };
            assert_eq!(map.storage_kind(), expected_kind);
            check_against_reference(&map, &reference, 1024);
        }

        #[test]
        fn test_display_parse_proptest(ops in ops_strategy(64, 64, 0..64)) {
            let mut map = FastIntMap::<Nibble>::EMPTY;
            let mut reference = BTreeMap::new();
            for op in ops {
                op.apply(&mut map, &mut reference);
            }
            let parsed: FastIntMap = map.to_string().parse().unwrap();
            assert_eq!(parsed, map);
        }
    }
}
