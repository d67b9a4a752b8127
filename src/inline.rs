use std::{fmt::Debug, iter::FusedIterator, marker::PhantomData};

use crate::{layout::Layout, traits::IntMapRead};

/// Allocation-free storage for keys in `[0, L::CAPACITY)` and values in
/// `[0, L::MAX_VALUE]`.
///
/// `present` holds one bit per key. `values` holds `L::CAPACITY` fields of
/// `L::VALUE_BITS` bits; the field of an absent key is always zero.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InlineMap<L: Layout> {
    present: u64,
    values: u64,
    _marker: PhantomData<L>,
}

impl<L: Layout> InlineMap<L> {
    pub const EMPTY: Self = {
        assert!(L::VALUE_BITS > 0 && L::VALUE_BITS < 32, "invalid layout");
        assert!(L::CAPACITY <= u64::BITS as usize, "invalid layout");
        Self {
            present: 0,
            values: 0,
            _marker: PhantomData,
        }
    };

    /// Returns true if the pair can be stored inline.
    #[inline]
    pub const fn fits(key: usize, value: u32) -> bool {
        key < L::CAPACITY && value <= L::MAX_VALUE
    }

    /// Stores `value` at `key`.
    ///
    /// Panics if the pair does not satisfy [`InlineMap::fits`]; callers route
    /// anything larger to an overflow store instead.
    #[inline]
    pub fn set(&mut self, key: usize, value: u32) {
        assert!(Self::fits(key, value), "pair ({key}, {value}) does not fit");
        let shift = field_shift::<L>(key);
        self.present |= 1u64 << key;
        self.values = (self.values & !(L::FIELD_MASK << shift)) | ((value as u64) << shift);
    }

    /// Removes `key`. Keys outside of the inline capacity are never present,
    /// so removing them is a no-op.
    #[inline]
    pub fn unset(&mut self, key: usize) -> bool {
        if key >= L::CAPACITY {
            return false;
        }
        let bit = 1u64 << key;
        let was_present = self.present & bit != 0;
        self.present &= !bit;
        self.values &= !(L::FIELD_MASK << field_shift::<L>(key));
        was_present
    }
}

/// Bit offset of the value field for `key`
#[inline(always)]
const fn field_shift<L: Layout>(key: usize) -> u32 {
    key as u32 * L::VALUE_BITS
}

impl<L: Layout> Default for InlineMap<L> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<L: Layout> Debug for InlineMap<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InlineMap<{}>({})", L::DEBUG_NAME, self.len())
    }
}

impl<L: Layout> IntMapRead for InlineMap<L> {
    #[inline]
    fn len(&self) -> usize {
        self.present.count_ones() as usize
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.present == 0
    }

    #[inline]
    fn get(&self, key: usize) -> Option<u32> {
        if key >= L::CAPACITY || self.present & (1u64 << key) == 0 {
            return None;
        }
        Some(((self.values >> field_shift::<L>(key)) & L::FIELD_MASK) as u32)
    }

    #[inline]
    fn max_key(&self) -> Option<usize> {
        if self.present == 0 {
            None
        } else {
            Some((u64::BITS - 1 - self.present.leading_zeros()) as usize)
        }
    }

    fn iter(&self) -> impl Iterator<Item = (usize, u32)> {
        InlineIter::new(*self)
    }
}

/// Walks the presence bits from lowest to highest.
pub struct InlineIter<L: Layout> {
    remaining: u64,
    values: u64,
    _marker: PhantomData<L>,
}

impl<L: Layout> InlineIter<L> {
    fn new(map: InlineMap<L>) -> Self {
        Self {
            remaining: map.present,
            values: map.values,
            _marker: PhantomData,
        }
    }
}

impl<L: Layout> Iterator for InlineIter<L> {
    type Item = (usize, u32);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.remaining.trailing_zeros() as usize;
        self.remaining &= self.remaining - 1;
        let value = (self.values >> field_shift::<L>(key)) & L::FIELD_MASK;
        Some((key, value as u32))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.remaining.count_ones() as usize;
        (len, Some(len))
    }
}

impl<L: Layout> ExactSizeIterator for InlineIter<L> {}
impl<L: Layout> FusedIterator for InlineIter<L> {}
