use std::fmt::Debug;

/// A `Layout` fixes how an inline map packs its values into a single `u64`.
///
/// The values word is split into `CAPACITY` fields of `VALUE_BITS` bits each,
/// so keys in `[0, CAPACITY)` and values in `[0, MAX_VALUE]` can be stored
/// without allocating.
pub trait Layout: Debug + Default + Clone + Copy + PartialEq + Eq {
    const DEBUG_NAME: &'static str;

    /// width of each packed value field
    const VALUE_BITS: u32;

    /// number of keys the inline representation can hold
    const CAPACITY: usize = (u64::BITS / Self::VALUE_BITS) as usize;

    /// the largest value the inline representation can hold
    const MAX_VALUE: u32 = (1 << Self::VALUE_BITS) - 1;

    /// mask selecting a single value field
    const FIELD_MASK: u64 = (1 << Self::VALUE_BITS) - 1;
}

/// 4-bit values, 16 keys. This is the default layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Nibble;

impl Layout for Nibble {
    const DEBUG_NAME: &'static str = "Nibble";
    const VALUE_BITS: u32 = 4;
}

/// 2-bit values, 32 keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Crumb;

impl Layout for Crumb {
    const DEBUG_NAME: &'static str = "Crumb";
    const VALUE_BITS: u32 = 2;
}

/// 8-bit values, 8 keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Byte;

impl Layout for Byte {
    const DEBUG_NAME: &'static str = "Byte";
    const VALUE_BITS: u32 = 8;
}

static_assertions::const_assert_eq!(Nibble::CAPACITY, 16);
static_assertions::const_assert_eq!(Nibble::MAX_VALUE, 15);
static_assertions::const_assert_eq!(Crumb::CAPACITY, 32);
static_assertions::const_assert_eq!(Byte::CAPACITY, 8);
