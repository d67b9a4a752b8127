//! `fast-int-map` is a map from small `usize` keys to small `u32` values that
//! does not allocate in the common case.
//!
//! ## Key Features:
//!
//! - **Inline storage**: while every key is below the layout's capacity and
//!   every value fits in its field width, a [`FastIntMap`] is two `u64` words:
//!   a presence bitmap and a packed array of values. With the default
//!   [`Nibble`] layout that is 16 keys with values in `0..=15`.
//!
//! - **One-way promotion**: the first insert that doesn't fit moves all pairs
//!   into a slot vector indexed by key. After that the map never returns to
//!   inline storage.
//!
//! - **Ordered traversal**: iteration, [`IntMapRead::for_each`], and
//!   [`IntMapRead::max_key`] behave identically in both representations and
//!   always visit keys in ascending order.

use thiserror::Error;

mod inline;
mod layout;
mod map;
mod overflow;
mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use inline::InlineMap;
pub use layout::{Byte, Crumb, Layout, Nibble};
pub use map::{FastIntMap, StorageKind};
pub use overflow::OverflowMap;
pub use traits::{IntMapRead, IntMapWrite};

/// Errors returned when parsing a [`FastIntMap`] from its `Display` form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErr {
    #[error("entry `{0}` is missing a `:` separator")]
    MissingSeparator(String),

    #[error("entry `{0}` has an invalid key")]
    InvalidKey(String),

    #[error("entry `{0}` has an invalid value")]
    InvalidValue(String),

    #[error("duplicate key {0}")]
    DuplicateKey(usize),
}
