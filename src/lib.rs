#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A hash map implementation using coalesced hashing.
///
/// This module provides a `HashMap` that wraps the `SlotTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

pub mod slot_table;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_map::KeyNotFound;
pub use slot_table::SlotTable;

/// The hasher builder used by [`HashMap`] when none is specified.
///
/// With the `foldhash` feature enabled (the default) this is
/// `foldhash::fast::RandomState`. With the feature disabled it is an
/// uninhabited type, so `HashMap::new()` is unusable and a hasher must be
/// supplied through `with_hasher`.
#[cfg(feature = "foldhash")]
pub type DefaultHashBuilder = foldhash::fast::RandomState;

/// The hasher builder used by [`HashMap`] when none is specified.
///
/// The `foldhash` feature is disabled, so this type is uninhabited and a
/// hasher must be supplied through `with_hasher`.
#[cfg(not(feature = "foldhash"))]
#[derive(Clone, Copy, Debug)]
pub enum DefaultHashBuilder {}
