//! Typed concurrent key-value maps.
//!
//! Two interchangeable strategies share one trait family:
//!
//! - [`LockedMap`](hash::concurrent::locked::LockedMap): one hash table behind
//!   one read-write lock. Every operation is linearizable map-wide and counts
//!   are exact.
//! - [`HamtMap`](hash::concurrent::rcu::HamtMap): shards of persistent hash
//!   tries swapped with read-copy-update. Reads never block; whole-map
//!   operations are best-effort under concurrent mutation.
//!
//! # Examples
//!
//! ```
//! use typed_syncmap::hash::concurrent::{prelude::*, LockedTypedMap};
//!
//! let map: LockedTypedMap<&str, i32> = LockedTypedMap::new();
//! map.set("a", 1);
//! map.set("b", 2);
//!
//! assert_eq!(map.get("a").as_deref(), Some(&1));
//! assert_eq!(map.len().get(), 2);
//!
//! let (removed, remaining) = map.get_and_delete("a");
//! assert_eq!(removed.as_deref(), Some(&1));
//! assert_eq!(remaining, Count::Exact(1));
//! ```
#![no_std]

extern crate alloc;

pub mod hash;
