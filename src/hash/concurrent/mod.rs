//! Concurrent typed maps.
//!
//! [`locked`] and [`rcu`] provide the two strategies. Both implement the
//! traits in [`prelude`], so code written against the traits works with
//! either. [`ConcurrentTypedMap`] fixes the strategy at compile time,
//! [`AnyMap`](prelude::AnyMap) at run time from a [`MapConfig`](prelude::MapConfig).
//!
//! # Consistency
//!
//! | operation | locked | rcu |
//! |---|---|---|
//! | get, set, del, get_and_delete, alter | linearizable | linearizable per key |
//! | len, remaining count of get_and_delete | exact | approximate |
//! | clear, reset, drain_to_owned | atomic | one shard at a time |
//! | val_slice, key_slice | one snapshot | one snapshot per shard |
//! | update | not atomic | not atomic |
use core::ops::Deref;

use crate::hash::concurrent::traits::TypedMap;

mod any_impl;
mod config;
mod error;
mod locked_impl;
mod rcu_impl;
mod traits;
mod wrapper;

#[cfg(test)]
mod tests;

pub mod locked {
    pub use super::locked_impl::*;
}

pub mod rcu {
    pub use super::rcu_impl::*;

    /// Alias naming the strategy rather than its data structure.
    pub type RcuMap<K, V, S = hashbrown::DefaultHashBuilder> = HamtMap<K, V, S>;
}

pub mod prelude {
    pub use super::any_impl::AnyMap;
    pub use super::config::{MapBuilder, MapConfig, Strategy};
    pub use super::error::ConfigError;
    pub use super::traits::*;
    pub use super::wrapper::{ConcurrentMap, MaybeArc};
}

pub type LockedTypedMap<K, V> = ConcurrentTypedMap<K, V, locked_impl::LockedMap<K, V>>;
pub type RcuTypedMap<K, V> = ConcurrentTypedMap<K, V, rcu_impl::HamtMap<K, V>>;

/// A map handle whose strategy is fixed by the type parameter `M`.
///
/// Switching strategies is a change of `M` only; every operation is reached
/// through the traits `M` implements.
pub struct ConcurrentTypedMap<K, V, M>
where
    M: TypedMap<K, V>,
{
    inner: M,
    _marker: core::marker::PhantomData<(K, V)>,
}

impl<K, V, M> ConcurrentTypedMap<K, V, M>
where
    M: TypedMap<K, V> + Default,
{
    /// Creates an empty map backed by a default `M`.
    pub fn new() -> Self {
        Self::from_inner(M::default())
    }
}

impl<K, V, M> ConcurrentTypedMap<K, V, M>
where
    M: TypedMap<K, V>,
{
    /// Wraps an already configured strategy.
    pub fn from_inner(inner: M) -> Self {
        Self {
            inner,
            _marker: core::marker::PhantomData,
        }
    }

    /// Unwraps the strategy.
    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<K, V, M> Default for ConcurrentTypedMap<K, V, M>
where
    M: TypedMap<K, V> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, M> Deref for ConcurrentTypedMap<K, V, M>
where
    M: TypedMap<K, V>,
{
    type Target = M;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
