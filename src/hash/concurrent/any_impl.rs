use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

use hashbrown::{DefaultHashBuilder, HashMap};

use crate::hash::concurrent::wrapper::MaybeArc;

use super::config::Strategy;
use super::locked::LockedMap;
use super::rcu::HamtMap;
use super::traits::{
    Count, MutableInPlaceMap, ReadableInPlaceMap, ReadableMap, SnapshotMap, TypedMap,
};

/// A map whose strategy is chosen at run time, usually from a
/// [`MapConfig`](super::config::MapConfig).
///
/// Every operation forwards to the selected strategy and keeps that
/// strategy's consistency guarantees.
pub enum AnyMap<K, V, S = DefaultHashBuilder> {
    Locked(LockedMap<K, V, S>),
    Rcu(HamtMap<K, V, S>),
}

macro_rules! dispatch {
    ($self:ident, $map:ident => $body:expr) => {
        match $self {
            AnyMap::Locked($map) => $body,
            AnyMap::Rcu($map) => $body,
        }
    };
}

impl<K, V, S> AnyMap<K, V, S> {
    /// The strategy this map was built with.
    pub fn strategy(&self) -> Strategy {
        match self {
            AnyMap::Locked(_) => Strategy::Locked,
            AnyMap::Rcu(_) => Strategy::Rcu,
        }
    }
}

impl<K, V, S> AnyMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Number of shards of the selected strategy; always 1 when locked.
    pub fn shard_count(&self) -> usize {
        dispatch!(self, map => map.shard_count())
    }
}

impl<K, V, S> From<LockedMap<K, V, S>> for AnyMap<K, V, S> {
    fn from(map: LockedMap<K, V, S>) -> Self {
        AnyMap::Locked(map)
    }
}

impl<K, V, S> From<HamtMap<K, V, S>> for AnyMap<K, V, S> {
    fn from(map: HamtMap<K, V, S>) -> Self {
        AnyMap::Rcu(map)
    }
}

impl<K, V, S> TypedMap<K, V> for AnyMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn set(&self, key: K, value: V) -> Option<MaybeArc<V>> {
        dispatch!(self, map => map.set(key, value))
    }

    fn del<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        dispatch!(self, map => map.del(key))
    }

    fn get_and_delete<Q>(&self, key: &Q) -> (Option<MaybeArc<V>>, Count)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        dispatch!(self, map => map.get_and_delete(key))
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        dispatch!(self, map => map.contains_key(key))
    }

    fn len(&self) -> Count {
        dispatch!(self, map => map.len())
    }

    fn is_empty(&self) -> bool {
        dispatch!(self, map => map.is_empty())
    }

    fn clear(&self) {
        dispatch!(self, map => map.clear())
    }

    fn reset(&self) {
        dispatch!(self, map => map.reset())
    }
}

impl<K, V, S> ReadableMap<K, V> for AnyMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn get<Q>(&self, key: &Q) -> Option<MaybeArc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        dispatch!(self, map => map.get(key))
    }
}

impl<K, V, S> ReadableInPlaceMap<K, V> for AnyMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn view<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnOnce(&K, &V) -> R,
    {
        dispatch!(self, map => map.view(key, f))
    }
}

impl<K, V, S> MutableInPlaceMap<K, V> for AnyMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn alter<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnMut(&mut V) -> R,
    {
        dispatch!(self, map => map.alter(key, f))
    }

    fn alter_entry<F, D>(&self, key: K, default: D, f: F)
    where
        F: FnMut(&mut V),
        D: FnMut() -> V,
    {
        dispatch!(self, map => map.alter_entry(key, default, f))
    }
}

impl<K, V, S> SnapshotMap<K, V> for AnyMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn val_slice(&self) -> Vec<V> {
        dispatch!(self, map => map.val_slice())
    }

    fn key_slice(&self) -> Vec<K> {
        dispatch!(self, map => map.key_slice())
    }

    fn drain_to_owned(&self) -> HashMap<K, V> {
        dispatch!(self, map => map.drain_to_owned())
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut HashMap<K, V>),
    {
        dispatch!(self, map => map.update(f))
    }
}
