use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

use alloc::vec::Vec;
use crossbeam_utils::CachePadded;
use hashbrown::hash_table::{Entry, HashTable};
use hashbrown::{DefaultHashBuilder, HashMap};
use spin::RwLock;

use crate::hash::concurrent::wrapper::MaybeArc;

use super::traits::{
    Count, MutableInPlaceMap, ReadableInPlaceMap, ReadableMap, ShardStorage, SnapshotMap, TypedMap,
};
use super::wrapper::ConcurrentMap;

/// The one shard of the locked strategy: a hash table behind a read-write
/// lock.
pub struct LockedShard<K, V> {
    pub(crate) table: RwLock<HashTable<(K, V)>>,
}

impl<K, V> LockedShard<K, V> {
    /// Create a new shard with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: RwLock::new(HashTable::with_capacity(capacity)),
        }
    }
}

impl<K, V> Default for LockedShard<K, V> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

/// Storage for the locked strategy.
///
/// Holds exactly one shard, so a single lock serializes every writer and
/// every operation is linearizable map-wide.
pub struct LockedStorage<K, V> {
    shard: [CachePadded<LockedShard<K, V>>; 1],
}

impl<K, V> LockedStorage<K, V> {
    /// Create new locked storage with the given initial table capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shard: [CachePadded::new(LockedShard::with_capacity(capacity))],
        }
    }
}

impl<K, V> Default for LockedStorage<K, V> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K, V> ShardStorage<K, V> for LockedStorage<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
    type Shard = LockedShard<K, V>;

    fn shards(&self) -> &[CachePadded<Self::Shard>] {
        &self.shard
    }

    #[inline]
    fn shard_index(&self, _hash: u64) -> usize {
        0
    }
}

/// A concurrent map whose entries live in one table behind one lock.
///
/// Readers share the lock, writers take it exclusively. Counts are exact and
/// `clear`, `drain_to_owned`, `val_slice` and `key_slice` each observe or
/// change the map at a single instant. [`SnapshotMap::update`] is the one
/// whole-map operation that is not atomic here either.
pub type LockedMap<K, V, S = DefaultHashBuilder> = ConcurrentMap<K, V, S, LockedStorage<K, V>>;

impl<K, V, S> LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Default + Send + Sync,
{
    /// Create a new, empty locked map.
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, Default::default())
    }
}

impl<K, V, S> LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Create a new locked map with a pre-sized table and a custom hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let storage = LockedStorage::with_capacity(capacity);
        ConcurrentMap::with_storage_and_hasher(storage, hash_builder)
    }

    #[inline]
    fn table(&self) -> &RwLock<HashTable<(K, V)>> {
        &self.storage.shard[0].table
    }

    /// Rebuild a table from plain entries without taking the lock.
    fn table_from_entries<I>(&self, entries: I) -> HashTable<(K, V)>
    where
        I: ExactSizeIterator<Item = (K, V)>,
    {
        let mut table = HashTable::with_capacity(entries.len());
        for (key, value) in entries {
            let hash = self.hash_key(&key);
            table.insert_unique(hash, (key, value), |(k, _)| self.hash_key(k));
        }
        table
    }

    /// Remove and return the entire entry associated with the key.
    pub fn remove_entry<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let hash = self.hash_key(key);
        let mut table = self.table().write();
        table
            .find_entry(hash, |(k, _)| k.borrow() == key)
            .ok()
            .map(|entry| entry.remove().0)
    }
}

impl<K, V, S> Default for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Default + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> TypedMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn set(&self, key: K, value: V) -> Option<MaybeArc<V>> {
        let hash = self.hash_key(&key);
        let mut table = self.table().write();

        let entry = table.entry(hash, |(k, _)| k == &key, |(k, _)| self.hash_key(k));

        match entry {
            Entry::Occupied(mut occ) => Some(MaybeArc::Owned(core::mem::replace(
                &mut occ.get_mut().1,
                value,
            ))),
            Entry::Vacant(vac) => {
                vac.insert((key, value));
                None
            }
        }
    }

    fn del<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        // Drop the removed entry after the lock is released.
        let _removed = self.remove_entry(key);
    }

    /// Removes the entry and counts the rest in one critical section, so the
    /// count is always [`Count::Exact`].
    fn get_and_delete<Q>(&self, key: &Q) -> (Option<MaybeArc<V>>, Count)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let hash = self.hash_key(key);
        let mut table = self.table().write();
        let removed = table
            .find_entry(hash, |(k, _)| k.borrow() == key)
            .ok()
            .map(|entry| MaybeArc::Owned((entry.remove().0).1));
        (removed, Count::Exact(table.len()))
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let hash = self.hash_key(key);
        let table = self.table().read();
        table.find(hash, |(k, _)| k.borrow() == key).is_some()
    }

    fn len(&self) -> Count {
        Count::Exact(self.table().read().len())
    }

    fn is_empty(&self) -> bool {
        self.table().read().is_empty()
    }

    /// Atomic. The table keeps its allocation for reuse; see
    /// [`reset`](TypedMap::reset) to release it.
    fn clear(&self) {
        let mut table = self.table().write();
        log::trace!("clearing locked map of {} entries", table.len());
        table.clear();
    }

    /// Swaps in an empty table under the lock. The old table, and the entries
    /// in it, are dropped after the lock is released.
    fn reset(&self) {
        let stale = core::mem::replace(&mut *self.table().write(), HashTable::new());
        log::trace!(
            "reset locked map, releasing {} entries and {} slots",
            stale.len(),
            stale.capacity()
        );
    }
}

impl<K, V, S> ReadableMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync + Clone,
    S: BuildHasher + Send + Sync,
{
    fn get<Q>(&self, key: &Q) -> Option<MaybeArc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.view(key, |_, v| MaybeArc::Owned(v.clone()))
    }
}

impl<K, V, S> ReadableInPlaceMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// The closure `f` runs under the read lock and should complete quickly
    /// without touching this map.
    fn view<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnOnce(&K, &V) -> R,
    {
        let hash = self.hash_key(key);
        let table = self.table().read();

        table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| f(k, v))
    }
}

impl<K, V, S> MutableInPlaceMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Runs `f` exactly once, under the write lock.
    fn alter<Q, F, R>(&self, key: &Q, mut f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnMut(&mut V) -> R,
    {
        let hash = self.hash_key(key);
        let mut table = self.table().write();

        table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| f(v))
    }

    fn alter_entry<F, D>(&self, key: K, mut default: D, mut f: F)
    where
        F: FnMut(&mut V),
        D: FnMut() -> V,
    {
        let hash = self.hash_key(&key);
        let mut table = self.table().write();

        let entry = table.entry(hash, |(k, _)| k == &key, |(k, _)| self.hash_key(k));

        match entry {
            Entry::Occupied(mut occ) => {
                f(&mut occ.get_mut().1);
            }
            Entry::Vacant(vac) => {
                let mut value = default();
                f(&mut value);
                vac.insert((key, value));
            }
        }
    }
}

impl<K, V, S> SnapshotMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// A consistent snapshot taken under the read lock.
    fn val_slice(&self) -> Vec<V> {
        let table = self.table().read();
        table.iter().map(|(_, v)| v.clone()).collect()
    }

    /// A consistent snapshot taken under the read lock.
    fn key_slice(&self) -> Vec<K> {
        let table = self.table().read();
        table.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Atomic: the table is swapped out in one critical section and its
    /// entries are moved, not cloned, into the returned map.
    fn drain_to_owned(&self) -> HashMap<K, V> {
        let drained = core::mem::replace(&mut *self.table().write(), HashTable::new());
        log::trace!("drained {} entries out of locked map", drained.len());
        drained.into_iter().collect()
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut HashMap<K, V>),
    {
        let mut owned: HashMap<K, V> = {
            let table = self.table().read();
            table.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        f(&mut owned);

        let fresh = self.table_from_entries(owned.into_iter());
        let stale = core::mem::replace(&mut *self.table().write(), fresh);
        log::trace!("updated locked map, replaced {} entries", stale.len());
    }
}
