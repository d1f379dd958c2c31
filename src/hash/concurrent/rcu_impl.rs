use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

use arc_swap::ArcSwap;
use crossbeam_utils::CachePadded;
use hashbrown::{DefaultHashBuilder, HashMap};
use rpds::{HashTrieMap, HashTrieMapSync};

use crate::hash::concurrent::wrapper::MaybeArc;

use super::traits::{
    Count, MutableInPlaceMap, ReadableInPlaceMap, ReadableMap, ShardStorage, SnapshotMap, TypedMap,
};
use super::wrapper::ConcurrentMap;

type Trie<K, V> = HashTrieMapSync<K, Arc<V>>;

/// Spin, doubling each step up to a cap, between failed CAS attempts.
#[inline]
fn backoff(step: &mut usize) {
    (0..1usize << *step).for_each(|_| core::hint::spin_loop());
    if *step < 10 {
        *step += 1;
    }
}

/// What a copy-on-write step decided after looking at the current trie.
enum Step<K, V, R> {
    /// Publish the new trie and return `R` if nobody else published first.
    Commit(Trie<K, V>, R),
    /// Nothing to write; return `R` as is.
    Skip(R),
}

/// A single shard of the RCU hash table: a persistent trie behind a
/// swappable pointer.
pub struct RcuShard<K, V> {
    pub(crate) table: ArcSwap<Trie<K, V>>,
}

impl<K, V> Default for RcuShard<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            table: ArcSwap::from_pointee(HashTrieMap::new_sync()),
        }
    }
}

impl<K, V> RcuShard<K, V>
where
    K: Eq + Hash,
{
    /// Apply `step` to the current trie until its result is published.
    ///
    /// `step` reruns whenever another writer swapped the shard in between.
    fn commit<R, F>(&self, mut step: F) -> R
    where
        F: FnMut(&Trie<K, V>) -> Step<K, V, R>,
    {
        let mut backoff_step = 0;
        loop {
            let current = self.table.load();
            match step(&current) {
                Step::Skip(ret) => return ret,
                Step::Commit(next, ret) => {
                    let prev = self.table.compare_and_swap(&current, Arc::new(next));
                    if Arc::ptr_eq(&current, &prev) {
                        return ret;
                    }
                    backoff(&mut backoff_step);
                }
            }
        }
    }

    /// Swap in an empty trie and hand back the one it replaced.
    fn take(&self) -> Arc<Trie<K, V>> {
        self.table.swap(Arc::new(HashTrieMap::new_sync()))
    }
}

/// Storage for the RCU strategy: a power-of-two number of shards.
///
/// Reads never take a lock; a writer copies the path to its key inside one
/// shard and publishes it with a compare-and-swap.
pub struct RcuStorage<K, V> {
    shards: Box<[CachePadded<RcuShard<K, V>>]>,
}

// Default number of shards. Must be a power of two.
pub(crate) const DEFAULT_SHARDS: usize = 32;

impl<K, V> RcuStorage<K, V>
where
    K: Eq + Hash,
{
    /// Create new RCU storage with the specified number of shards.
    ///
    /// # Panics
    /// Panics if `shards` is not a power of two
    pub fn with_shards(shards: usize) -> Self {
        assert!(
            shards.is_power_of_two(),
            "Number of shards must be a power of two"
        );
        let shards: Vec<_> = (0..shards)
            .map(|_| CachePadded::new(RcuShard::default()))
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
        }
    }
}

impl<K, V> Default for RcuStorage<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }
}

impl<K, V> ShardStorage<K, V> for RcuStorage<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    type Shard = RcuShard<K, V>;

    fn shards(&self) -> &[CachePadded<Self::Shard>] {
        &self.shards
    }
}

/// A concurrent map built from per-shard persistent hash tries (HAMT).
///
/// Single-key operations are linearizable per shard, hence per key, but not
/// across keys. There is no maintained entry counter: [`TypedMap::len`]
/// walks the shards and is [`Count::Approximate`]. `clear`, `reset`,
/// `val_slice`, `key_slice` and `drain_to_owned` handle one shard at a time,
/// so a concurrent writer may land in a shard that was already visited.
pub type HamtMap<K, V, S = DefaultHashBuilder> = ConcurrentMap<K, V, S, RcuStorage<K, V>>;

impl<K, V, S> HamtMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Default + Send + Sync,
{
    /// Create a new RCU map with the default number of shards.
    pub fn new() -> Self {
        Self::with_shards_and_hasher(DEFAULT_SHARDS, Default::default())
    }
}

impl<K, V, S> HamtMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Create a new RCU map with custom settings.
    ///
    /// # Panics
    /// Panics if `shards` is not a power of two
    pub fn with_shards_and_hasher(shards: usize, hash_builder: S) -> Self {
        let storage = RcuStorage::with_shards(shards);
        ConcurrentMap::with_storage_and_hasher(storage, hash_builder)
    }

    /// Swap every shard to an empty trie, returning the retired tries.
    fn take_all(&self) -> Vec<Arc<Trie<K, V>>> {
        self.storage.shards.iter().map(|shard| shard.take()).collect()
    }
}

impl<K, V, S> Default for HamtMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Default + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> TypedMap<K, V> for HamtMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn set(&self, key: K, value: V) -> Option<MaybeArc<V>> {
        let value = Arc::new(value);
        self.shard_for_key(&key)
            .commit(|trie| {
                let prev = trie.get(&key).cloned();
                Step::Commit(trie.insert(key.clone(), Arc::clone(&value)), prev)
            })
            .map(MaybeArc::Shared)
    }

    fn del<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.shard_for_key(key).commit(|trie| {
            if trie.contains_key(key) {
                Step::Commit(trie.remove(key), ())
            } else {
                Step::Skip(())
            }
        })
    }

    /// The removal is atomic for the key. The remaining count is taken by a
    /// separate walk over the shards after the removal has been published,
    /// so it is [`Count::Approximate`]: it reflects some moment no earlier
    /// than the removal.
    fn get_and_delete<Q>(&self, key: &Q) -> (Option<MaybeArc<V>>, Count)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let removed = self.shard_for_key(key).commit(|trie| match trie.get(key) {
            Some(value) => Step::Commit(trie.remove(key), Some(Arc::clone(value))),
            None => Step::Skip(None),
        });
        (removed.map(MaybeArc::Shared), self.len())
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.shard_for_key(key).table.load().contains_key(key)
    }

    /// Sums the shard sizes one shard at a time. Under concurrent mutation
    /// the total may combine shards observed at different instants.
    fn len(&self) -> Count {
        let total: usize = self
            .storage
            .shards
            .iter()
            .map(|shard| shard.table.load().size())
            .sum();
        Count::Approximate(total)
    }

    fn is_empty(&self) -> bool {
        self.storage
            .shards
            .iter()
            .all(|shard| shard.table.load().is_empty())
    }

    /// Empties one shard at a time. A set that lands in a shard after it was
    /// emptied survives the clear.
    fn clear(&self) {
        let cleared: usize = self.take_all().iter().map(|trie| trie.size()).sum();
        log::trace!("cleared {} entries from rcu map", cleared);
    }

    /// Installs a fresh root in every shard. A persistent trie keeps no spare
    /// capacity, so this releases the same memory as [`clear`](TypedMap::clear)
    /// once in-flight readers of the old roots are done.
    fn reset(&self) {
        let retired = self.take_all();
        log::trace!("reset rcu map, retiring {} shard roots", retired.len());
    }
}

impl<K, V, S> ReadableMap<K, V> for HamtMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Lock-free; the value is shared with the trie, not copied.
    fn get<Q>(&self, key: &Q) -> Option<MaybeArc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let trie = self.shard_for_key(key).table.load();
        trie.get(key).map(Arc::clone).map(MaybeArc::Shared)
    }
}

impl<K, V, S> ReadableInPlaceMap<K, V> for HamtMap<K, V, S>
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
        let trie = self.shard_for_key(key).table.load_full();
        trie.get_key_value(key).map(|(k, v)| f(k, v.as_ref()))
    }
}

impl<K, V, S> MutableInPlaceMap<K, V> for HamtMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Clones the value, applies `f` to the clone and publishes it with a
    /// compare-and-swap, rerunning `f` on a fresh clone if the shard changed.
    fn alter<Q, F, R>(&self, key: &Q, mut f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnMut(&mut V) -> R,
    {
        self.shard_for_key(key).commit(|trie| match trie.get_key_value(key) {
            Some((k, v)) => {
                let mut value = V::clone(v);
                let ret = f(&mut value);
                Step::Commit(trie.insert(k.clone(), Arc::new(value)), Some(ret))
            }
            None => Step::Skip(None),
        })
    }

    fn alter_entry<F, D>(&self, key: K, mut default: D, mut f: F)
    where
        F: FnMut(&mut V),
        D: FnMut() -> V,
    {
        self.shard_for_key(&key).commit(|trie| {
            let mut value = match trie.get(&key) {
                Some(v) => V::clone(v),
                None => default(),
            };
            f(&mut value);
            Step::Commit(trie.insert(key.clone(), Arc::new(value)), ())
        })
    }
}

impl<K, V, S> SnapshotMap<K, V> for HamtMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// One snapshot per shard; not a single point in time across shards.
    fn val_slice(&self) -> Vec<V> {
        let mut values = Vec::new();
        for shard in self.storage.shards.iter() {
            let trie = shard.table.load();
            values.extend(trie.values().map(|v| V::clone(v)));
        }
        values
    }

    /// One snapshot per shard; not a single point in time across shards.
    fn key_slice(&self) -> Vec<K> {
        let mut keys = Vec::new();
        for shard in self.storage.shards.iter() {
            let trie = shard.table.load();
            keys.extend(trie.keys().cloned());
        }
        keys
    }

    /// Retires the shards one at a time and clones their entries out. Shares
    /// the caveat of [`clear`](TypedMap::clear): a concurrent set may land in
    /// a shard that was already drained and stay in the live map.
    fn drain_to_owned(&self) -> HashMap<K, V> {
        let retired = self.take_all();
        let mut owned = HashMap::with_capacity(retired.iter().map(|trie| trie.size()).sum());
        for trie in &retired {
            owned.extend(trie.iter().map(|(k, v)| (k.clone(), V::clone(v))));
        }
        log::trace!("drained {} entries out of rcu map", owned.len());
        owned
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut HashMap<K, V>),
    {
        let mut owned = HashMap::new();
        for shard in self.storage.shards.iter() {
            let trie = shard.table.load();
            owned.extend(trie.iter().map(|(k, v)| (k.clone(), V::clone(v))));
        }

        f(&mut owned);

        let mut fresh: Vec<Trie<K, V>> = (0..self.storage.shards.len())
            .map(|_| HashTrieMap::new_sync())
            .collect();
        let written = owned.len();
        for (key, value) in owned {
            let index = self.storage.shard_index(self.hash_key(&key));
            fresh[index].insert_mut(key, Arc::new(value));
        }
        for (shard, trie) in self.storage.shards.iter().zip(fresh) {
            shard.table.store(Arc::new(trie));
        }
        log::trace!("updated rcu map, wrote back {} entries", written);
    }
}
