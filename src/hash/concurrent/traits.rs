use core::borrow::Borrow;
use core::hash::Hash;

use crossbeam_utils::CachePadded;
use hashbrown::HashMap;

use crate::hash::concurrent::wrapper::MaybeArc;

/// A trait defining the interface for shard storage in concurrent hash maps.
///
/// The locked strategy exposes a single shard so that one lock covers the
/// whole map; the RCU strategy spreads keys over a power-of-two number of
/// shards.
pub trait ShardStorage<K, V>: Send + Sync {
    /// The type of the individual shard
    type Shard;

    /// All shards, in index order.
    fn shards(&self) -> &[CachePadded<Self::Shard>];

    /// Index of the shard that owns the given hash value.
    fn shard_index(&self, hash: u64) -> usize {
        hash as usize & (self.shards().len() - 1)
    }

    /// Get the shard that should contain the given hash value
    fn shard_for_hash(&self, hash: u64) -> &CachePadded<Self::Shard> {
        &self.shards()[self.shard_index(hash)]
    }

    /// Get the total number of shards
    fn shard_count(&self) -> usize {
        self.shards().len()
    }
}

/// The result of a counting operation, tagged with the consistency the
/// strategy could provide for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Count {
    /// Taken at a single instant, inside the same critical section as the
    /// operation that produced it.
    Exact(usize),
    /// Taken by a traversal that may interleave with concurrent mutation. The
    /// value may mix states from different instants of the traversal.
    Approximate(usize),
}

impl Count {
    /// The counted number of entries, regardless of consistency.
    #[inline]
    pub fn get(self) -> usize {
        match self {
            Count::Exact(n) | Count::Approximate(n) => n,
        }
    }

    /// Whether the count reflects a single instant.
    #[inline]
    pub fn is_exact(self) -> bool {
        matches!(self, Count::Exact(_))
    }
}

/// The single-key and whole-map operations every strategy provides.
///
/// Single-key operations (`set`, `del`, `get_and_delete`, `contains_key`) are
/// linearizable per key. Whether whole-map operations are linearizable
/// depends on the strategy and is documented on each implementation.
pub trait TypedMap<K, V>: Send + Sync {
    /// Insert or overwrite the entry for `key`.
    ///
    /// Concurrent sets on the same key are serialized; the last one to
    /// complete wins.
    ///
    /// # Returns
    /// The value that was replaced, if any
    fn set(&self, key: K, value: V) -> Option<MaybeArc<V>>;

    /// Remove the entry for `key`. Removing an absent key is a no-op.
    fn del<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash;

    /// Read and remove the entry for `key` as one indivisible step.
    ///
    /// # Returns
    /// The removed value, if the key existed, and the number of entries left
    /// in the map after the removal. The count is [`Count::Exact`] when the
    /// strategy can take it in the same critical section as the removal, and
    /// [`Count::Approximate`] otherwise.
    fn get_and_delete<Q>(&self, key: &Q) -> (Option<MaybeArc<V>>, Count)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash;

    /// Check if a key exists in the map.
    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash;

    /// Number of entries in the map.
    ///
    /// The returned variant tells whether the strategy could take the count
    /// atomically. An approximate count is a known weak-consistency result,
    /// not an error.
    fn len(&self) -> Count;

    /// Check if the map is empty. Follows the consistency of [`len`](Self::len).
    fn is_empty(&self) -> bool;

    /// Remove every entry, keeping the map's lock and shard structure.
    fn clear(&self);

    /// Discard the backing store and install a fresh, empty one.
    ///
    /// Operations already in flight against the old store finish against it.
    /// Owned maps produced earlier by [`SnapshotMap::drain_to_owned`] are
    /// unaffected.
    fn reset(&self);
}

/// A trait for get immutable reference on concurrent hash maps.
pub trait ReadableMap<K, V>: TypedMap<K, V> {
    /// Get a value from the hash map.
    ///
    /// # Returns
    /// The value, owned or shared depending on the strategy, if the key exists
    fn get<Q>(&self, key: &Q) -> Option<MaybeArc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash;
}

/// A trait for read-only view operations on concurrent hash maps.
pub trait ReadableInPlaceMap<K, V>: TypedMap<K, V> {
    /// Run `f` on the entry for `key` without cloning it.
    ///
    /// # Returns
    /// The result of the closure if the key exists, None otherwise
    fn view<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnOnce(&K, &V) -> R;
}

/// Atomic read-modify-write of single entries.
///
/// Strategies without locks apply the closures optimistically and retry when
/// another writer got in first, so both closures may run more than once. Only
/// the run that commits is visible.
pub trait MutableInPlaceMap<K, V>: TypedMap<K, V> {
    /// Modify an existing entry in place.
    ///
    /// # Returns
    /// The result of the closure if the key exists, None otherwise
    fn alter<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnMut(&mut V) -> R;

    /// Modify an entry if it exists, or insert `default()` and then modify it.
    fn alter_entry<F, D>(&self, key: K, default: D, f: F)
    where
        F: FnMut(&mut V),
        D: FnMut() -> V;
}

/// Whole-map copies in and out of a plain, unsynchronized [`HashMap`].
///
/// None of these operations is linearizable with concurrent single-key
/// operations on every strategy; see the implementations for what each one
/// guarantees.
pub trait SnapshotMap<K, V>: TypedMap<K, V>
where
    K: Clone,
    V: Clone,
{
    /// An independent copy of every value. Order is unspecified and may
    /// differ between calls.
    fn val_slice(&self) -> alloc::vec::Vec<V>;

    /// An independent copy of every key. Order is unspecified and may differ
    /// between calls.
    fn key_slice(&self) -> alloc::vec::Vec<K>;

    /// Move every entry into a plain map owned by the caller and reset the
    /// live map.
    fn drain_to_owned(&self) -> HashMap<K, V>;

    /// Copy the content out, let `f` edit it, then replace the content with
    /// the edited copy.
    ///
    /// This is three separate phases and is NOT atomic: sets and deletes that
    /// land between the copy-out and the copy-back are overwritten or lost.
    /// Use it for coarse bulk edits only, never for read-modify-write; see
    /// [`MutableInPlaceMap`] for that. `f` is called exactly once and never
    /// while the map holds a lock, so it may call back into the map.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut HashMap<K, V>);
}
