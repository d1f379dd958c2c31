use core::fmt::{Debug, Display};
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use core::ops::Deref;

use alloc::sync::Arc;
use crossbeam_utils::CachePadded;
use hashbrown::DefaultHashBuilder;

use super::traits::ShardStorage;

/// A value read out of a map: either a private copy or a handle shared with
/// the map's backing store.
///
/// The locked strategy clones values out from under its lock and hands back
/// `Owned`. The RCU strategy keeps values behind `Arc` and hands back
/// `Shared` without copying; the value stays valid after the entry is
/// overwritten or the map is reset.
pub enum MaybeArc<T> {
    Owned(T),
    Shared(Arc<T>),
}

impl<T> MaybeArc<T> {
    /// Check if the value is a private copy.
    pub fn is_owned(&self) -> bool {
        matches!(self, MaybeArc::Owned(_))
    }

    /// Check if the value is shared with the map.
    pub fn is_shared(&self) -> bool {
        matches!(self, MaybeArc::Shared(_))
    }

    /// Take the value out, cloning it only if it is still shared elsewhere.
    pub fn into_owned(self) -> T
    where
        T: Clone,
    {
        match self {
            MaybeArc::Owned(value) => value,
            MaybeArc::Shared(arc) => Arc::try_unwrap(arc).unwrap_or_else(|arc| (*arc).clone()),
        }
    }
}

impl<T> Deref for MaybeArc<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            MaybeArc::Owned(value) => value,
            MaybeArc::Shared(arc) => arc.deref(),
        }
    }
}

impl<T> AsRef<T> for MaybeArc<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T: Clone> Clone for MaybeArc<T> {
    fn clone(&self) -> Self {
        match self {
            MaybeArc::Owned(value) => MaybeArc::Owned(value.clone()),
            MaybeArc::Shared(arc) => MaybeArc::Shared(Arc::clone(arc)),
        }
    }
}

impl<T: Display> Display for MaybeArc<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self.deref(), f)
    }
}

impl<T: Debug> Debug for MaybeArc<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MaybeArc::Owned(value) => write!(f, "MaybeArc::Owned({:?})", value),
            MaybeArc::Shared(arc) => write!(f, "MaybeArc::Shared({:?})", arc),
        }
    }
}

// Compares the values, not where they live.
impl<T: PartialEq> PartialEq for MaybeArc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deref() == other.deref()
    }
}

/// The state shared by both strategies: a shard storage and the hasher that
/// routes keys to shards.
///
/// # Type Parameters
/// * `K` - The key type
/// * `V` - The value type
/// * `S` - The hash builder type
/// * `Storage` - The shard storage implementation
pub struct ConcurrentMap<K, V, S = DefaultHashBuilder, Storage = ()> {
    pub(crate) storage: Storage,
    pub(crate) hash_builder: S,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, S, Storage> ConcurrentMap<K, V, S, Storage>
where
    K: Eq + Hash,
    S: BuildHasher,
    Storage: ShardStorage<K, V>,
{
    /// Create a new concurrent map with the given storage and hash builder.
    pub fn with_storage_and_hasher(storage: Storage, hash_builder: S) -> Self {
        Self {
            storage,
            hash_builder,
            _marker: PhantomData,
        }
    }

    /// Compute the hash of a key using the configured hash builder.
    #[inline]
    pub fn hash_key<Q: ?Sized + Hash>(&self, key: &Q) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Get the shard that should contain the given key.
    #[inline]
    pub fn shard_for_key<Q: ?Sized + Hash>(&self, key: &Q) -> &CachePadded<Storage::Shard> {
        let hash = self.hash_key(key);
        self.storage.shard_for_hash(hash)
    }

    /// Get the total number of shards in the map.
    pub fn shard_count(&self) -> usize {
        self.storage.shard_count()
    }
}
