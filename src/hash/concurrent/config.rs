use core::hash::{BuildHasher, Hash};

use hashbrown::DefaultHashBuilder;

use super::any_impl::AnyMap;
use super::error::ConfigError;
use super::locked::LockedMap;
use super::rcu::HamtMap;
use super::rcu_impl::DEFAULT_SHARDS;

/// Which backing store a map is built on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One table behind one lock: every operation is linearizable and counts
    /// are exact.
    Locked,
    /// Sharded persistent tries swapped with read-copy-update: lock-free reads,
    /// best-effort whole-map operations.
    #[default]
    Rcu,
}

/// Construction parameters for a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapConfig {
    pub strategy: Strategy,
    /// Number of RCU shards. Must be a non-zero power of two. Ignored by the
    /// locked strategy, which always has a single shard.
    pub shards: usize,
    /// Initial table capacity of the locked strategy. Persistent tries do not
    /// pre-allocate, so the RCU strategy ignores it.
    pub capacity: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            shards: DEFAULT_SHARDS,
            capacity: 0,
        }
    }
}

impl MapConfig {
    /// Check the shard count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        if !self.shards.is_power_of_two() {
            return Err(ConfigError::ShardsNotPowerOfTwo(self.shards));
        }
        Ok(())
    }
}

/// Builder for maps of either strategy.
pub struct MapBuilder<S = DefaultHashBuilder> {
    config: MapConfig,
    hash_builder: Option<S>,
}

impl<S> Default for MapBuilder<S>
where
    S: BuildHasher + Default + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MapBuilder<S>
where
    S: BuildHasher + Default + Send + Sync,
{
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(MapConfig::default())
    }

    /// Start from an existing configuration.
    pub fn from_config(config: MapConfig) -> Self {
        Self {
            config,
            hash_builder: None,
        }
    }

    /// Choose the backing strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set a custom hasher for the map.
    pub fn with_hasher(mut self, hasher: S) -> Self {
        self.hash_builder = Some(hasher);
        self
    }

    /// Set the number of RCU shards. Checked when the map is built.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Set the initial capacity of the locked table.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// The configuration collected so far.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Build a locked map, whatever strategy is configured.
    pub fn build_locked<K, V>(self) -> LockedMap<K, V, S>
    where
        K: Hash + Eq + Send + Sync,
        V: Send + Sync,
    {
        LockedMap::with_capacity_and_hasher(
            self.config.capacity,
            self.hash_builder.unwrap_or_default(),
        )
    }

    /// Build an RCU map, whatever strategy is configured.
    pub fn build_rcu<K, V>(self) -> Result<HamtMap<K, V, S>, ConfigError>
    where
        K: Hash + Eq + Send + Sync,
        V: Send + Sync,
    {
        self.validate()?;
        Ok(HamtMap::with_shards_and_hasher(
            self.config.shards,
            self.hash_builder.unwrap_or_default(),
        ))
    }

    /// Build a map of the configured strategy.
    pub fn try_build<K, V>(self) -> Result<AnyMap<K, V, S>, ConfigError>
    where
        K: Hash + Eq + Send + Sync,
        V: Send + Sync,
    {
        match self.config.strategy {
            Strategy::Locked => Ok(AnyMap::Locked(self.build_locked())),
            Strategy::Rcu => self.build_rcu().map(AnyMap::Rcu),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate().inspect_err(|err| {
            log::debug!("rejected map configuration {:?}: {}", self.config, err);
        })
    }
}
