extern crate std;
use alloc::string::{String, ToString};
use std::vec;

use super::super::locked::LockedMap;
use super::super::prelude::*;
use super::super::{LockedTypedMap, RcuTypedMap};

#[test]
fn test_default_config() {
    let config = MapConfig::default();
    assert_eq!(config.strategy, Strategy::Rcu);
    assert_eq!(config.shards, 32);
    assert_eq!(config.capacity, 0);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn test_config_validation() {
    let zero = MapConfig {
        shards: 0,
        ..MapConfig::default()
    };
    assert_eq!(zero.validate(), Err(ConfigError::ZeroShards));

    let odd = MapConfig {
        shards: 12,
        ..MapConfig::default()
    };
    assert_eq!(odd.validate(), Err(ConfigError::ShardsNotPowerOfTwo(12)));
    assert_eq!(
        ConfigError::ShardsNotPowerOfTwo(12).to_string(),
        "shard count must be a power of two, got 12"
    );
}

#[test]
fn test_builder_rejects_bad_shards() {
    let result = MapBuilder::<hashbrown::DefaultHashBuilder>::new()
        .with_strategy(Strategy::Rcu)
        .with_shards(3)
        .try_build::<i32, i32>();
    assert!(matches!(result, Err(ConfigError::ShardsNotPowerOfTwo(3))));

    // The locked strategy has a single shard and ignores the setting
    let locked = MapBuilder::<hashbrown::DefaultHashBuilder>::new()
        .with_strategy(Strategy::Locked)
        .with_shards(3)
        .try_build::<i32, i32>()
        .unwrap();
    assert_eq!(locked.strategy(), Strategy::Locked);
    assert_eq!(locked.shard_count(), 1);
}

#[test]
fn test_builder_pattern() {
    let map: AnyMap<String, i32> = MapBuilder::new()
        .with_strategy(Strategy::Rcu)
        .with_shards(16)
        .try_build()
        .unwrap();

    assert_eq!(map.strategy(), Strategy::Rcu);
    assert_eq!(map.shard_count(), 16);

    map.set("test".to_string(), 42);
    assert_eq!(map.view("test", |_, v| *v), Some(42));

    let locked: LockedMap<String, i32> = MapBuilder::new().with_capacity(100).build_locked();
    assert!(locked.is_empty());
}

#[test]
fn test_from_config() {
    let config = MapConfig {
        strategy: Strategy::Locked,
        shards: 8,
        capacity: 16,
    };
    let builder = MapBuilder::<hashbrown::DefaultHashBuilder>::from_config(config);
    assert_eq!(builder.config(), &config);

    let map = builder.try_build::<u64, u64>().unwrap();
    map.set(1, 1);
    assert_eq!(map.len(), Count::Exact(1));
}

/// Runs the same scenario against whatever strategy `map` uses.
fn scenario<M>(map: &M) -> usize
where
    M: ReadableMap<String, i32> + SnapshotMap<String, i32>,
{
    map.set("a".to_string(), 1);
    map.set("b".to_string(), 2);
    assert_eq!(map.len().get(), 2);

    let mut values = map.val_slice();
    values.sort();
    assert_eq!(values, vec![1, 2]);

    let (removed, remaining) = map.get_and_delete("a");
    assert_eq!(removed.as_deref(), Some(&1));
    assert_eq!(remaining.get(), 1);

    let owned = map.drain_to_owned();
    assert!(map.is_empty());
    owned.len()
}

#[test]
fn test_strategies_are_interchangeable() {
    let locked = AnyMap::from(LockedMap::<String, i32>::new());
    let rcu: AnyMap<String, i32> = MapBuilder::new().try_build().unwrap();

    assert_eq!(scenario(&locked), 1);
    assert_eq!(scenario(&rcu), 1);
    assert_eq!(scenario(&LockedTypedMap::<String, i32>::new().into_inner()), 1);
    assert_eq!(scenario(&*RcuTypedMap::<String, i32>::new()), 1);
}

#[test]
fn test_typed_handle_derefs_to_strategy() {
    let map: LockedTypedMap<&str, i32> = LockedTypedMap::new();
    map.set("a", 1);
    assert_eq!(map.get("a").as_deref(), Some(&1));
    assert_eq!(map.len(), Count::Exact(1));

    let map: RcuTypedMap<&str, i32> = RcuTypedMap::default();
    map.set("a", 1);
    assert_eq!(map.len(), Count::Approximate(1));
    map.clear();
    assert!(map.is_empty());
}
