// The operation contract both strategies share, checked through the traits
// only. Each check runs once per strategy.
use typed_syncmap::hash::concurrent::locked::LockedMap;
use typed_syncmap::hash::concurrent::prelude::*;
use typed_syncmap::hash::concurrent::rcu::HamtMap;

trait Contract:
    ReadableMap<String, i32>
    + ReadableInPlaceMap<String, i32>
    + MutableInPlaceMap<String, i32>
    + SnapshotMap<String, i32>
    + Default
{
}

impl<M> Contract for M where
    M: ReadableMap<String, i32>
        + ReadableInPlaceMap<String, i32>
        + MutableInPlaceMap<String, i32>
        + SnapshotMap<String, i32>
        + Default
{
}

fn fresh<M: Contract>() -> M {
    let _ = env_logger::try_init();
    M::default()
}

fn set_then_get<M: Contract>() {
    let map: M = fresh();
    for i in 0..100 {
        map.set(format!("k{}", i), i);
        assert_eq!(map.get(&format!("k{}", i)).as_deref(), Some(&i));
    }
}

fn absent_keys<M: Contract>() {
    let map: M = fresh();
    assert!(map.get("never").is_none());
    assert!(!map.contains_key("never"));

    map.set("gone".to_string(), 1);
    map.del("gone");
    assert!(map.get("gone").is_none());

    // Deleting twice is not an error
    map.del("gone");
    assert!(map.is_empty());
}

fn last_write_wins<M: Contract>() {
    let map: M = fresh();
    assert!(map.set("k".to_string(), 1).is_none());
    assert_eq!(map.set("k".to_string(), 2).as_deref(), Some(&1));
    assert_eq!(map.get("k").as_deref(), Some(&2));
    assert_eq!(map.len().get(), 1);
}

fn get_and_delete<M: Contract>() {
    let map: M = fresh();
    map.set("k".to_string(), 7);

    let (removed, remaining) = map.get_and_delete("k");
    assert_eq!(removed.as_deref(), Some(&7));
    assert_eq!(remaining.get(), 0);
    assert!(map.get("k").is_none());

    let (removed, remaining) = map.get_and_delete("k");
    assert!(removed.is_none());
    assert_eq!(remaining.get(), 0);
}

fn clear_then_len<M: Contract>() {
    let map: M = fresh();
    for i in 0..50 {
        map.set(i.to_string(), i);
    }
    map.clear();

    assert_eq!(map.len().get(), 0);
    for i in 0..50 {
        assert!(map.get(&i.to_string()).is_none());
    }
}

fn reset_then_fresh<M: Contract>() {
    let map: M = fresh();
    for i in 0..50 {
        map.set(i.to_string(), i);
    }
    let drained = map.drain_to_owned();

    map.set("after-drain".to_string(), -1);
    map.reset();

    assert!(map.is_empty());
    assert!(map.key_slice().is_empty());
    map.set("x".to_string(), 1);
    assert_eq!(map.len().get(), 1);

    assert_eq!(drained.len(), 50);
    assert_eq!(drained.get("10"), Some(&10));
    assert!(!drained.contains_key("after-drain"));
}

fn slices<M: Contract>() {
    let map: M = fresh();
    map.set("a".to_string(), 1);
    map.set("b".to_string(), 2);

    assert_eq!(map.len().get(), 2);

    let mut values = map.val_slice();
    values.sort();
    assert_eq!(values, vec![1, 2]);

    let mut keys = map.key_slice();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

fn update_once<M: Contract>() {
    let map: M = fresh();
    for i in 0..20 {
        map.set(i.to_string(), i);
    }

    let mut calls = 0;
    map.update(|entries| {
        calls += 1;
        entries.retain(|_, v| *v >= 10);
        entries.insert("extra".to_string(), 100);
    });

    assert_eq!(calls, 1);
    assert_eq!(map.len().get(), 11);
    assert!(map.get("5").is_none());
    assert_eq!(map.get("15").as_deref(), Some(&15));
    assert_eq!(map.get("extra").as_deref(), Some(&100));
}

fn alter_and_view<M: Contract>() {
    let map: M = fresh();
    map.set("n".to_string(), 1);

    assert_eq!(map.alter("n", |v| { *v += 1; *v }), Some(2));
    assert_eq!(map.alter("missing", |v| *v), None);

    map.alter_entry("fresh".to_string(), || 10, |v| *v *= 3);
    assert_eq!(map.view("fresh", |k, v| (k.len(), *v)), Some((5, 30)));
}

macro_rules! contract_tests {
    ($name:ident, $map:ty) => {
        mod $name {
            use super::*;

            #[test]
            fn set_then_get() {
                super::set_then_get::<$map>();
            }

            #[test]
            fn absent_keys() {
                super::absent_keys::<$map>();
            }

            #[test]
            fn last_write_wins() {
                super::last_write_wins::<$map>();
            }

            #[test]
            fn get_and_delete() {
                super::get_and_delete::<$map>();
            }

            #[test]
            fn clear_then_len() {
                super::clear_then_len::<$map>();
            }

            #[test]
            fn reset_then_fresh() {
                super::reset_then_fresh::<$map>();
            }

            #[test]
            fn slices() {
                super::slices::<$map>();
            }

            #[test]
            fn update_once() {
                super::update_once::<$map>();
            }

            #[test]
            fn alter_and_view() {
                super::alter_and_view::<$map>();
            }
        }
    };
}

contract_tests!(locked, LockedMap<String, i32>);
contract_tests!(rcu, HamtMap<String, i32>);
