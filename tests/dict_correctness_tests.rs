use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use zkit::{
    database::dict::murmur2, Dict, DictConfig, DictError, DictType, HashDictType, MurmurDictType,
    Replaced, ResizePolicy,
};

type StrDict = Dict<MurmurDictType<String, u32>>;

fn str_dict() -> StrDict {
    Dict::new(MurmurDictType::default())
}

fn finish_rehash<T: DictType>(d: &mut Dict<T>) {
    while d.rehash(64) {}
}

/// Тип словаря, записывающий освобождённые значения во внешний журнал.
struct TrackingType {
    freed: Rc<RefCell<Vec<String>>>,
}

impl DictType for TrackingType {
    type Key = String;
    type Value = String;

    fn hash(
        &self,
        key: &String,
    ) -> u32 {
        murmur2(key.as_bytes(), 5381)
    }

    fn key_eq(
        &self,
        a: &String,
        b: &String,
    ) -> bool {
        a == b
    }

    fn destroy_val(
        &self,
        val: String,
    ) {
        self.freed.borrow_mut().push(val);
    }
}

#[test]
fn test_twenty_inserts_all_findable() {
    let mut d = str_dict();
    for i in 0..20 {
        d.add(format!("key{i}"), i).unwrap();
    }

    assert_eq!(d.len(), 20);
    for i in 0..20 {
        let entry = d.find(&format!("key{i}")).unwrap();
        assert_eq!(*entry.value(), i);
    }

    finish_rehash(&mut d);
    let capacity = d.capacity();
    assert!(capacity.is_power_of_two());
    assert!(capacity >= 20);
    assert!(d.validate_invariants().is_ok());
}

#[test]
fn test_add_then_replace_then_remove() {
    let mut d = str_dict();

    assert!(d.add("k".into(), 1).is_ok());
    assert_eq!(d.add("k".into(), 2), Err(DictError::KeyExists));
    assert_eq!(d.replace("k".into(), 3), Ok(Replaced::Updated));
    assert_eq!(d.replace("n".into(), 4), Ok(Replaced::Inserted));
    assert_eq!(d.get(&"k".to_string()), Some(&3));

    assert!(d.remove(&"k".to_string()));
    assert!(!d.remove(&"k".to_string()));
    assert!(d.find(&"k".to_string()).is_none());
    assert_eq!(d.len(), 1);
}

#[test]
fn test_lookups_transparent_during_rehash() {
    let mut d = str_dict();
    for i in 0..1000 {
        d.add(format!("key{i}"), i).unwrap();
        if d.is_rehashing() {
            for j in 0..=i {
                assert!(d.contains_key(&format!("key{j}")), "lost key{j} at insert {i}");
            }
            break;
        }
    }

    // Удаления и поиск посреди рехеширования.
    let mut d = str_dict();
    for i in 0..64 {
        d.add(format!("key{i}"), i).unwrap();
    }
    finish_rehash(&mut d);
    d.expand(1024).unwrap();
    assert!(d.is_rehashing());
    for i in (0..64).step_by(2) {
        assert!(d.remove(&format!("key{i}")));
    }
    for i in 0..64 {
        assert_eq!(d.get(&format!("key{i}")).is_some(), i % 2 == 1);
    }
    assert!(d.validate_invariants().is_ok());
}

#[test]
fn test_rehash_migrates_everything() {
    let mut d = str_dict();
    for i in 0..100 {
        d.add(format!("key{i}"), i).unwrap();
    }
    finish_rehash(&mut d);
    let before = d.capacity();

    d.expand(before * 4).unwrap();
    assert!(d.is_rehashing());
    assert_eq!(d.table_sizes(), [before, before * 4]);

    let mut steps = 0;
    while d.rehash(1) {
        steps += 1;
        assert!(d.validate_invariants().is_ok());
    }
    assert!(steps > 0);
    assert_eq!(d.table_sizes(), [before * 4, 0]);
    assert_eq!(d.rehash_index(), None);
    assert_eq!(d.len(), 100);
}

#[test]
fn test_expand_on_empty_dict_allocates_directly() {
    let mut d = str_dict();
    d.expand(100).unwrap();
    assert_eq!(d.table_sizes(), [128, 0]);
    assert!(!d.is_rehashing());
}

#[test]
fn test_expand_errors_do_not_mutate() {
    let mut d = str_dict();
    for i in 0..10 {
        d.add(format!("key{i}"), i).unwrap();
    }
    finish_rehash(&mut d);
    let sizes = d.table_sizes();
    let fp = d.fingerprint();

    assert!(matches!(
        d.expand(5),
        Err(DictError::SizeBelowUsed {
            requested: 5,
            used: 10
        })
    ));
    assert_eq!(d.table_sizes(), sizes);
    assert_eq!(d.fingerprint(), fp);

    d.expand(64).unwrap();
    let fp = d.fingerprint();
    assert_eq!(d.expand(128), Err(DictError::Rehashing));
    assert_eq!(d.fingerprint(), fp);
}

#[test]
fn test_custom_initial_size() {
    let config = DictConfig {
        initial_size: 64,
        ..Default::default()
    };
    let mut d = Dict::with_config(MurmurDictType::<String, u32>::default(), config);
    d.add("a".into(), 1).unwrap();
    assert_eq!(d.table_sizes(), [64, 0]);
    assert_eq!(d.config().initial_size, 64);
}

#[test]
fn test_resize_policy_switch() {
    let mut d = str_dict();
    d.set_resize_policy(ResizePolicy::Avoid);
    assert_eq!(d.resize_policy(), ResizePolicy::Avoid);

    for i in 0..20 {
        d.add(format!("key{i}"), i).unwrap();
    }
    assert_eq!(d.table_sizes(), [4, 0]);

    d.set_resize_policy(ResizePolicy::Enable);
    d.add("key20".into(), 20).unwrap();
    assert!(d.is_rehashing());
    assert_eq!(d.table_sizes(), [4, 64]);
}

#[test]
fn test_safe_iteration_with_deletes_visits_everything() {
    let mut d = str_dict();
    for i in 0..300 {
        d.add(format!("key{i}"), i).unwrap();
    }
    let expected: HashSet<String> = d.iter().map(|(k, _)| k.clone()).collect();

    let mut cursor = d.safe_cursor();
    let mut visited = HashSet::new();
    loop {
        let key = match d.next_entry(&mut cursor) {
            Some((k, _)) => k.clone(),
            None => break,
        };
        if visited.insert(key.clone()) && visited.len() % 3 == 0 {
            d.remove(&key);
        }
    }
    d.release(cursor).unwrap();

    assert_eq!(visited, expected);
    assert_eq!(d.len(), 200);
    assert!(d.validate_invariants().is_ok());
}

#[test]
fn test_safe_iteration_sees_latest_replaced_values() {
    let mut d = str_dict();
    for i in 0..200 {
        d.add(format!("key{i}"), i).unwrap();
    }
    let mut model: HashMap<String, u32> = d.iter().map(|(k, v)| (k.clone(), *v)).collect();

    let mut cursor = d.safe_cursor();
    let mut visited = HashSet::new();
    let mut step = 0u32;
    loop {
        let key = match d.next_entry(&mut cursor) {
            Some((k, v)) => {
                assert_eq!(Some(v), model.get(k), "stale value for {k}");
                k.clone()
            }
            None => break,
        };
        assert!(visited.insert(key.clone()), "{key} visited twice");

        // Обновляем пару ключей впереди и только что выданный ключ.
        step += 1;
        for target in [
            format!("key{}", (step * 7) % 200),
            format!("key{}", (step * 13 + 1) % 200),
            key,
        ] {
            let value = 10_000 + step;
            assert_eq!(d.replace(target.clone(), value), Ok(Replaced::Updated));
            model.insert(target, value);
        }
    }
    d.release(cursor).unwrap();

    assert_eq!(visited.len(), 200);
    for (k, v) in &model {
        assert_eq!(d.get(k), Some(v));
    }
    assert!(d.validate_invariants().is_ok());
}

#[test]
fn test_safe_cursor_blocks_lazy_steps_only() {
    let mut d = str_dict();
    d.set_resize_policy(ResizePolicy::Avoid);
    for i in 0..25 {
        d.add(format!("key{i}"), i).unwrap();
    }
    assert!(d.is_rehashing());

    let cursor = d.safe_cursor();
    for i in 0..25 {
        d.find(&format!("key{i}"));
    }
    assert_eq!(d.rehash_index(), Some(0));

    // Явный шаг не зависит от курсоров.
    d.rehash(1);
    assert_ne!(d.rehash_index(), Some(0));

    drop(cursor);
    d.set_resize_policy(ResizePolicy::Enable);
    for i in 0..25 {
        d.find(&format!("key{i}"));
    }
    finish_rehash(&mut d);
    assert!(!d.is_rehashing());
}

#[test]
fn test_unsafe_cursor_fingerprint() {
    let mut d = str_dict();
    for i in 0..16 {
        d.add(format!("key{i}"), i).unwrap();
    }
    finish_rehash(&mut d);

    let mut cursor = d.cursor();
    let mut n = 0;
    while d.next_entry(&mut cursor).is_some() {
        n += 1;
    }
    assert_eq!(n, 16);
    assert!(d.release(cursor).is_ok());

    let cursor = d.cursor();
    d.remove(&"key3".to_string());
    assert!(matches!(
        d.release(cursor),
        Err(DictError::FingerprintMismatch { .. })
    ));
}

#[test]
fn test_destroy_hooks_on_replace_remove_and_drop() {
    let freed = Rc::new(RefCell::new(Vec::new()));
    {
        let mut d = Dict::new(TrackingType {
            freed: Rc::clone(&freed),
        });
        d.add("a".into(), "v1".into()).unwrap();
        d.replace("a".into(), "v2".into()).unwrap();
        assert_eq!(*freed.borrow(), vec!["v1".to_string()]);

        d.add("b".into(), "w".into()).unwrap();
        let detached = d.remove_detached(&"b".to_string());
        assert_eq!(detached, Some(("b".to_string(), "w".to_string())));
        assert_eq!(freed.borrow().len(), 1);

        d.add("c".into(), "x".into()).unwrap();
        assert!(d.remove(&"c".to_string()));
        assert_eq!(freed.borrow().last().map(String::as_str), Some("x"));
    }

    // При уничтожении словаря освобождается оставшееся значение.
    assert_eq!(
        *freed.borrow(),
        vec!["v1".to_string(), "x".to_string(), "v2".to_string()]
    );
}

#[test]
fn test_hash_dict_type_with_integer_keys() {
    let mut d: Dict<HashDictType<u64, &str>> = Dict::default();
    for i in 0..500u64 {
        d.add(i, "v").unwrap();
    }
    for i in (0..500u64).filter(|i| i % 5 == 0) {
        assert!(d.remove(&i));
    }
    assert_eq!(d.len(), 400);
    assert!(!d.contains_key(&10));
    assert!(d.contains_key(&11));
    assert!(d.validate_invariants().is_ok());
}

#[test]
fn test_stats_report() {
    let mut d = str_dict();
    for i in 0..50 {
        d.add(format!("key{i}"), i).unwrap();
    }
    finish_rehash(&mut d);

    let stats = d.stats();
    assert_eq!(stats.tables.len(), 1);
    assert_eq!(stats.tables[0].used, 50);
    assert!(stats.tables[0].non_empty_buckets <= 50);
    assert!(stats.format_report().contains("Used: 50"));
}
