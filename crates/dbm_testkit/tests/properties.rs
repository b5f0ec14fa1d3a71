//! Property tests: the database behaves like a map.

use dbm_core::{Config, Database};
use dbm_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operations_match_model(ops in ops_strategy(40)) {
        let mut harness = ModelHarness::new();
        harness.run(&ops);
    }

    #[test]
    fn set_then_get_returns_value(key in key_strategy(), value in value_strategy()) {
        with_temp_db(|db| {
            db.set(&key, &value).unwrap();
            prop_assert_eq!(db.get(&key).unwrap(), Some(value.clone()));
            prop_assert!(db.contains_key(&key).unwrap());
            Ok(())
        })?;
    }

    #[test]
    fn traversal_visits_each_key_once(entries in entries_strategy(50)) {
        with_temp_db(|db| {
            db.merge_from(entries.iter()).unwrap();

            let keys = db.keys().unwrap();
            prop_assert_eq!(keys.len(), entries.len());
            prop_assert_eq!(db.len().unwrap(), entries.len());

            let pairs: BTreeMap<_, _> = db.to_pairs().unwrap().into_iter().collect();
            prop_assert_eq!(&pairs, &entries);
            Ok(())
        })?;
    }

    #[test]
    fn delete_where_removes_exactly_matches(entries in entries_strategy(30), cut in any::<u8>()) {
        with_temp_db(|db| {
            db.merge_from(entries.iter()).unwrap();
            db.delete_where(|_, value| value.first().is_some_and(|b| *b < cut)).unwrap();

            let expected: BTreeMap<_, _> = entries
                .iter()
                .filter(|(_, value)| !value.first().is_some_and(|b| *b < cut))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let actual: BTreeMap<_, _> = db.to_pairs().unwrap().into_iter().collect();
            prop_assert_eq!(actual, expected);
            Ok(())
        })?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn file_contents_survive_reopen(ops in ops_strategy(30)) {
        let mut test_db = TestDatabase::file();
        let db = std::mem::replace(&mut test_db.db, Database::open_in_memory().unwrap());
        let mut harness = ModelHarness::with_database(db);
        harness.run(&ops);
        let expected = harness.model().clone();
        drop(harness);

        let reopened = test_db.reopen(Config::default()).unwrap();
        let actual: BTreeMap<_, _> = reopened.to_pairs().unwrap().into_iter().collect();
        prop_assert_eq!(actual, expected);
    }
}
