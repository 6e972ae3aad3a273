//! Integration tests for queuestore

use std::collections::HashSet;

use assert_cmd::Command;
use predicates::prelude::*;
use proptest::prelude::*;
use queuestore::Store;
use serde_json::json;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Listing returns the survivors of any insert/delete mix in insertion order
    #[test]
    fn test_list_preserves_insertion_order(
        ids in proptest::collection::vec("[a-z]{1,6}", 0..24),
        delete_mask in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let mut store = Store::open_in_memory().unwrap();
        let mut seen = HashSet::new();
        let mut expected = Vec::new();

        for (i, id) in ids.iter().enumerate() {
            if !seen.insert(id.clone()) {
                continue;
            }
            store.insert_value("items", id, &json!({"id": id}), i as i64).unwrap();
            if delete_mask[i] {
                prop_assert!(store.delete("items", id).unwrap());
            } else {
                expected.push(id.clone());
            }
        }

        let listed: Vec<String> = store
            .list_values("items")
            .unwrap()
            .into_iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        prop_assert_eq!(listed, expected.clone());
        prop_assert_eq!(store.count("items").unwrap(), expected.len());
    }
}

fn seeded_db(temp_dir: &TempDir) -> std::path::PathBuf {
    let db_path = temp_dir.path().join("queue.db");
    let mut store = Store::open(&db_path).unwrap();
    store.insert_value("requests", "req-1", &json!({"url": "/a"}), 1).unwrap();
    store.insert_value("requests", "req-2", &json!({"url": "/b"}), 2).unwrap();
    store.insert_value("sync_data", "sync-1", &json!({"kg": 80}), 3).unwrap();
    db_path
}

#[test]
fn test_cli_collections_and_count() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = seeded_db(&temp_dir);

    Command::cargo_bin("qs")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("--db")
        .arg(&db_path)
        .arg("collections")
        .assert()
        .success()
        .stdout(predicate::str::contains("requests 2"))
        .stdout(predicate::str::contains("sync_data 1"));

    Command::cargo_bin("qs")
        .unwrap()
        .arg("--db")
        .arg(&db_path)
        .args(["count", "requests"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_cli_list_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = seeded_db(&temp_dir);

    Command::cargo_bin("qs")
        .unwrap()
        .arg("--db")
        .arg(&db_path)
        .args(["list", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"url":"/a"}"#))
        .stdout(predicate::str::contains(r#"{"url":"/b"}"#));

    Command::cargo_bin("qs")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("--db")
        .arg(&db_path)
        .args(["clear", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 2 records from requests"));

    let store = Store::open(&db_path).unwrap();
    assert_eq!(store.count("requests").unwrap(), 0);
    assert_eq!(store.count("sync_data").unwrap(), 1);
}
