//! End-to-end scenarios across schema, table, index and transaction
//! layers, including multi-threaded locking behavior.

use nimbus_storage::prelude::*;
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn users_db() -> (Database, Arc<Table>) {
    let db = Database::new();
    let schema = Schema::builder()
        .add_field(FieldSpec::new("name", DataType::Text).max_length(50))
        .unwrap()
        .build()
        .unwrap();
    let table = db.create_table("users", schema).unwrap();
    (db, table)
}

fn user_row(table: &Arc<Table>, name: &str) -> Row {
    Row::builder(Arc::clone(table.schema()))
        .set("name", name)
        .unwrap()
        .build()
        .unwrap()
}

fn updated_user(table: &Arc<Table>, id: RowId, name: &str) -> Row {
    Row::builder(Arc::clone(table.schema()))
        .keep_id(id)
        .set("name", name)
        .unwrap()
        .build()
        .unwrap()
}

/// Keyed snapshot of table contents for state comparison.
fn snapshot(table: &Arc<Table>) -> BTreeMap<RowId, Vec<(String, Val)>> {
    table
        .rows()
        .iter()
        .map(|r| {
            (
                r.id(),
                r.data()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn test_end_to_end_crud_with_unique_index() {
    let (db, table) = users_db();

    // schema carries {name, id} with the synthesized pk
    assert_eq!(2, table.schema().fields().len());
    assert!(table.schema().field("id").unwrap().is_primary_key());

    table.create(user_row(&table, "a"), None).unwrap();
    table.create(user_row(&table, "b"), None).unwrap();
    let a = table.read(&Val::Long(0), "id", None).unwrap();
    assert_eq!(Some(&Val::from("a")), a[0].get("name"));
    let b = table.read(&Val::Long(1), "id", None).unwrap();
    assert_eq!(Some(&Val::from("b")), b[0].get("name"));

    table.add_index("name", true).unwrap();
    let err = table.create(user_row(&table, "a"), None).unwrap_err();
    assert_eq!(ErrorKind::AlreadyExists, err.kind());

    table.delete(0, None).unwrap();
    let err = table.read(&Val::Long(0), "id", None).unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind());

    db.drop_table("users").unwrap();
    assert!(db.get_table("users").is_err());
}

#[test]
fn test_transactional_update_visible_then_rolled_back() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();
    table.create(user_row(&table, "b"), None).unwrap();

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    table
        .update(updated_user(&table, 1, "c"), tm.current())
        .unwrap();
    // own change is visible within the transaction
    let seen = table.read(&Val::Long(1), "id", tm.current()).unwrap();
    assert_eq!(Some(&Val::from("c")), seen[0].get("name"));
    tm.rollback().unwrap();
    // pre-update value is back
    let seen = table.read(&Val::Long(1), "id", None).unwrap();
    assert_eq!(Some(&Val::from("b")), seen[0].get("name"));
}

#[test]
fn test_rollback_restores_exact_state_with_indexes() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();
    table.create(user_row(&table, "b"), None).unwrap();
    table.add_index("name", true).unwrap();
    let before = snapshot(&table);

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    table.create(user_row(&table, "c"), tm.current()).unwrap();
    table
        .update(updated_user(&table, 0, "a2"), tm.current())
        .unwrap();
    table.delete(1, tm.current()).unwrap();
    // update on top of the transaction's own create
    let created_id = 2;
    table
        .update(updated_user(&table, created_id, "c2"), tm.current())
        .unwrap();
    tm.rollback().unwrap();

    assert_eq!(before, snapshot(&table));
    // index contents rolled back with the rows
    assert_eq!(1, table.read(&Val::from("a"), "name", None).unwrap().len());
    assert_eq!(1, table.read(&Val::from("b"), "name", None).unwrap().len());
    assert!(table.read(&Val::from("c"), "name", None).is_err());
    assert!(table.read(&Val::from("a2"), "name", None).is_err());
    // a rolled back insert retires its id permanently
    table.create(user_row(&table, "d"), None).unwrap();
    assert!(table.read(&Val::Long(created_id), "id", None).is_err());
    assert_eq!(
        1,
        table
            .read(&Val::Long(created_id + 1), "id", None)
            .unwrap()
            .len()
    );
}

#[test]
fn test_commit_keeps_changes_and_releases_locks() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    table
        .update(updated_user(&table, 0, "a2"), tm.current())
        .unwrap();
    table.create(user_row(&table, "b"), tm.current()).unwrap();
    tm.commit().unwrap();

    let seen = table.read(&Val::Long(0), "id", None).unwrap();
    assert_eq!(Some(&Val::from("a2")), seen[0].get("name"));
    assert_eq!(2, table.rows().len());
    // locks are gone: another writer gets straight through
    table
        .update(updated_user(&table, 0, "a3"), None)
        .unwrap();
}

#[test]
fn test_disjoint_keys_do_not_block() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();
    table.create(user_row(&table, "b"), None).unwrap();

    let t1 = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            let mut tm = TransactionManager::new();
            tm.begin().unwrap();
            table
                .update(updated_user(&table, 0, "a2"), tm.current())
                .unwrap();
            thread::sleep(Duration::from_millis(100));
            tm.commit().unwrap();
        })
    };
    let t2 = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            let mut tm = TransactionManager::new();
            tm.begin().unwrap();
            table
                .update(updated_user(&table, 1, "b2"), tm.current())
                .unwrap();
            thread::sleep(Duration::from_millis(100));
            tm.commit().unwrap();
        })
    };
    t1.join().unwrap();
    t2.join().unwrap();
    assert_eq!(
        Some(&Val::from("a2")),
        table.read(&Val::Long(0), "id", None).unwrap()[0].get("name")
    );
    assert_eq!(
        Some(&Val::from("b2")),
        table.read(&Val::Long(1), "id", None).unwrap()[0].get("name")
    );
}

#[test]
fn test_same_key_writers_serialize_on_transaction_end() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    table
        .update(updated_user(&table, 0, "a2"), tm.current())
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            // blocks until the first transaction releases key 0
            table.update(updated_user(&table, 0, "a3"), None).unwrap();
            tx.send(()).unwrap();
        })
    };
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    tm.commit().unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    writer.join().unwrap();
    assert_eq!(
        Some(&Val::from("a3")),
        table.read(&Val::Long(0), "id", None).unwrap()[0].get("name")
    );
}

#[test]
fn test_same_key_reacquired_within_one_transaction() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    // read then write then write again on the same key, single trx
    table.read(&Val::Long(0), "id", tm.current()).unwrap();
    table
        .update(updated_user(&table, 0, "a2"), tm.current())
        .unwrap();
    table
        .update(updated_user(&table, 0, "a3"), tm.current())
        .unwrap();
    tm.rollback().unwrap();
    assert_eq!(
        Some(&Val::from("a")),
        table.read(&Val::Long(0), "id", None).unwrap()[0].get("name")
    );
}

#[test]
fn test_transactional_create_then_delete_rolls_back_clean() {
    let (_db, table) = users_db();
    table.add_index("name", true).unwrap();

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    table.create(user_row(&table, "a"), tm.current()).unwrap();
    table.delete(0, tm.current()).unwrap();
    tm.rollback().unwrap();

    assert!(table.rows().is_empty());
    assert!(table.read(&Val::from("a"), "name", None).is_err());
    // unique index holds no stale entry
    table.create(user_row(&table, "a"), None).unwrap();
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let (_db, table) = users_db();
    table.create(user_row(&table, "a"), None).unwrap();
    {
        let mut tm = TransactionManager::new();
        tm.begin().unwrap();
        table
            .update(updated_user(&table, 0, "gone"), tm.current())
            .unwrap();
        // tm dropped without commit
    }
    assert_eq!(
        Some(&Val::from("a")),
        table.read(&Val::Long(0), "id", None).unwrap()[0].get("name")
    );
}

#[test]
fn test_rollback_round_trip_random_operations() {
    use rand::prelude::*;

    let (_db, table) = users_db();
    for i in 0..20 {
        table
            .create(user_row(&table, &format!("u{}", i)), None)
            .unwrap();
    }
    table.add_index("name", false).unwrap();
    let before = snapshot(&table);

    let mut rng = thread_rng();
    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    for step in 0..50 {
        let key = rng.gen_range(0..20i64);
        match rng.gen_range(0..3) {
            0 => {
                let _ = table.create(user_row(&table, &format!("n{}", step)), tm.current());
            }
            1 => {
                let _ = table.update(
                    updated_user(&table, key, &format!("u{}x{}", key, step)),
                    tm.current(),
                );
            }
            _ => {
                let _ = table.delete(key, tm.current());
            }
        }
    }
    tm.rollback().unwrap();

    assert_eq!(before, snapshot(&table));
    for i in 0..20 {
        assert_eq!(
            1,
            table
                .read(&Val::from(format!("u{}", i)), "name", None)
                .unwrap()
                .len()
        );
    }
}

#[test]
fn test_transactions_on_two_tables_roll_back_in_order() {
    let db = Database::new();
    let schema_a = Schema::builder()
        .add_field(FieldSpec::new("name", DataType::Text))
        .unwrap()
        .build()
        .unwrap();
    let schema_b = Schema::builder()
        .add_field(FieldSpec::new("count", DataType::Long))
        .unwrap()
        .build()
        .unwrap();
    let ta = db.create_table("a", schema_a).unwrap();
    let tb = db.create_table("b", schema_b).unwrap();

    let mut tm = TransactionManager::new();
    tm.begin().unwrap();
    ta.create(
        Row::builder(Arc::clone(ta.schema()))
            .set("name", "x")
            .unwrap()
            .build()
            .unwrap(),
        tm.current(),
    )
    .unwrap();
    tb.create(
        Row::builder(Arc::clone(tb.schema()))
            .set("count", 5i64)
            .unwrap()
            .build()
            .unwrap(),
        tm.current(),
    )
    .unwrap();
    tm.rollback().unwrap();

    assert!(ta.rows().is_empty());
    assert!(tb.rows().is_empty());
}
