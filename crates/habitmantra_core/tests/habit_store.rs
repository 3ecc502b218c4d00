use chrono::NaiveDate;
use habitmantra_core::db::{open_db, open_db_in_memory};
use habitmantra_core::{
    HabitRecord, HabitStore, HabitValidationError, MantraParts, SqliteHabitStore, StoreError,
    HABIT_SLOT_KEY,
};
use uuid::Uuid;

fn memory_store() -> SqliteHabitStore {
    SqliteHabitStore::new(open_db_in_memory().unwrap())
}

/// Writes slot text directly, the way a damaged or foreign file would look.
fn write_slot(store: &SqliteHabitStore, value: &str) {
    store
        .connection()
        .execute(
            "INSERT OR REPLACE INTO kv_slots (key, value) VALUES (?1, ?2);",
            rusqlite::params![HABIT_SLOT_KEY, value],
        )
        .unwrap();
}

fn sample_habit() -> HabitRecord {
    let mut habit = HabitRecord::with_id(
        Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap(),
        "我要读完100本书",
        MantraParts::new(
            "我是一个每天都看一页书的人",
            "它让我保持进步的惯性",
            "所以我会很轻松快乐",
        ),
        1_760_000_000_000,
    );
    habit.check_ins = 3;
    habit.last_check_in_date = NaiveDate::from_ymd_opt(2026, 10, 15);
    habit
}

#[test]
fn load_from_empty_slot_returns_none() {
    let store = memory_store();
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn save_then_load_roundtrip_preserves_all_fields() {
    let store = memory_store();
    let habit = sample_habit();

    store.save(&habit).unwrap();
    let loaded = store.load().unwrap().unwrap();

    assert_eq!(loaded, habit);
}

#[test]
fn save_replaces_previous_record() {
    let store = memory_store();
    let mut habit = sample_habit();
    store.save(&habit).unwrap();

    habit.check_ins = 4;
    habit.last_check_in_date = NaiveDate::from_ymd_opt(2026, 10, 16);
    store.save(&habit).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.check_ins, 4);
    let rows: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM kv_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn persisted_slot_uses_camel_case_wire_fields() {
    let store = memory_store();
    store.save(&sample_habit()).unwrap();

    let raw = store.read_raw().unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["id"], "11111111-2222-4333-8444-555555555555");
    assert_eq!(json["originalGoal"], "我要读完100本书");
    assert_eq!(json["mantra"]["identity"], "我是一个每天都看一页书的人");
    assert_eq!(json["createdAt"], 1_760_000_000_000_i64);
    assert_eq!(json["checkIns"], 3);
    assert_eq!(json["lastCheckInDate"], "2026-10-15");
}

#[test]
fn non_json_slot_is_treated_as_absent_and_cleared() {
    let store = memory_store();
    write_slot(&store, "not json");

    assert_eq!(store.load().unwrap(), None);
    assert_eq!(store.read_raw().unwrap(), None);
}

#[test]
fn wrong_shape_slot_is_discarded() {
    let store = memory_store();
    write_slot(
        &store,
        r#"{"id":"11111111-2222-4333-8444-555555555555","checkIns":-1}"#,
    );

    assert_eq!(store.load().unwrap(), None);
    assert_eq!(store.read_raw().unwrap(), None);
}

#[test]
fn save_rejects_invalid_record_without_writing() {
    let store = memory_store();
    let mut habit = sample_habit();
    habit.original_goal = "   ".to_string();

    let err = store.save(&habit).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(HabitValidationError::BlankGoal)
    ));
    assert_eq!(store.read_raw().unwrap(), None);
}

#[test]
fn clear_removes_record_and_is_idempotent() {
    let store = memory_store();
    store.save(&sample_habit()).unwrap();

    store.clear().unwrap();
    store.clear().unwrap();

    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn record_survives_reopening_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habitmantra.sqlite3");
    let habit = sample_habit();

    {
        let store = SqliteHabitStore::new(open_db(&path).unwrap());
        store.save(&habit).unwrap();
    }

    let reopened = SqliteHabitStore::new(open_db(&path).unwrap());
    assert_eq!(reopened.load().unwrap(), Some(habit));
}
