//! Integration tests for `SqliteStore` against in-memory and on-disk
//! databases.

use jurnal_core::{
  CollectionKey,
  ids::SequentialIds,
  remote::Detached,
  roster::{ClassList, PeriodList},
  store::{LocalStore, load_state},
  sync::SyncController,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

#[tokio::test]
async fn missing_key_reads_none() {
  let s = store().await;
  assert_eq!(s.read(CollectionKey::Journal).await.unwrap(), None);
}

#[tokio::test]
async fn write_replaces_previous_value() {
  let s = store().await;
  s.write(CollectionKey::Classes, r#"["X AP 1"]"#.into()).await.unwrap();
  s.write(CollectionKey::Classes, r#"["X AP 2"]"#.into()).await.unwrap();

  assert_eq!(
    s.read(CollectionKey::Classes).await.unwrap().as_deref(),
    Some(r#"["X AP 2"]"#)
  );
  assert_eq!(s.get("kelasData").await.unwrap().as_deref(), Some(r#"["X AP 2"]"#));

  let entries = s.entries().await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].key, "kelasData");
  assert_eq!(entries[0].bytes, r#"["X AP 2"]"#.len());
}

#[tokio::test]
async fn entries_are_listed_by_key() {
  let s = store().await;
  for key in [CollectionKey::Periods, CollectionKey::Journal, CollectionKey::Attendance] {
    s.write(key, "{}".into()).await.unwrap();
  }
  let keys: Vec<_> = s.entries().await.unwrap().into_iter().map(|e| e.key).collect();
  assert_eq!(keys, ["absensiData", "jamData", "jurnalData"]);
}

#[tokio::test]
async fn malformed_rows_fall_back_to_defaults() {
  let s = store().await;
  s.put("jamData", "not json".into()).await.unwrap();
  s.put("kelasData", r#"["X AP 1"]"#.into()).await.unwrap();

  let state = load_state(&s).await.state;
  assert_eq!(state.periods(), &PeriodList::default());
  assert_eq!(state.classes(), &ClassList(vec!["X AP 1".into()]));
}

#[tokio::test]
async fn reopening_a_file_keeps_data() {
  let dir = std::env::temp_dir().join(format!("jurnal-store-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("reopen.db");
  let _ = std::fs::remove_file(&path);

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.write(CollectionKey::Roster, r#"{"X AP 1":["Andi"]}"#.into())
      .await
      .unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(
    s.read(CollectionKey::Roster).await.unwrap().as_deref(),
    Some(r#"{"X AP 1":["Andi"]}"#)
  );

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn newer_schema_is_refused() {
  let dir = std::env::temp_dir().join(format!("jurnal-schema-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("future.db");
  let _ = std::fs::remove_file(&path);

  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.pragma_update(None, "user_version", 99).unwrap();
  }
  assert!(matches!(
    SqliteStore::open(&path).await,
    Err(Error::SchemaTooNew { found: 99, supported: 1 })
  ));

  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn controller_mirrors_into_sqlite_after_boot() {
  let s = store().await;
  let ctrl = SyncController::open(s.clone(), Detached, SequentialIds::starting_at(1)).await;

  ctrl.modify::<ClassList, _>(|c| c.add("x ap 1")).await;
  assert_eq!(s.get("kelasData").await.unwrap(), None);

  ctrl.boot().await.unwrap();
  ctrl.modify::<ClassList, _>(|c| c.add("x ap 2")).await;
  assert_eq!(
    s.get("kelasData").await.unwrap().as_deref(),
    Some(r#"["X AP 1","X AP 2"]"#)
  );
  let stored: serde_json::Value =
    serde_json::from_str(&s.get("jamData").await.unwrap().unwrap()).unwrap();
  assert_eq!(stored, serde_json::json!(["1-2", "3-4", "5-6"]));
}
