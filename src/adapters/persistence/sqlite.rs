//! SQLite Record Store - Relational Adapter for the RecordStore Port
//!
//! One `rusqlite::Connection` behind a mutex; every operation runs on
//! the blocking pool. Date uniqueness is the table's `UNIQUE` constraint,
//! so two racing writes for the same date are decided by SQLite and the
//! loser surfaces as `RecordError::DuplicateDate`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info, instrument};

use super::schema::StoreSchema;
use crate::domain::{ImageRef, NewRecord, Record, RecordError, RecordId, RecordPatch};
use crate::ports::RecordStore;

/// Database path that opens a private in-memory store.
pub const IN_MEMORY: &str = ":memory:";

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    /// Single serialized connection.
    conn: Arc<Mutex<Connection>>,
    /// Table layout and statements.
    schema: Arc<StoreSchema>,
}

impl SqliteRecordStore {
    /// Open (or create) the store at `path`, creating parent
    /// directories and the record table as needed.
    pub fn open(path: &str, schema: StoreSchema) -> anyhow::Result<Self> {
        if path == IN_MEMORY {
            return Self::open_in_memory(schema);
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {path}"))?;
        let store = Self::with_connection(conn, schema)?;

        info!(path, table = store.schema.table(), "Record store opened");
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory(schema: StoreSchema) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn, schema)
    }

    fn with_connection(conn: Connection, schema: StoreSchema) -> anyhow::Result<Self> {
        conn.execute_batch(schema.create_table_sql())
            .with_context(|| format!("Failed to create table {}", schema.table()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: Arc::new(schema),
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T, RecordError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &StoreSchema) -> Result<T, RecordError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let schema = Arc::clone(&self.schema);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            op(&mut *guard, &*schema)
        })
        .await
        .context("Record store task failed")?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self, new), fields(date = %new.date))]
    async fn create(&self, new: NewRecord) -> Result<Record, RecordError> {
        self.run(move |conn, schema| {
            let now = Utc::now();
            conn.execute(
                schema.insert_sql(),
                params![
                    new.image.as_ref().map(ImageRef::as_str),
                    new.memo,
                    new.date,
                    now,
                    now
                ],
            )
            .map_err(|e| write_error(e, new.date))?;

            let record = Record {
                id: RecordId(conn.last_insert_rowid()),
                image: new.image,
                memo: new.memo,
                date: new.date,
                created_at: now,
                updated_at: now,
            };
            debug!(id = %record.id, "Record inserted");
            Ok(record)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Record>, RecordError> {
        self.run(|conn, schema| {
            let mut stmt = conn.prepare_cached(schema.select_all_sql()).map_err(storage)?;
            let rows = stmt.query_map([], map_row).map_err(storage)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
        })
        .await
    }

    async fn get(&self, id: RecordId) -> Result<Record, RecordError> {
        self.run(move |conn, schema| find(conn, schema, id)).await
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: RecordId, patch: RecordPatch) -> Result<Record, RecordError> {
        self.run(move |conn, schema| {
            let tx = conn.transaction().map_err(storage)?;

            let mut record = find(&tx, schema, id)?;
            record.apply(patch, Utc::now());

            tx.execute(
                schema.update_sql(),
                params![
                    record.image.as_ref().map(ImageRef::as_str),
                    record.memo,
                    record.date,
                    record.updated_at,
                    id.0
                ],
            )
            .map_err(|e| write_error(e, record.date))?;

            tx.commit().map_err(storage)?;
            debug!(%id, "Record updated");
            Ok(record)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RecordId) -> Result<(), RecordError> {
        self.run(move |conn, schema| {
            let deleted = conn.execute(schema.delete_sql(), params![id.0]).map_err(storage)?;
            if deleted == 0 {
                return Err(RecordError::NotFound(id));
            }
            debug!(%id, "Record deleted");
            Ok(())
        })
        .await
    }

    async fn is_healthy(&self) -> bool {
        self.run(|conn, _| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(storage)
        })
        .await
        .is_ok()
    }
}

fn find(conn: &Connection, schema: &StoreSchema, id: RecordId) -> Result<Record, RecordError> {
    conn.query_row(schema.select_one_sql(), params![id.0], map_row)
        .optional()
        .map_err(storage)?
        .ok_or(RecordError::NotFound(id))
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: RecordId(row.get(0)?),
        image: row.get::<_, Option<String>>(1)?.map(ImageRef::new),
        memo: row.get(2)?,
        date: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Map an insert/update failure, recognising the `date` unique index.
fn write_error(err: rusqlite::Error, date: NaiveDate) -> RecordError {
    let unique_violation = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    );
    if unique_violation {
        RecordError::DuplicateDate(date)
    } else {
        storage(err)
    }
}

fn storage(err: rusqlite::Error) -> RecordError {
    RecordError::Storage(anyhow::Error::new(err).context("SQLite operation failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> SqliteRecordStore {
        let schema = StoreSchema::new(StoreSchema::DEFAULT_TABLE).unwrap();
        SqliteRecordStore::open_in_memory(schema).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let store = store();
        let created = store
            .create(
                NewRecord::new(day(2024, 1, 1))
                    .with_memo("dry")
                    .with_image(ImageRef::new("skin_records/a.png")),
            )
            .await
            .unwrap();

        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_date_rejected_and_store_unchanged() {
        let store = store();
        store.create(NewRecord::new(day(2024, 1, 1))).await.unwrap();

        let err = store
            .create(NewRecord::new(day(2024, 1, 1)).with_memo("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateDate(d) if d == day(2024, 1, 1)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_by_date_descending() {
        let store = store();
        for d in [3, 1, 4, 2] {
            store.create(NewRecord::new(day(2024, 1, d))).await.unwrap();
        }

        let dates: Vec<_> = store.list().await.unwrap().iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![day(2024, 1, 4), day(2024, 1, 3), day(2024, 1, 2), day(2024, 1, 1)]
        );
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at_only() {
        let store = store();
        let created = store.create(NewRecord::new(day(2024, 1, 1))).await.unwrap();

        let updated = store
            .update(
                created.id,
                RecordPatch {
                    memo: Some("calm".to_string()),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.memo, "calm");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_to_other_records_date_conflicts() {
        let store = store();
        let a = store.create(NewRecord::new(day(2024, 1, 1))).await.unwrap();
        let b = store.create(NewRecord::new(day(2024, 1, 2))).await.unwrap();

        let err = store
            .update(
                b.id,
                RecordPatch {
                    date: Some(a.date),
                    memo: Some("lost".to_string()),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateDate(_)));

        // The failed update rolled back entirely.
        assert_eq!(store.get(b.id).await.unwrap(), b);
    }

    #[tokio::test]
    async fn test_update_to_own_date_succeeds() {
        let store = store();
        let a = store.create(NewRecord::new(day(2024, 1, 1))).await.unwrap();

        let updated = store
            .update(
                a.id,
                RecordPatch {
                    date: Some(a.date),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.date, a.date);
    }

    #[tokio::test]
    async fn test_update_clears_image() {
        let store = store();
        let a = store
            .create(NewRecord::new(day(2024, 1, 1)).with_image(ImageRef::new("x/y.jpg")))
            .await
            .unwrap();

        let updated = store
            .update(
                a.id,
                RecordPatch {
                    image: Some(None),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.image.is_none());
        assert!(store.get(a.id).await.unwrap().image.is_none());
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let store = store();
        let missing = RecordId(99);

        assert!(matches!(store.get(missing).await, Err(RecordError::NotFound(id)) if id == missing));
        assert!(matches!(
            store.update(missing, RecordPatch::default()).await,
            Err(RecordError::NotFound(_))
        ));
        assert!(matches!(store.delete(missing).await, Err(RecordError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_then_get_not_found() {
        let store = store();
        let a = store.create(NewRecord::new(day(2024, 1, 1))).await.unwrap();

        store.delete(a.id).await.unwrap();
        assert!(matches!(store.get(a.id).await, Err(RecordError::NotFound(_))));

        // The date is free again.
        store.create(NewRecord::new(day(2024, 1, 1))).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creates_same_date_one_wins() {
        let store = store();
        let (first, second) = tokio::join!(
            store.create(NewRecord::new(day(2024, 6, 1)).with_memo("first")),
            store.create(NewRecord::new(day(2024, 6, 1)).with_memo("second")),
        );

        assert!(first.is_ok() ^ second.is_ok());
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(RecordError::DuplicateDate(_))));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_file_store_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("records.sqlite3");
        let path = path.to_str().unwrap();

        let schema = StoreSchema::new("skin_records").unwrap();
        let store = SqliteRecordStore::open(path, schema.clone()).unwrap();
        let a = store.create(NewRecord::new(day(2024, 1, 1)).with_memo("dry")).await.unwrap();
        assert!(store.is_healthy().await);
        drop(store);

        let reopened = SqliteRecordStore::open(path, schema).unwrap();
        assert_eq!(reopened.get(a.id).await.unwrap(), a);
    }
}
