use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tokio::sync::RwLock;

use crate::{error::StoreError, models::Record};

// Each named collection is stored as a single JSON array blob, replaced
// wholesale on every write. Mutations are load-then-replace, so every write
// of a collection must hold that collection's write lock for the full
// load-mutate-replace span or a concurrent writer silently loses its update.
pub struct EntityStore {
    pool: SqlitePool,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl EntityStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StoreError::Database)?;

        Self::from_pool(pool).await
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        // A second connection would see its own empty database, so the pool
        // is pinned to a single long-lived connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::Database)?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub async fn load_all<T>(&self, collection: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let lock = self.collection_lock(collection);
        let _read = lock.read().await;
        self.read_records(collection).await
    }

    pub async fn replace_all<T>(&self, collection: &str, records: &[T]) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let lock = self.collection_lock(collection);
        let _write = lock.write().await;
        self.write_records(collection, records).await
    }

    pub async fn add_one<T>(&self, collection: &str, record: T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        self.with_collection(collection, |records: &mut Vec<T>| {
            records.push(record);
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub async fn update_one<T>(
        &self,
        collection: &str,
        id: &str,
        mutator: impl FnOnce(&mut T) + Send,
    ) -> Result<Option<T>, StoreError>
    where
        T: Record + Serialize + DeserializeOwned + Clone + Send,
    {
        self.with_collection(collection, |records: &mut Vec<T>| {
            let Some(record) = records.iter_mut().find(|record| record.id() == id) else {
                return Ok::<_, StoreError>(None);
            };
            mutator(record);
            Ok(Some(record.clone()))
        })
        .await
    }

    pub async fn remove_one<T>(&self, collection: &str, id: &str) -> Result<bool, StoreError>
    where
        T: Record + Serialize + DeserializeOwned + Send,
    {
        self.with_collection(collection, |records: &mut Vec<T>| {
            let before = records.len();
            records.retain(|record| record.id() != id);
            Ok::<_, StoreError>(records.len() < before)
        })
        .await
    }

    // Runs `f` over the decoded collection under its write lock and persists
    // the result only if `f` succeeds.
    pub async fn with_collection<T, R, E, F>(&self, collection: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Send,
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E> + Send,
        R: Send,
    {
        let lock = self.collection_lock(collection);
        let _write = lock.write().await;

        let mut records: Vec<T> = self.read_records(collection).await?;
        let out = f(&mut records)?;
        self.write_records(collection, &records).await?;
        Ok(out)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO settings (key, value, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_setting(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn collection_lock(&self, collection: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());
        locks.entry(collection.to_string()).or_default().clone()
    }

    // Lock-free read shared by load_all and with_collection; callers hold
    // the collection lock.
    async fn read_records<T>(&self, collection: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let payload =
            sqlx::query_scalar::<_, String>("SELECT payload FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;

        let Some(payload) = payload else {
            return Ok(Vec::new());
        };

        let values: Vec<serde_json::Value> = serde_json::from_str(&payload)?;
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value(value) {
                Ok(record) => records.push(record),
                // One undecodable record must not block the rest of the
                // collection from loading.
                Err(err) => log::warn!("Dropping malformed record from '{collection}': {err}"),
            }
        }
        Ok(records)
    }

    async fn write_records<T>(&self, collection: &str, records: &[T]) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let payload = serde_json::to_string(records)?;
        sqlx::query(
            r#"INSERT INTO collections (name, payload, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET
                 payload = excluded.payload,
                 updated_at = excluded.updated_at"#,
        )
        .bind(collection)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
