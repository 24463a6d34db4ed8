use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::MIGRATION_001_KV_STORE;

/// A pending write against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
}

/// Writes applied together in a single SQL transaction.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn set_json<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self> {
        let key = key.into();
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to encode value for key {}", key))?;
        Ok(self.set(key, json))
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove { key: key.into() });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Durable string-to-string store backed by a single SQLite table.
#[derive(Clone)]
pub struct KeyValueStore {
    pool: SqlitePool,
}

impl KeyValueStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_KV_STORE)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Open (creating if needed) the database at `path` and migrate it.
    pub async fn open(path: &str) -> Result<Self> {
        let store = Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read key {}", key))?;

        Ok(row.map(|row| row.get("value")))
    }

    /// Read and decode a JSON value; absent keys yield `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Corrupt JSON under key {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.set(key, value);
        self.commit(batch).await
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.set_json(key, value)?;
        self.commit(batch).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.remove(key);
        self.commit(batch).await
    }

    /// Apply every write in `batch` atomically.
    pub async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin write batch")?;
        apply_ops(&mut tx, &batch.ops).await?;
        tx.commit().await.context("Failed to commit write batch")?;
        Ok(())
    }

    /// Apply `batch` only if `check` accepts the current values of `keys`,
    /// read inside the same SQL transaction. Returns whether it was applied.
    pub async fn commit_if<F>(&self, batch: WriteBatch, keys: &[&str], check: F) -> Result<bool>
    where
        F: FnOnce(&[Option<String>]) -> bool,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin write batch")?;

        let mut current = Vec::with_capacity(keys.len());
        for key in keys {
            let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await
                .with_context(|| format!("Failed to read key {}", key))?;
            current.push(row.map(|row| row.get::<String, _>("value")));
        }

        if !check(&current) {
            tx.rollback()
                .await
                .context("Failed to roll back write batch")?;
            return Ok(false);
        }

        apply_ops(&mut tx, &batch.ops).await?;
        tx.commit().await.context("Failed to commit write batch")?;
        Ok(true)
    }
}

async fn apply_ops(tx: &mut Transaction<'_, Sqlite>, ops: &[WriteOp]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    for op in ops {
        match op {
            WriteOp::Set { key, value } => {
                sqlx::query(
                    r#"
                    INSERT INTO kv_store (key, value, updated_at)
                    VALUES (?, ?, ?)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                    "#,
                )
                .bind(key)
                .bind(value)
                .bind(&now)
                .execute(&mut **tx)
                .await
                .with_context(|| format!("Failed to write key {}", key))?;
            }
            WriteOp::Remove { key } => {
                sqlx::query("DELETE FROM kv_store WHERE key = ?")
                    .bind(key)
                    .execute(&mut **tx)
                    .await
                    .with_context(|| format!("Failed to remove key {}", key))?;
            }
        }
    }
    Ok(())
}
