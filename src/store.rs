use serde::de::DeserializeOwned;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::warn;

use crate::error::AppResult;

pub const ROOMS_KEY: &str = "rooms";
pub const ARCHIVED_KEY: &str = "archived_rooms";

const UPSERT_SQL: &str =
    "INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let pool = SqlitePool::connect(url).await?;
        Self::with_pool(pool).await
    }

    pub async fn in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> AppResult<Self> {
        sqlx::query("CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|(raw,)| match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable stored document");
                None
            }
        }))
    }

    #[cfg(test)]
    async fn put_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(UPSERT_SQL).bind(key).bind(raw).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn put_many(&self, docs: &[(&str, String)]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for (key, raw) in docs {
            sqlx::query(UPSERT_SQL).bind(*key).bind(raw.as_str()).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn key_count(&self) -> AppResult<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kv")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_counts_keys() {
        let store = KvStore::in_memory().await.unwrap();
        assert_eq!(store.key_count().await.unwrap(), 0);

        store.put_json(ROOMS_KEY, &vec![1, 2]).await.unwrap();
        store.put_json(ROOMS_KEY, &vec![3]).await.unwrap();
        assert_eq!(store.get_json::<Vec<i32>>(ROOMS_KEY).await.unwrap(), Some(vec![3]));
        assert_eq!(store.key_count().await.unwrap(), 1);

        store.put_many(&[(ROOMS_KEY, "[]".into()), (ARCHIVED_KEY, "[9]".into())]).await.unwrap();
        assert_eq!(store.get_json::<Vec<i32>>(ARCHIVED_KEY).await.unwrap(), Some(vec![9]));
        assert_eq!(store.key_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn corrupt_documents_read_as_missing() {
        let store = KvStore::in_memory().await.unwrap();
        store.put_many(&[(ROOMS_KEY, "{not json".into())]).await.unwrap();
        assert_eq!(store.get_json::<Vec<i32>>(ROOMS_KEY).await.unwrap(), None);
        assert_eq!(store.get_json::<Vec<i32>>("absent").await.unwrap(), None);
    }
}
