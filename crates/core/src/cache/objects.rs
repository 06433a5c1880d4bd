//! Object CRUD operations for the durable store.
//!
//! Objects are written with a single UPSERT so a reader never sees a
//! partially written row. Rewriting identical content is a no-op.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::ObjectStore;
use super::hash::content_digest;
use crate::Error;
use crate::key::CacheKey;
use crate::tiers::DurableStore;

/// A stored image body with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub digest: String,
    pub stored_at: String,
}

impl ObjectStore {
    /// Insert or replace the object stored under `key`.
    ///
    /// Returns `false` when the stored row already had the same body and
    /// content type and was left untouched.
    pub async fn put_object(&self, key: &str, body: Bytes, content_type: Option<String>) -> Result<bool, Error> {
        let key = key.to_string();
        let digest = content_digest(&body);
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changed = conn.execute(
                    "INSERT INTO objects (cache_key, body, content_type, digest, size, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(cache_key) DO UPDATE SET
                        body = excluded.body,
                        content_type = excluded.content_type,
                        digest = excluded.digest,
                        size = excluded.size,
                        stored_at = excluded.stored_at
                     WHERE objects.digest != excluded.digest
                        OR objects.content_type IS NOT excluded.content_type",
                    params![&key, body.as_ref(), &content_type, &digest, body.len() as i64, &stored_at],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Get an object by key.
    ///
    /// Returns None if nothing is stored under the key.
    pub async fn get_object(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredObject>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_key, body, content_type, digest, stored_at
                     FROM objects WHERE cache_key = ?1",
                )?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(StoredObject {
                        key: row.get(0)?,
                        body: Bytes::from(row.get::<_, Vec<u8>>(1)?),
                        content_type: row.get(2)?,
                        digest: row.get(3)?,
                        stored_at: row.get(4)?,
                    })
                });

                match result {
                    Ok(object) => Ok(Some(object)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored objects.
    pub async fn count_objects(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl DurableStore for ObjectStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<StoredObject>, Error> {
        self.get_object(key.as_str()).await
    }

    async fn put(&self, key: &CacheKey, body: Bytes, content_type: Option<String>) -> Result<(), Error> {
        let changed = self.put_object(key.as_str(), body, content_type).await?;
        if !changed {
            tracing::debug!(key = %key, "stored object unchanged");
        }
        Ok(())
    }
}
