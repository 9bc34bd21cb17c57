//! Versioned entry storage on SQLite.
//!
//! Every operation is a single statement or a single transaction on the
//! serialized connection, so readers observe either the previous or the new
//! value of an entry and never a mix of the two.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, types::Type};

use super::connection::CacheDb;
use super::key::{MatchOptions, RequestKey};
use super::store::{CacheEntry, CachedResponse, CacheStore};
use crate::Error;

const ENTRY_COLUMNS: &str = "method, url, status, headers_json, body, stored_at";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let method: String = row.get(0)?;
    let url: String = row.get(1)?;
    let headers_json: String = row.get(3)?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let key = RequestKey::parse(&method, &url)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.to_string().into()))?;
    let body: Vec<u8> = row.get(4)?;

    Ok(CacheEntry {
        key,
        response: CachedResponse { status: row.get(2)?, headers, body: Bytes::from(body) },
        stored_at: row.get(5)?,
    })
}

fn insert_entry(
    conn: &rusqlite::Connection, version: &str, key: &RequestKey, response: &CachedResponse, stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)
        .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;
    conn.execute(
        "INSERT INTO cache_entries (
            version, key_hash, method, url, url_no_query, status, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(version, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            version,
            key.hash(),
            key.method(),
            key.url(),
            key.url_without_query(),
            response.status,
            headers_json,
            response.body.as_ref(),
            stored_at,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn put(&self, version: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let version = version.to_string();
        let key = key.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_versions WHERE tag = ?1)",
                    params![version],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::VersionNotInstalled(version));
                }
                insert_entry(conn, &version, &key, &response, &Utc::now().to_rfc3339())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, version: &str, key: &RequestKey, options: MatchOptions) -> Result<Option<CacheEntry>, Error> {
        let version = version.to_string();
        let key = key.clone();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let entry = if options.ignore_query {
                    // Prefer the exact key, then the most recently stored variant.
                    conn.query_row(
                        &format!(
                            "SELECT {ENTRY_COLUMNS} FROM cache_entries
                            WHERE version = ?1 AND method = ?2 AND url_no_query = ?3
                            ORDER BY (key_hash = ?4) DESC, stored_at DESC, rowid DESC
                            LIMIT 1"
                        ),
                        params![version, key.method(), key.url_without_query(), key.hash()],
                        row_to_entry,
                    )
                    .optional()?
                } else {
                    conn.query_row(
                        &format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE version = ?1 AND key_hash = ?2"),
                        params![version, key.hash()],
                        row_to_entry,
                    )
                    .optional()?
                };
                Ok(entry)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_versions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT tag FROM cache_versions ORDER BY tag")?;
                let tags = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(tags)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_version(&self, version: &str) -> Result<bool, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE version = ?1", params![version])?;
                let removed = tx.execute("DELETE FROM cache_versions WHERE tag = ?1", params![version])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn commit_version(&self, version: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<(), Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_versions (tag, created_at) VALUES (?1, ?2)
                    ON CONFLICT(tag) DO UPDATE SET created_at = excluded.created_at",
                    params![version, now],
                )?;
                tx.execute("DELETE FROM cache_entries WHERE version = ?1", params![version])?;
                for (key, response) in &entries {
                    insert_entry(&tx, &version, key, response, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Number of entries stored under a version.
    pub async fn entry_count(&self, version: &str) -> Result<u64, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE version = ?1",
                    params![version],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
