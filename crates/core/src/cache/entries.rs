//! Cache entry operations.
//!
//! Entries are keyed by (store, hash of method + URL). Only `GET`
//! requests are ever stored or matched.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::{Error, RequestDescriptor, ResponseSnapshot};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Listing metadata for a stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub stored_at: String,
}

fn decode_headers(json: &str) -> Result<Vec<(String, String)>, Error> {
    serde_json::from_str(json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))
}

impl CacheDb {
    /// Store a response for a request in the named store.
    ///
    /// Uses UPSERT semantics so the most recent write wins. The store is
    /// created if it does not exist yet. Non-`GET` requests are rejected.
    pub async fn put_entry(
        &self, store: &str, request: &RequestDescriptor, response: &ResponseSnapshot,
    ) -> Result<(), Error> {
        if !request.is_cacheable() {
            return Err(Error::InvalidInput(format!("{} requests are not cacheable", request.method)));
        }

        let store = store.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        let method = request.method.clone();
        let url = request.url.to_string();
        let status = response.status;
        let status_text = response.status_text.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        let body = response.body.to_vec();
        let now = chrono::Utc::now();
        let created_at = now.to_rfc3339();
        let stored_at = now.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, created_at],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                    store, key_hash, method, url, status, status_text, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(store, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![store, key_hash, method, url, status, status_text, headers_json, body, stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request.
    ///
    /// Returns None on a miss, when the store does not exist, and for
    /// any non-`GET` request (storage is not consulted at all).
    pub async fn match_entry(&self, store: &str, request: &RequestDescriptor) -> Result<Option<ResponseSnapshot>, Error> {
        if !request.is_cacheable() {
            return Ok(None);
        }

        let store = store.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => Ok(Some(ResponseSnapshot {
                        status,
                        status_text,
                        headers: decode_headers(&headers_json)?,
                        body: Bytes::from(body),
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a `GET` entry by URL.
    pub async fn match_url(&self, store: &str, url: &Url) -> Result<Option<ResponseSnapshot>, Error> {
        self.match_entry(store, &RequestDescriptor::get(url.clone())).await
    }

    /// Delete the entry for a request. Returns false if nothing was stored.
    pub async fn delete_entry(&self, store: &str, request: &RequestDescriptor) -> Result<bool, Error> {
        if !request.is_cacheable() {
            return Ok(false);
        }

        let store = store.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the named store.
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List entry metadata in the named store, newest first.
    pub async fn list_entries(&self, store: &str) -> Result<Vec<EntryMeta>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, LENGTH(body), stored_at
                FROM cache_entries WHERE store = ?1
                ORDER BY stored_at DESC, rowid DESC",
                )?;
                let entries = stmt
                    .query_map(params![store], |row| {
                        Ok(EntryMeta {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            size: row.get::<_, i64>(3)? as u64,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries in a store until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru_entries(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE rowid IN (
                    SELECT rowid FROM cache_entries WHERE store = ?1
                    ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
