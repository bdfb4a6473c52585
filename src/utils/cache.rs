use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::{MdnaError, Result};

/// A fetched response body as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub fetched_at: DateTime<Utc>,
    pub content_type: Option<String>,
    pub body: String,
}

impl CachedResponse {
    pub fn new(content_type: Option<String>, body: String) -> Self {
        Self {
            fetched_at: Utc::now(),
            content_type,
            body,
        }
    }
}

/// Read-through HTTP response cache keyed by request URL, backed by sled.
#[derive(Clone)]
pub struct ResponseCache {
    db: sled::Db,
    ttl: Duration,
}

impl ResponseCache {
    /// Opens (or creates) the cache at `path` and prunes expired entries.
    pub fn open(path: &Path, ttl: Duration) -> Result<Self> {
        let db = sled::open(path)?;
        let cache = Self { db, ttl };
        let pruned = cache.prune_expired()?;
        debug!(
            "Opened response cache at {:?} ({} entries, {} pruned)",
            path,
            cache.len(),
            pruned
        );
        Ok(cache)
    }

    /// In-memory cache that disappears when dropped.
    pub fn temporary(ttl: Duration) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db, ttl })
    }

    pub fn get(&self, url: &str) -> Result<Option<CachedResponse>> {
        self.get_at(url, Utc::now())
    }

    fn get_at(&self, url: &str, now: DateTime<Utc>) -> Result<Option<CachedResponse>> {
        let Some(raw) = self.db.get(url.as_bytes())? else {
            return Ok(None);
        };
        let entry: CachedResponse = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", url, e);
                self.db.remove(url.as_bytes())?;
                return Ok(None);
            }
        };
        if self.is_expired(&entry, now) {
            debug!("Cache entry for {} expired", url);
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub fn insert(&self, url: &str, entry: &CachedResponse) -> Result<()> {
        let raw = serde_json::to_vec(entry)?;
        self.db.insert(url.as_bytes(), raw)?;
        self.db
            .flush()
            .map_err(|e| MdnaError::Cache(format!("failed to flush entry for {}: {}", url, e)))?;
        Ok(())
    }

    pub fn prune_expired(&self) -> Result<usize> {
        self.prune_expired_at(Utc::now())
    }

    fn prune_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut pruned = 0;
        for item in self.db.iter() {
            let (key, raw) = item?;
            let expired = match serde_json::from_slice::<CachedResponse>(&raw) {
                Ok(entry) => self.is_expired(&entry, now),
                Err(_) => true,
            };
            if expired {
                self.db.remove(key)?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    pub fn clear(&self) -> Result<()> {
        self.db.clear()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    fn is_expired(&self, entry: &CachedResponse, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.fetched_at)
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}
