//! In-memory TTL cache for insight bundles.
//!
//! Expiry is lazy: an entry past its `expires_at` is removed the next time it
//! is read (or by an explicit `purge_expired`). There is no background sweep
//! and no capacity bound; keys are one per shop.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use shopdesk_core::{Clock, ShopId, SystemClock, TenantId};

use crate::bundle::InsightBundle;

/// Cache key, unique per (tenant, shop).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key for a shop's bundled insights.
    pub fn insights(tenant_id: TenantId, shop_id: ShopId) -> Self {
        Self(format!("insights:{tenant_id}:{shop_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    expires_at: DateTime<Utc>,
}

pub type InsightsCache = TtlCache<InsightBundle>;

pub struct TtlCache<V> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> core::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TtlCache").field("len", &self.len()).finish()
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop an entry regardless of freshness. Returns whether one existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        match self.entries.write() {
            Ok(mut map) => map.remove(key).is_some(),
            Err(_) => false,
        }
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        match self.entries.write() {
            Ok(mut map) => {
                let before = map.len();
                map.retain(|_k, e| now < e.expires_at);
                before - map.len()
            }
            Err(_) => 0,
        }
    }

    /// Expiry of a fresh entry, if any.
    pub fn expires_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let map = self.entries.read().ok()?;
        map.get(key)
            .filter(|e| now < e.expires_at)
            .map(|e| e.expires_at)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Return the stored value if `now < expires_at`.
    ///
    /// An expired entry is removed on this read and reported as absent.
    pub fn get_cached(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        {
            let map = self.entries.read().ok()?;
            match map.get(key) {
                None => return None,
                Some(e) if now < e.expires_at => return Some(e.data.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent writer may have replaced
        // the stale entry with a fresh one in between.
        if let Ok(mut map) = self.entries.write() {
            if map.get(key).is_some_and(|e| now >= e.expires_at) {
                map.remove(key);
            }
        }
        None
    }

    /// Store or overwrite unconditionally with `expires_at = now + ttl_minutes`.
    pub fn set_cache(&self, key: CacheKey, data: V, ttl_minutes: u32) {
        let expires_at = self.clock.now() + Duration::milliseconds(i64::from(ttl_minutes) * 60_000);
        if let Ok(mut map) = self.entries.write() {
            map.insert(key, CacheEntry { data, expires_at });
        }
    }
}
