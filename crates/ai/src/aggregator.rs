//! Insights orchestration: cache lookup → snapshot → prompt → model → parse → store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use shopdesk_core::{Clock, ShopId, SystemClock, TenantId};

use crate::bundle::InsightBundle;
use crate::cache::{CacheKey, InsightsCache};
use crate::error::InsightError;
use crate::model::LanguageModel;
use crate::parse::parse_insights;
use crate::prompt::build_prompt;
use crate::snapshot::{ShopDataSource, SnapshotWindow};

type GenerationResult = Result<InsightBundle, InsightError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Lifetime of a cached bundle.
    pub ttl_minutes: u32,
    /// Most recent sales included in the prompt.
    pub max_sales: usize,
    /// How far back the sales query reaches.
    pub window_days: u32,
    /// Share one in-flight generation between concurrent misses for a key.
    pub dedupe_in_flight: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            max_sales: 50,
            window_days: 30,
            dedupe_in_flight: true,
        }
    }
}

/// Per-shop insights with a TTL cache in front of the model.
///
/// Constructed once at startup and shared via `Arc`; there is no global state.
pub struct InsightsAggregator {
    source: Arc<dyn ShopDataSource>,
    model: Arc<dyn LanguageModel>,
    cache: Arc<InsightsCache>,
    clock: Arc<dyn Clock>,
    config: AggregatorConfig,
    in_flight: Mutex<HashMap<CacheKey, broadcast::Sender<GenerationResult>>>,
}

enum Lookup {
    Hit(InsightBundle),
    Follow(broadcast::Receiver<GenerationResult>),
    Lead,
}

impl InsightsAggregator {
    pub fn new(source: Arc<dyn ShopDataSource>, model: Arc<dyn LanguageModel>, config: AggregatorConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_clock(source, model, config, clock)
    }

    /// Build with an explicit clock; the cache shares it.
    pub fn with_clock(
        source: Arc<dyn ShopDataSource>,
        model: Arc<dyn LanguageModel>,
        config: AggregatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            model,
            cache: Arc::new(InsightsCache::with_clock(clock.clone())),
            clock,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<InsightsCache> {
        &self.cache
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Number of generations currently running.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Return the shop's insights, generating them on a cache miss.
    pub async fn generate_insights(&self, tenant_id: TenantId, shop_id: ShopId) -> GenerationResult {
        let key = CacheKey::insights(tenant_id, shop_id);

        if let Some(hit) = self.cache.get_cached(&key) {
            debug!(key = %key, "insights cache hit");
            return Ok(hit);
        }
        debug!(key = %key, "insights cache miss");

        self.generate_shared(key, tenant_id, shop_id, true).await
    }

    /// Generate a new bundle regardless of the cached one.
    ///
    /// The cached entry is replaced only when generation succeeds; on failure
    /// the previous bundle stays in place until its TTL runs out.
    pub async fn refresh(&self, tenant_id: TenantId, shop_id: ShopId) -> GenerationResult {
        let key = CacheKey::insights(tenant_id, shop_id);
        debug!(key = %key, "insights refresh requested");
        self.generate_shared(key, tenant_id, shop_id, false).await
    }

    async fn generate_shared(
        &self,
        key: CacheKey,
        tenant_id: TenantId,
        shop_id: ShopId,
        reuse_cached: bool,
    ) -> GenerationResult {
        if !self.config.dedupe_in_flight {
            return self.regenerate(&key, tenant_id, shop_id).await;
        }

        match self.lookup_or_lead(&key, reuse_cached) {
            Lookup::Hit(bundle) => Ok(bundle),
            Lookup::Follow(mut rx) => {
                debug!(key = %key, "awaiting in-flight insights generation");
                rx.recv().await.unwrap_or_else(|_| {
                    Err(InsightError::GenerationFailure(
                        "in-flight generation was abandoned".to_string(),
                    ))
                })
            }
            Lookup::Lead => {
                let marker = InFlight {
                    map: &self.in_flight,
                    key: key.clone(),
                    done: false,
                };
                let result = self.regenerate(&key, tenant_id, shop_id).await;
                marker.complete(&result);
                result
            }
        }
    }

    fn lookup_or_lead(&self, key: &CacheKey, reuse_cached: bool) -> Lookup {
        let mut in_flight = lock(&self.in_flight);

        // A leader may have stored its bundle between our miss and taking the lock.
        if reuse_cached {
            if let Some(hit) = self.cache.get_cached(key) {
                return Lookup::Hit(hit);
            }
        }

        match in_flight.get(key) {
            Some(tx) => Lookup::Follow(tx.subscribe()),
            None => {
                let (tx, _rx) = broadcast::channel(1);
                in_flight.insert(key.clone(), tx);
                Lookup::Lead
            }
        }
    }

    async fn regenerate(&self, key: &CacheKey, tenant_id: TenantId, shop_id: ShopId) -> GenerationResult {
        let result = self.generate_uncached(tenant_id, shop_id).await;
        match &result {
            Ok(bundle) => {
                self.cache
                    .set_cache(key.clone(), bundle.clone(), self.config.ttl_minutes);
            }
            Err(e) => {
                warn!(key = %key, kind = e.code(), error = %e, "insights generation failed");
            }
        }
        result
    }

    async fn generate_uncached(&self, tenant_id: TenantId, shop_id: ShopId) -> GenerationResult {
        let now = self.clock.now();
        let window = SnapshotWindow::ending_at(now, self.config.window_days, self.config.max_sales);

        let snapshot = self.source.snapshot(tenant_id, shop_id, window).await?;
        let prompt = build_prompt(&snapshot);

        let started = Instant::now();
        let raw = self.model.complete(&prompt).await?;
        let bundle = parse_insights(&raw)?.into_bundle(now);

        info!(
            tenant = %tenant_id,
            shop = %shop_id,
            model = self.model.model_id(),
            sales = snapshot.sales.len(),
            predictions = bundle.predictions.len(),
            restocking = bundle.restocking.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "insights generated"
        );
        Ok(bundle)
    }
}

/// Marker for a running generation. Clears the map entry on completion, or
/// on drop if the leading request is cancelled, so followers never hang.
struct InFlight<'a> {
    map: &'a Mutex<HashMap<CacheKey, broadcast::Sender<GenerationResult>>>,
    key: CacheKey,
    done: bool,
}

impl InFlight<'_> {
    fn complete(mut self, result: &GenerationResult) {
        self.done = true;
        if let Some(tx) = lock(self.map).remove(&self.key) {
            let _ = tx.send(result.clone());
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            lock(self.map).remove(&self.key);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
