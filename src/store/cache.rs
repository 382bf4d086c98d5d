//! Store Read Cache
//!
//! Short-TTL read-through cache in front of a `CarbonStore`. Entries may be
//! stale for up to the TTL; callers always select the highest-version active
//! record from whatever the cache returns.

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::CarbonStore;
use crate::error::Result;
use crate::model::{
    Baseline, ConfigDocument, EmissionFactor, EnergyType, FactorStatus, GridFactor,
    IngredientAlias, IngredientCategory, MealType,
};

struct TtlMap<K, V> {
    entries: RwLock<HashMap<K, (Instant, V)>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlMap<K, V> {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    async fn set(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(key, (Instant::now(), value));
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// A `CarbonStore` that caches every table for `ttl`
pub struct CachedStore {
    inner: Arc<dyn CarbonStore>,
    factors: TtlMap<FactorStatus, Vec<EmissionFactor>>,
    aliases: TtlMap<(), Vec<IngredientAlias>>,
    categories: TtlMap<(), Vec<IngredientCategory>>,
    baselines: TtlMap<(MealType, EnergyType), Vec<Baseline>>,
    configs: TtlMap<(), Vec<ConfigDocument>>,
    grid: TtlMap<(), Vec<GridFactor>>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn CarbonStore>, ttl: Duration) -> Self {
        Self {
            inner,
            factors: TtlMap::new(ttl),
            aliases: TtlMap::new(ttl),
            categories: TtlMap::new(ttl),
            baselines: TtlMap::new(ttl),
            configs: TtlMap::new(ttl),
            grid: TtlMap::new(ttl),
        }
    }

    /// Drop every cached table, forcing the next read through to the store.
    pub async fn invalidate(&self) {
        self.factors.clear().await;
        self.aliases.clear().await;
        self.categories.clear().await;
        self.baselines.clear().await;
        self.configs.clear().await;
        self.grid.clear().await;
        tracing::debug!("Store cache invalidated");
    }
}

#[async_trait]
impl CarbonStore for CachedStore {
    async fn emission_factors(&self, status: FactorStatus) -> Result<Vec<EmissionFactor>> {
        if let Some(cached) = self.factors.get(&status).await {
            tracing::debug!("Store cache hit: emission_factors({:?})", status);
            return Ok(cached);
        }
        let fresh = self.inner.emission_factors(status).await?;
        self.factors.set(status, fresh.clone()).await;
        Ok(fresh)
    }

    async fn ingredient_aliases(&self) -> Result<Vec<IngredientAlias>> {
        if let Some(cached) = self.aliases.get(&()).await {
            return Ok(cached);
        }
        let fresh = self.inner.ingredient_aliases().await?;
        self.aliases.set((), fresh.clone()).await;
        Ok(fresh)
    }

    async fn ingredient_categories(&self) -> Result<Vec<IngredientCategory>> {
        if let Some(cached) = self.categories.get(&()).await {
            return Ok(cached);
        }
        let fresh = self.inner.ingredient_categories().await?;
        self.categories.set((), fresh.clone()).await;
        Ok(fresh)
    }

    async fn baselines(&self, meal_type: MealType, energy_type: EnergyType) -> Result<Vec<Baseline>> {
        let key = (meal_type, energy_type);
        if let Some(cached) = self.baselines.get(&key).await {
            tracing::debug!("Store cache hit: baselines({}, {})", meal_type, energy_type);
            return Ok(cached);
        }
        let fresh = self.inner.baselines(meal_type, energy_type).await?;
        self.baselines.set(key, fresh.clone()).await;
        Ok(fresh)
    }

    async fn config_documents(&self) -> Result<Vec<ConfigDocument>> {
        if let Some(cached) = self.configs.get(&()).await {
            return Ok(cached);
        }
        let fresh = self.inner.config_documents().await?;
        self.configs.set((), fresh.clone()).await;
        Ok(fresh)
    }

    async fn grid_factors(&self) -> Result<Vec<GridFactor>> {
        if let Some(cached) = self.grid.get(&()).await {
            return Ok(cached);
        }
        let fresh = self.inner.grid_factors().await?;
        self.grid.set((), fresh.clone()).await;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoreSnapshot};

    fn snapshot_with(region: &str, factor: f64) -> StoreSnapshot {
        StoreSnapshot {
            grid_factors: vec![GridFactor {
                region: region.to_string(),
                factor,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cache_serves_stale_until_invalidated() {
        let backing = Arc::new(InMemoryStore::new(snapshot_with("east_china", 0.7035)));
        let cache = CachedStore::new(backing.clone(), Duration::from_secs(300));

        assert_eq!(cache.grid_factors().await.unwrap()[0].factor, 0.7035);

        backing.replace(snapshot_with("east_china", 0.8)).await;
        assert_eq!(cache.grid_factors().await.unwrap()[0].factor, 0.7035);

        cache.invalidate().await;
        assert_eq!(cache.grid_factors().await.unwrap()[0].factor, 0.8);
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let backing = Arc::new(InMemoryStore::new(snapshot_with("north_china", 0.9419)));
        let cache = CachedStore::new(backing.clone(), Duration::from_millis(20));

        cache.grid_factors().await.unwrap();
        backing.replace(snapshot_with("north_china", 1.0)).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.grid_factors().await.unwrap()[0].factor, 1.0);
    }
}
