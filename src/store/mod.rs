//! Store Module
//!
//! Read-only repository interfaces the engine depends on. The engine never
//! writes these tables; authoring happens elsewhere.

pub mod cache;
pub mod memory;

pub use cache::CachedStore;
pub use memory::{InMemoryStore, StoreSnapshot};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::{CarbonError, Result};
use crate::model::{
    Baseline, ConfigDocument, EmissionFactor, EnergyType, FactorStatus, GridFactor,
    IngredientAlias, IngredientCategory, MealType, MenuItem, Restaurant,
};

/// Factor, baseline and configuration tables
#[async_trait]
pub trait CarbonStore: Send + Sync {
    async fn emission_factors(&self, status: FactorStatus) -> Result<Vec<EmissionFactor>>;

    async fn ingredient_aliases(&self) -> Result<Vec<IngredientAlias>>;

    async fn ingredient_categories(&self) -> Result<Vec<IngredientCategory>>;

    /// Every baseline (any status, any region) for the meal/energy pair
    async fn baselines(&self, meal_type: MealType, energy_type: EnergyType) -> Result<Vec<Baseline>>;

    async fn config_documents(&self) -> Result<Vec<ConfigDocument>>;

    async fn grid_factors(&self) -> Result<Vec<GridFactor>>;
}

/// Restaurant and menu-item records used by batch recalculation
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn restaurant(&self, restaurant_id: &str) -> Result<Option<Restaurant>>;

    /// Menu items of a restaurant; an empty `ids` slice means all of them
    async fn menu_items(&self, restaurant_id: &str, ids: &[String]) -> Result<Vec<MenuItem>>;
}

/// Run a store read under a deadline.
pub async fn bounded<T, F>(operation: &str, deadline: Duration, read: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, read).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Store read '{}' exceeded {:?}", operation, deadline);
            Err(CarbonError::StoreTimeout {
                operation: operation.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, CarbonError>(1)
        };
        let err = bounded("slow_read", Duration::from_millis(10), slow).await.unwrap_err();
        assert_eq!(err, CarbonError::StoreTimeout { operation: "slow_read".into() });
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let value = bounded("fast_read", Duration::from_secs(1), async { Ok::<_, CarbonError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
