//! In-memory store backed by a JSON snapshot
//!
//! Used by the CLI and by tests as a fake repository.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tokio::sync::RwLock;

use super::{CarbonStore, MenuStore};
use crate::error::{CarbonError, Result};
use crate::model::{
    Baseline, ConfigDocument, EmissionFactor, EnergyType, FactorStatus, GridFactor,
    IngredientAlias, IngredientCategory, MealType, MenuItem, RecordStatus, Restaurant,
};

/// Full set of tables, as exported from the document database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub emission_factors: Vec<EmissionFactor>,
    #[serde(default)]
    pub ingredient_aliases: Vec<IngredientAlias>,
    #[serde(default)]
    pub ingredient_categories: Vec<IngredientCategory>,
    #[serde(default)]
    pub baselines: Vec<Baseline>,
    #[serde(default)]
    pub config_documents: Vec<ConfigDocument>,
    #[serde(default)]
    pub grid_factors: Vec<GridFactor>,
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

pub struct InMemoryStore {
    snapshot: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CarbonError::Store(format!("reading {}: {}", path.display(), e)))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .map_err(|e| CarbonError::Store(format!("parsing {}: {}", path.display(), e)))?;
        tracing::info!(
            "Loaded snapshot {}: {} factors, {} baselines, {} menu items",
            path.display(),
            snapshot.emission_factors.len(),
            snapshot.baselines.len(),
            snapshot.menu_items.len()
        );
        Ok(Self::new(snapshot))
    }

    /// Swap in newly authored data, as an external workflow would.
    pub async fn replace(&self, snapshot: StoreSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

#[async_trait]
impl CarbonStore for InMemoryStore {
    async fn emission_factors(&self, status: FactorStatus) -> Result<Vec<EmissionFactor>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .emission_factors
            .iter()
            .filter(|f| f.status == status)
            .cloned()
            .collect())
    }

    async fn ingredient_aliases(&self) -> Result<Vec<IngredientAlias>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .ingredient_aliases
            .iter()
            .filter(|a| a.status == RecordStatus::Active)
            .cloned()
            .collect())
    }

    async fn ingredient_categories(&self) -> Result<Vec<IngredientCategory>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .ingredient_categories
            .iter()
            .filter(|c| c.status == RecordStatus::Active)
            .cloned()
            .collect())
    }

    async fn baselines(&self, meal_type: MealType, energy_type: EnergyType) -> Result<Vec<Baseline>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .baselines
            .iter()
            .filter(|b| b.category.meal_type == meal_type && b.category.energy_type == energy_type)
            .cloned()
            .collect())
    }

    async fn config_documents(&self) -> Result<Vec<ConfigDocument>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .config_documents
            .iter()
            .filter(|d| d.status == RecordStatus::Active)
            .cloned()
            .collect())
    }

    async fn grid_factors(&self) -> Result<Vec<GridFactor>> {
        Ok(self.snapshot.read().await.grid_factors.clone())
    }
}

#[async_trait]
impl MenuStore for InMemoryStore {
    async fn restaurant(&self, restaurant_id: &str) -> Result<Option<Restaurant>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .restaurants
            .iter()
            .find(|r| r.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn menu_items(&self, restaurant_id: &str, ids: &[String]) -> Result<Vec<MenuItem>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .menu_items
            .iter()
            .filter(|m| m.restaurant_id == restaurant_id)
            .filter(|m| ids.is_empty() || ids.contains(&m.menu_item_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_snapshot_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let doc = json!({
            "emissionFactors": [
                {"factorId": "ef-1", "name": "大米", "category": "ingredient", "factorValue": 1.2, "status": "active"},
                {"factorId": "ef-2", "name": "小米", "category": "ingredient", "status": "pending"}
            ],
            "restaurants": [{"restaurantId": "r-1", "region": "east_china"}]
        });
        write!(file, "{}", doc).unwrap();

        let store = InMemoryStore::load(file.path()).await.unwrap();
        let active = store.emission_factors(FactorStatus::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].factor_id, "ef-1");

        let restaurant = store.restaurant("r-1").await.unwrap().unwrap();
        assert_eq!(restaurant.region.as_deref(), Some("east_china"));
        assert!(store.restaurant("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = InMemoryStore::load(file.path()).await.err().unwrap();
        assert!(matches!(err, CarbonError::Store(_)));
    }
}
