//! Records owned by the menu service and read during batch recalculation

use serde::{Deserialize, Serialize};

use super::request::{IngredientInput, PackagingInput, TransportInput};
use super::types::{CalculationLevel, EnergyType, MealType, RecordStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub restaurant_id: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub restaurant_type: Option<String>,
}

/// A menu item with the calculation inputs saved alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub menu_item_id: String,
    pub restaurant_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub meal_type: Option<MealType>,
    #[serde(default)]
    pub energy_type: Option<EnergyType>,
    #[serde(default)]
    pub calculation_level: Option<CalculationLevel>,
    #[serde(default)]
    pub restaurant_region: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    pub cooking_method: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<f64>,
    #[serde(default)]
    pub packaging: Vec<PackagingInput>,
    #[serde(default)]
    pub transport: Option<TransportInput>,
    #[serde(default)]
    pub status: RecordStatus,
}

/// Keyed configuration document `(configType, configKey, category) -> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    pub config_type: String,
    pub config_key: String,
    #[serde(default)]
    pub category: Option<String>,
    pub value: serde_json::Value,
    #[serde(default)]
    pub status: RecordStatus,
}

impl ConfigDocument {
    pub fn new(
        config_type: impl Into<String>,
        config_key: impl Into<String>,
        category: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            config_type: config_type.into(),
            config_key: config_key.into(),
            category: Some(category.into()),
            value,
            status: RecordStatus::Active,
        }
    }
}
