//! Emission factor records and the lookup tables that feed the resolver

use serde::{Deserialize, Serialize};

use super::types::RecordStatus;

/// Factor-library region used when nothing more specific applies
pub const NATIONAL_FACTOR_REGION: &str = "CN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorStatus {
    Active,
    Pending,
    Archived,
}

/// Which library a factor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Ingredient,
    Energy,
    Material,
    Transport,
}

impl FactorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorCategory::Ingredient => "ingredient",
            FactorCategory::Energy => "energy",
            FactorCategory::Material => "material",
            FactorCategory::Transport => "transport",
        }
    }
}

fn default_unit() -> String {
    "kg CO₂e/kg".to_string()
}

fn default_region() -> String {
    NATIONAL_FACTOR_REGION.to_string()
}

/// A per-unit carbon coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionFactor {
    pub factor_id: String,
    /// Canonical name
    pub name: String,
    #[serde(default)]
    pub alias: Vec<String>,
    pub category: FactorCategory,
    #[serde(default)]
    pub sub_category: Option<String>,
    /// Pending factors may not have a value yet
    #[serde(default)]
    pub factor_value: Option<f64>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub source: Option<String>,
    pub status: FactorStatus,
}

impl EmissionFactor {
    /// Value usable in a calculation: active, present, finite and non-negative.
    pub fn usable_value(&self) -> Option<f64> {
        if self.status != FactorStatus::Active {
            return None;
        }
        self.factor_value.filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn is_usable(&self) -> bool {
        self.usable_value().is_some()
    }
}

/// Alias table row: alias -> standard ingredient name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientAlias {
    pub alias: String,
    pub standard_name: String,
    #[serde(default)]
    pub status: RecordStatus,
}

/// Ingredient category with the keywords used to infer it from a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientCategory {
    pub category_code: String,
    /// Factor-library sub-category holding the category's representative factor
    pub factor_sub_category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub status: RecordStatus,
}

/// Relative carbon intensity of a region's electricity grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridFactor {
    pub region: String,
    pub factor: f64,
}
