//! Calculation request
//!
//! Requests are validated up front; nothing is resolved against the store
//! until `validate` passes.

use serde::{Deserialize, Serialize};

use super::types::{CalculationLevel, EnergyType, MealType};
use crate::error::{CarbonError, Result};

pub const MAX_COOKING_MINUTES: f64 = 999.0;

/// Verified traceability data attached to an ingredient (L3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityRecord {
    #[serde(default)]
    pub lot_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    /// Weighed quantity in kg; replaces the nominal recipe weight
    #[serde(default)]
    pub verified_weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInput {
    pub name: String,
    /// Net weight in kg
    pub weight: f64,
    #[serde(default)]
    pub category: Option<String>,
    /// Overrides the configured waste rate for the category
    #[serde(default)]
    pub waste_rate: Option<f64>,
    #[serde(default)]
    pub traceability: Option<TraceabilityRecord>,
}

impl IngredientInput {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            category: None,
            waste_rate: None,
            traceability: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingInput {
    /// Material name resolved against the material factor library
    pub material: String,
    /// Container kind used to look up a configured weight (meal_box, paper_bag, ...)
    #[serde(default)]
    pub kind: Option<String>,
    /// Weight in kg; falls back to the configured weight for `kind`
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportInput {
    pub mode: String,
    /// Distance in km
    pub distance: f64,
    /// Transported mass in kg, default 1
    #[serde(default)]
    pub weight: Option<f64>,
    /// Supply-chain factor from traceability records (L3 only)
    #[serde(default)]
    pub traceability_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    /// kWh for electric kitchens, m³ for gas
    pub energy_consumption: f64,
    #[serde(default)]
    pub meter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub restaurant_id: String,
    pub meal_type: MealType,
    pub energy_type: EnergyType,
    #[serde(default)]
    pub calculation_level: CalculationLevel,
    /// Overrides the restaurant's region
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub restaurant_type: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    pub cooking_method: Option<String>,
    /// Minutes
    #[serde(default)]
    pub cooking_time: Option<f64>,
    /// Appliance power in kW; overrides the standard power model
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub packaging: Vec<PackagingInput>,
    #[serde(default)]
    pub transport: Option<TransportInput>,
    #[serde(default)]
    pub meter_reading: Option<MeterReading>,
}

impl CalculationRequest {
    pub fn new(
        restaurant_id: impl Into<String>,
        meal_type: MealType,
        energy_type: EnergyType,
        calculation_level: CalculationLevel,
    ) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            meal_type,
            energy_type,
            calculation_level,
            region: None,
            city: None,
            restaurant_type: None,
            ingredients: Vec::new(),
            cooking_method: None,
            cooking_time: None,
            power: None,
            packaging: Vec::new(),
            transport: None,
            meter_reading: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_ingredient(mut self, ingredient: IngredientInput) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    pub fn with_cooking(mut self, method: impl Into<String>, minutes: f64) -> Self {
        self.cooking_method = Some(method.into());
        self.cooking_time = Some(minutes);
        self
    }

    /// Parse a wire document. Unknown enum values and missing fields become
    /// validation errors rather than opaque serde failures.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| CarbonError::validation("request", e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.restaurant_id.trim().is_empty() {
            return Err(CarbonError::validation("restaurantId", "is required"));
        }
        if let Some(region) = &self.region {
            if region.trim().is_empty() {
                return Err(CarbonError::validation("region", "must not be blank when given"));
            }
        }

        for (i, ingredient) in self.ingredients.iter().enumerate() {
            if ingredient.name.trim().is_empty() {
                return Err(CarbonError::validation(format!("ingredients[{}].name", i), "is required"));
            }
            check_quantity(&format!("ingredients[{}].weight", i), ingredient.weight)?;
            if let Some(rate) = ingredient.waste_rate {
                check_quantity(&format!("ingredients[{}].wasteRate", i), rate)?;
            }
            if let Some(w) = ingredient.traceability.as_ref().and_then(|t| t.verified_weight) {
                check_quantity(&format!("ingredients[{}].traceability.verifiedWeight", i), w)?;
            }
        }

        if let Some(minutes) = self.cooking_time {
            if !minutes.is_finite() || !(0.0..=MAX_COOKING_MINUTES).contains(&minutes) {
                return Err(CarbonError::validation(
                    "cookingTime",
                    format!("must be between 0 and {} minutes", MAX_COOKING_MINUTES),
                ));
            }
        }
        if let Some(power) = self.power {
            check_quantity("power", power)?;
        }

        for (i, item) in self.packaging.iter().enumerate() {
            if item.material.trim().is_empty() {
                return Err(CarbonError::validation(format!("packaging[{}].material", i), "is required"));
            }
            if let Some(w) = item.weight {
                check_quantity(&format!("packaging[{}].weight", i), w)?;
            }
        }

        if let Some(transport) = &self.transport {
            if transport.mode.trim().is_empty() {
                return Err(CarbonError::validation("transport.mode", "is required"));
            }
            check_quantity("transport.distance", transport.distance)?;
            if let Some(w) = transport.weight {
                check_quantity("transport.weight", w)?;
            }
            if let Some(f) = transport.traceability_factor {
                check_quantity("transport.traceabilityFactor", f)?;
            }
        }

        if let Some(reading) = &self.meter_reading {
            check_quantity("meterReading.energyConsumption", reading.energy_consumption)?;
        }

        Ok(())
    }
}

fn check_quantity(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(CarbonError::validation(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(CarbonError::validation(field, "must not be negative"));
    }
    Ok(())
}
