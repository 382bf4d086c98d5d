//! Baseline records
//!
//! A baseline is the reference footprint for a (meal type, region, energy
//! type) tuple, optionally narrowed by city and restaurant type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{EnergyType, MealType, RecordStatus};

/// Baseline region used as the last fallback
pub const NATIONAL_BASELINE_REGION: &str = "national_average";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineCategory {
    pub meal_type: MealType,
    pub region: String,
    pub energy_type: EnergyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_type: Option<String>,
}

impl BaselineCategory {
    /// Deterministic identity of the category tuple
    pub fn baseline_id(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.meal_type,
            self.region,
            self.energy_type,
            self.city.as_deref().unwrap_or("default"),
            self.restaurant_type.as_deref().unwrap_or("default")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

fn default_footprint_unit() -> String {
    "kg CO₂e".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineFootprint {
    pub value: f64,
    #[serde(default)]
    pub uncertainty: Option<f64>,
    #[serde(default)]
    pub confidence_interval: Option<ConfidenceInterval>,
    #[serde(default = "default_footprint_unit")]
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BaselineBreakdown {
    pub ingredients: f64,
    pub cooking_energy: f64,
    pub packaging: f64,
    #[serde(default)]
    pub other: f64,
}

impl BaselineBreakdown {
    pub fn total(&self) -> f64 {
        self.ingredients + self.cooking_energy + self.packaging + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    #[serde(default)]
    pub baseline_id: Option<String>,
    pub category: BaselineCategory,
    /// Region whose grid the cooking-energy share was authored against
    #[serde(default)]
    pub reference_region: Option<String>,
    pub carbon_footprint: BaselineFootprint,
    pub breakdown: BaselineBreakdown,
    pub version: u32,
    #[serde(default)]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub source: Option<String>,
}

impl Baseline {
    pub fn id(&self) -> String {
        self.baseline_id
            .clone()
            .unwrap_or_else(|| self.category.baseline_id())
    }

    pub fn reference_region(&self) -> &str {
        self.reference_region
            .as_deref()
            .unwrap_or(&self.category.region)
    }

    /// Active and inside its effective window. Missing dates are unbounded.
    pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
        if self.status != RecordStatus::Active {
            return false;
        }
        let started = self.effective_date.map_or(true, |d| d <= now);
        let not_expired = self.expiry_date.map_or(true, |d| now <= d);
        started && not_expired
    }

    /// Interval used to judge a footprint against this baseline: the authored
    /// interval, else `value ± uncertainty`, else `value ± 10%`.
    pub fn comparison_interval(&self) -> ConfidenceInterval {
        let value = self.carbon_footprint.value;
        if let Some(ci) = self.carbon_footprint.confidence_interval {
            return ci;
        }
        let spread = self
            .carbon_footprint
            .uncertainty
            .unwrap_or(value * DEFAULT_UNCERTAINTY_RATIO);
        ConfidenceInterval {
            lower: (value - spread).max(0.0),
            upper: value + spread,
        }
    }
}

pub const DEFAULT_UNCERTAINTY_RATIO: f64 = 0.1;
