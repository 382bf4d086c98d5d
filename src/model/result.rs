//! Calculation result value object

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::baseline::ConfidenceInterval;
use super::types::{CalculationLevel, CarbonLevel};

/// How a term's emission factor was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Alias,
    CategoryInferred,
    Missing,
}

/// Provenance of the quantity that multiplied the factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    Nominal,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Ingredient,
    Energy,
    Packaging,
    Transport,
}

/// One resolved (or unresolved) term of the footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorMatch {
    pub term: TermKind,
    pub name: String,
    pub match_type: MatchType,
    pub factor_id: Option<String>,
    pub factor_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Quantity the factor was applied to (kg, kWh, m³, km·kg)
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waste_rate: Option<f64>,
    pub carbon: f64,
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<String>,
}

impl FactorMatch {
    pub fn is_missing(&self) -> bool {
        self.match_type == MatchType::Missing
    }
}

/// Footprint split by origin. `other` is only populated from baselines (L1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Breakdown {
    pub ingredients: f64,
    pub energy: f64,
    pub packaging: f64,
    pub transport: f64,
    #[serde(default)]
    pub other: f64,
}

impl Breakdown {
    pub fn total(&self) -> f64 {
        self.ingredients + self.energy + self.packaging + self.transport + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonFootprint {
    pub value: f64,
    /// Absent when no baseline resolved (L2/L3 only)
    pub baseline: Option<f64>,
    /// `max(0, baseline - value)`; absent without a baseline
    pub reduction: Option<f64>,
    pub breakdown: Breakdown,
}

/// Which rung of the baseline fallback chain answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineFallback {
    Exact,
    RegionDefault,
    NationalDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineInfo {
    pub baseline_id: String,
    pub version: u32,
    pub source: Option<String>,
    pub fallback: BaselineFallback,
    pub reference_region: String,
    /// Grid ratio applied to the cooking-energy share (1.0 when unadjusted)
    pub grid_ratio: f64,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineComparison {
    SignificantReduction,
    WithinBand,
    AboveBand,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationFlag {
    pub needs_optimization: bool,
    pub warning_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemCarbonResult {
    pub calculation_level: CalculationLevel,
    pub carbon_footprint: CarbonFootprint,
    pub factor_match_info: Vec<FactorMatch>,
    pub calculated_at: DateTime<Utc>,
    /// At least one term had no resolvable factor and counted as zero
    pub incomplete: bool,
    pub carbon_level: CarbonLevel,
    pub carbon_level_color: String,
    pub baseline_info: Option<BaselineInfo>,
    pub baseline_comparison: BaselineComparison,
    pub optimization_flag: OptimizationFlag,
    pub is_estimated: bool,
    pub has_meter_reading: bool,
}
