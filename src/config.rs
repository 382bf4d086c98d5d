//! Calculation Configuration
//!
//! Typed view over the keyed `(configType, configKey, category) -> value`
//! documents. Built once per calculation, before any arithmetic, so invalid
//! documents fail the call early.

use std::collections::HashMap;

use crate::classify::{self, CarbonLevelConfig};
use crate::error::{CarbonError, Result};
use crate::model::{ConfigDocument, EnergyType};

pub const WASTE_RATE_KEY: &str = "ingredient_waste_rate";
pub const ELECTRIC_FACTOR_KEY: &str = "default_electric_factor";
pub const GAS_FACTOR_KEY: &str = "default_gas_factor";
pub const COOKING_TIME_KEY: &str = "standard_time_model";
pub const COOKING_POWER_KEY: &str = "standard_power_model";
pub const PACKAGING_WEIGHT_KEY: &str = "packaging_weight";
pub const DEFAULT_PACKAGING_KEY: &str = "default_packaging_carbon";

/// Minutes used when the method is unknown to both config and built-ins
pub const FALLBACK_COOKING_MINUTES: f64 = 10.0;
/// kW used when the method is unknown to both config and built-ins
pub const FALLBACK_COOKING_POWER: f64 = 2.0;

const BUILTIN_COOKING_MINUTES: [(&str, f64); 6] = [
    ("raw", 0.0),
    ("steamed", 15.0),
    ("boiled", 20.0),
    ("stir_fried", 5.0),
    ("fried", 8.0),
    ("baked", 45.0),
];

const BUILTIN_COOKING_POWER: [(&str, f64); 6] = [
    ("raw", 0.0),
    ("steamed", 2.0),
    ("boiled", 1.5),
    ("stir_fried", 3.0),
    ("fried", 5.0),
    ("baked", 4.0),
];

#[derive(Debug, Clone)]
pub struct CalculationConfig {
    waste_rates: HashMap<String, f64>,
    electric_factor: Option<f64>,
    gas_factor: Option<f64>,
    cooking_minutes: HashMap<String, f64>,
    cooking_power: HashMap<String, f64>,
    packaging_weights: HashMap<String, f64>,
    default_packaging_carbon: f64,
    carbon_levels: CarbonLevelConfig,
}

impl CalculationConfig {
    pub fn from_documents(docs: &[ConfigDocument]) -> Result<Self> {
        let carbon_levels = CarbonLevelConfig::from_documents(docs)?;

        let mut config = Self {
            waste_rates: HashMap::new(),
            electric_factor: None,
            gas_factor: None,
            cooking_minutes: HashMap::new(),
            cooking_power: HashMap::new(),
            packaging_weights: HashMap::new(),
            default_packaging_carbon: 0.0,
            carbon_levels,
        };

        for doc in docs {
            if doc.config_type == classify::CONFIG_TYPE {
                continue;
            }
            let category = doc.category.as_deref().map(normalize_key);
            match (doc.config_type.as_str(), doc.config_key.as_str()) {
                ("waste_rate", WASTE_RATE_KEY) => {
                    let rate = non_negative(doc)?;
                    if let Some(category) = category {
                        config.waste_rates.insert(category, rate);
                    }
                }
                ("energy_factor", ELECTRIC_FACTOR_KEY) => config.electric_factor = Some(non_negative(doc)?),
                ("energy_factor", GAS_FACTOR_KEY) => config.gas_factor = Some(non_negative(doc)?),
                ("cooking_time", COOKING_TIME_KEY) => {
                    let minutes = non_negative(doc)?;
                    if let Some(method) = category {
                        config.cooking_minutes.insert(method, minutes);
                    }
                }
                ("cooking_power", COOKING_POWER_KEY) => {
                    let kw = non_negative(doc)?;
                    if let Some(method) = category {
                        config.cooking_power.insert(method, kw);
                    }
                }
                ("packaging", PACKAGING_WEIGHT_KEY) => {
                    let kg = non_negative(doc)?;
                    if let Some(kind) = category {
                        config.packaging_weights.insert(kind, kg);
                    }
                }
                ("packaging", DEFAULT_PACKAGING_KEY) => config.default_packaging_carbon = non_negative(doc)?,
                (config_type, config_key) => {
                    tracing::debug!("Ignoring unrecognised config document {}/{}", config_type, config_key);
                }
            }
        }

        Ok(config)
    }

    /// Waste rate for an ingredient category; 0 when not configured.
    pub fn waste_rate(&self, category: Option<&str>) -> f64 {
        category
            .and_then(|c| self.waste_rates.get(&normalize_key(c)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Configured default factor for an energy type with the key it came from.
    /// `mixed` has no single default and is blended by the caller.
    pub fn default_energy_factor(&self, energy_type: EnergyType) -> Option<(&'static str, f64)> {
        match energy_type {
            EnergyType::Electric => self.electric_factor.map(|v| (ELECTRIC_FACTOR_KEY, v)),
            EnergyType::Gas => self.gas_factor.map(|v| (GAS_FACTOR_KEY, v)),
            EnergyType::Mixed => None,
        }
    }

    pub fn standard_minutes(&self, method: &str) -> f64 {
        let key = normalize_key(method);
        self.cooking_minutes
            .get(&key)
            .copied()
            .or_else(|| builtin(&BUILTIN_COOKING_MINUTES, &key))
            .unwrap_or(FALLBACK_COOKING_MINUTES)
    }

    pub fn standard_power(&self, method: &str) -> f64 {
        let key = normalize_key(method);
        self.cooking_power
            .get(&key)
            .copied()
            .or_else(|| builtin(&BUILTIN_COOKING_POWER, &key))
            .unwrap_or(FALLBACK_COOKING_POWER)
    }

    pub fn packaging_weight(&self, kind: &str) -> Option<f64> {
        self.packaging_weights.get(&normalize_key(kind)).copied()
    }

    pub fn default_packaging_carbon(&self) -> f64 {
        self.default_packaging_carbon
    }

    pub fn carbon_levels(&self) -> &CarbonLevelConfig {
        &self.carbon_levels
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn builtin(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn document_name(doc: &ConfigDocument) -> String {
    match &doc.category {
        Some(category) => format!("{}/{}/{}", doc.config_type, doc.config_key, category),
        None => format!("{}/{}", doc.config_type, doc.config_key),
    }
}

fn non_negative(doc: &ConfigDocument) -> Result<f64> {
    let value = doc.value.as_f64().ok_or_else(|| {
        CarbonError::config_invalid(document_name(doc), format!("expected a number, got {}", doc.value))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(CarbonError::config_invalid(
            document_name(doc),
            format!("must be a non-negative number, got {}", value),
        ));
    }
    Ok(value)
}
