use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CarbonError;

/// Meal category a baseline is authored for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    MeatSimple,
    MeatFull,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::MeatSimple => "meat_simple",
            MealType::MeatFull => "meat_full",
        }
    }
}

impl FromStr for MealType {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "meat_simple" => Ok(MealType::MeatSimple),
            "meat_full" => Ok(MealType::MeatFull),
            other => Err(CarbonError::validation(
                "mealType",
                format!("unknown meal type '{}', expected meat_simple or meat_full", other),
            )),
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kitchen energy supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyType {
    Electric,
    Gas,
    Mixed,
}

impl EnergyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyType::Electric => "electric",
            EnergyType::Gas => "gas",
            EnergyType::Mixed => "mixed",
        }
    }
}

impl FromStr for EnergyType {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "electric" => Ok(EnergyType::Electric),
            "gas" => Ok(EnergyType::Gas),
            "mixed" => Ok(EnergyType::Mixed),
            other => Err(CarbonError::validation(
                "energyType",
                format!("unknown energy type '{}', expected electric, gas or mixed", other),
            )),
        }
    }
}

impl std::fmt::Display for EnergyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data fidelity of a calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CalculationLevel {
    /// Baseline-only estimate
    L1,
    /// Recipe-level (standard BOM + standard energy model)
    #[default]
    L2,
    /// Verified weights, meter readings, traceable factors
    L3,
}

impl FromStr for CalculationLevel {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L1" | "l1" => Ok(CalculationLevel::L1),
            "L2" | "l2" => Ok(CalculationLevel::L2),
            "L3" | "l3" => Ok(CalculationLevel::L3),
            other => Err(CarbonError::validation(
                "calculationLevel",
                format!("unknown calculation level '{}', expected L1, L2 or L3", other),
            )),
        }
    }
}

impl std::fmt::Display for CalculationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalculationLevel::L1 => write!(f, "L1"),
            CalculationLevel::L2 => write!(f, "L2"),
            CalculationLevel::L3 => write!(f, "L3"),
        }
    }
}

/// Discrete carbon label, ordered from lowest to highest footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

impl CarbonLevel {
    pub const ALL: [CarbonLevel; 4] = [
        CarbonLevel::UltraLow,
        CarbonLevel::Low,
        CarbonLevel::Medium,
        CarbonLevel::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CarbonLevel::UltraLow => "ultra_low",
            CarbonLevel::Low => "low",
            CarbonLevel::Medium => "medium",
            CarbonLevel::High => "high",
        }
    }
}

impl std::fmt::Display for CarbonLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status shared by baselines, aliases, categories and config documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Archived,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enums() {
        assert_eq!("meat_full".parse::<MealType>().unwrap(), MealType::MeatFull);
        assert_eq!(" gas ".parse::<EnergyType>().unwrap(), EnergyType::Gas);
        assert_eq!("L3".parse::<CalculationLevel>().unwrap(), CalculationLevel::L3);
    }

    #[test]
    fn test_unknown_level_is_validation_error() {
        let err = "L4".parse::<CalculationLevel>().unwrap_err();
        assert!(matches!(err, CarbonError::Validation { ref field, .. } if field == "calculationLevel"));
    }

    #[test]
    fn test_carbon_level_ordering() {
        assert!(CarbonLevel::UltraLow < CarbonLevel::Low);
        assert!(CarbonLevel::Medium < CarbonLevel::High);
        assert_eq!(serde_json::to_string(&CarbonLevel::UltraLow).unwrap(), "\"ultra_low\"");
    }
}
