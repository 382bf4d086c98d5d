//! Carbon-Level Classifier
//!
//! Maps a footprint to `ultra_low | low | medium | high`. A `CarbonLevelConfig`
//! can only be built through validation, so classification never sees
//! non-monotonic thresholds or malformed colors.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CarbonError, Result};
use crate::model::{CarbonLevel, ConfigDocument};

pub const CONFIG_TYPE: &str = "carbon_level";
pub const THRESHOLD_KEY: &str = "carbon_level_threshold";
pub const COLOR_KEY: &str = "carbon_level_color";

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern compiles");
}

/// Upper bounds per level, in kg CO₂e
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub ultra_low: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Thresholds {
    fn get(&self, level: CarbonLevel) -> f64 {
        match level {
            CarbonLevel::UltraLow => self.ultra_low,
            CarbonLevel::Low => self.low,
            CarbonLevel::Medium => self.medium,
            CarbonLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelColors {
    pub ultra_low: String,
    pub low: String,
    pub medium: String,
    pub high: String,
}

impl LevelColors {
    fn get(&self, level: CarbonLevel) -> &str {
        match level {
            CarbonLevel::UltraLow => &self.ultra_low,
            CarbonLevel::Low => &self.low,
            CarbonLevel::Medium => &self.medium,
            CarbonLevel::High => &self.high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonLevelConfig {
    thresholds: Thresholds,
    colors: LevelColors,
}

impl CarbonLevelConfig {
    pub fn new(thresholds: Thresholds, colors: LevelColors) -> Result<Self> {
        for pair in CarbonLevel::ALL.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            let (a, b) = (thresholds.get(lower), thresholds.get(upper));
            if !a.is_finite() || !b.is_finite() || a >= b {
                return Err(CarbonError::config_invalid(
                    format!("{}/{}", THRESHOLD_KEY, upper),
                    format!(
                        "thresholds must increase strictly: {} ({}) must be below {} ({})",
                        lower, a, upper, b
                    ),
                ));
            }
        }
        for level in CarbonLevel::ALL {
            let color = colors.get(level);
            if !HEX_COLOR.is_match(color) {
                return Err(CarbonError::config_invalid(
                    format!("{}/{}", COLOR_KEY, level),
                    format!("'{}' is not a #RRGGBB color", color),
                ));
            }
        }
        Ok(Self { thresholds, colors })
    }

    /// Build from `carbon_level` configuration documents. Every level needs
    /// both a threshold and a color.
    pub fn from_documents(docs: &[ConfigDocument]) -> Result<Self> {
        let lookup = |key: &str, level: CarbonLevel| {
            docs.iter().find(|d| {
                d.config_type == CONFIG_TYPE
                    && d.config_key == key
                    && d.category.as_deref() == Some(level.as_str())
            })
        };

        let threshold = |level: CarbonLevel| -> Result<f64> {
            let name = format!("{}/{}", THRESHOLD_KEY, level);
            let doc = lookup(THRESHOLD_KEY, level).ok_or_else(|| CarbonError::config_missing(&name))?;
            doc.value
                .as_f64()
                .ok_or_else(|| CarbonError::config_invalid(&name, format!("expected a number, got {}", doc.value)))
        };
        let color = |level: CarbonLevel| -> Result<String> {
            let name = format!("{}/{}", COLOR_KEY, level);
            let doc = lookup(COLOR_KEY, level).ok_or_else(|| CarbonError::config_missing(&name))?;
            doc.value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| CarbonError::config_invalid(&name, format!("expected a string, got {}", doc.value)))
        };

        let thresholds = Thresholds {
            ultra_low: threshold(CarbonLevel::UltraLow)?,
            low: threshold(CarbonLevel::Low)?,
            medium: threshold(CarbonLevel::Medium)?,
            high: threshold(CarbonLevel::High)?,
        };
        let colors = LevelColors {
            ultra_low: color(CarbonLevel::UltraLow)?,
            low: color(CarbonLevel::Low)?,
            medium: color(CarbonLevel::Medium)?,
            high: color(CarbonLevel::High)?,
        };
        Self::new(thresholds, colors)
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn color(&self, level: CarbonLevel) -> &str {
        self.colors.get(level)
    }

    pub fn classify(&self, value: f64) -> CarbonLevel {
        let t = &self.thresholds;
        if value < t.ultra_low {
            CarbonLevel::UltraLow
        } else if value < t.low {
            CarbonLevel::Low
        } else if value <= t.medium {
            CarbonLevel::Medium
        } else {
            CarbonLevel::High
        }
    }
}
