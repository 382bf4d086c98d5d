//! Region Grid Adjuster
//!
//! Relative carbon intensity of each regional electricity grid. Store records
//! override the built-in table.

use std::collections::HashMap;

use crate::model::GridFactor;

/// kg CO₂e/kWh by regional grid
pub const BUILTIN_GRID_FACTORS: [(&str, f64); 7] = [
    ("north_china", 0.9419),
    ("northeast", 0.7769),
    ("east_china", 0.7035),
    ("central_china", 0.5257),
    ("northwest", 0.6673),
    ("south_china", 0.5271),
    ("national_average", 0.5703),
];

#[derive(Debug, Clone)]
pub struct GridAdjuster {
    factors: HashMap<String, f64>,
}

impl Default for GridAdjuster {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl GridAdjuster {
    pub fn new(records: &[GridFactor]) -> Self {
        let mut factors: HashMap<String, f64> = BUILTIN_GRID_FACTORS
            .iter()
            .map(|(region, factor)| (region.to_string(), *factor))
            .collect();

        for record in records {
            if !record.factor.is_finite() || record.factor <= 0.0 {
                tracing::warn!("Ignoring grid factor {} for region '{}'", record.factor, record.region);
                continue;
            }
            factors.insert(record.region.trim().to_lowercase(), record.factor);
        }

        Self { factors }
    }

    pub fn grid_factor(&self, region: &str) -> Option<f64> {
        self.factors.get(&region.trim().to_lowercase()).copied()
    }

    /// `grid(region) / grid(reference)`, or `None` if either is unknown
    pub fn ratio(&self, region: &str, reference: &str) -> Option<f64> {
        let numerator = self.grid_factor(region)?;
        let denominator = self.grid_factor(reference)?;
        Some(numerator / denominator)
    }
}
