//! Baseline Resolver
//!
//! Finds the reference footprint for a (meal type, region, energy type) tuple.
//! Lookup falls back from the exact tuple to the region default and then to
//! the national default. When the request region differs from the region the
//! baseline was authored against, only the cooking-energy share is rescaled
//! by the ratio of the two grid factors.

pub mod grid;

pub use grid::GridAdjuster;

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::{CarbonError, Result};
use crate::model::{
    Baseline, BaselineCategory, BaselineFallback, BaselineInfo, ConfidenceInterval, EnergyType,
    MealType, NATIONAL_BASELINE_REGION,
};
use crate::store::{bounded, CarbonStore};

/// A baseline after grid adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBaseline {
    /// Adjusted copy: value, cooking energy and interval reflect the request region
    pub baseline: Baseline,
    pub fallback: BaselineFallback,
    pub grid_ratio: f64,
    pub confidence_interval: ConfidenceInterval,
}

impl ResolvedBaseline {
    pub fn value(&self) -> f64 {
        self.baseline.carbon_footprint.value
    }

    pub fn info(&self) -> BaselineInfo {
        BaselineInfo {
            baseline_id: self.baseline.id(),
            version: self.baseline.version,
            source: self.baseline.source.clone(),
            fallback: self.fallback,
            reference_region: self.baseline.reference_region().to_string(),
            grid_ratio: self.grid_ratio,
            confidence_interval: self.confidence_interval,
        }
    }
}

pub struct BaselineResolver {
    baselines: Vec<Baseline>,
    grid: GridAdjuster,
}

impl BaselineResolver {
    pub fn new(baselines: Vec<Baseline>, grid: GridAdjuster) -> Self {
        Self { baselines, grid }
    }

    pub async fn from_store(
        store: &dyn CarbonStore,
        meal_type: MealType,
        energy_type: EnergyType,
        deadline: Duration,
    ) -> Result<Self> {
        let baselines = bounded("baselines", deadline, store.baselines(meal_type, energy_type)).await?;
        let grid = bounded("grid_factors", deadline, store.grid_factors()).await?;
        Ok(Self::new(baselines, GridAdjuster::new(&grid)))
    }

    pub fn grid(&self) -> &GridAdjuster {
        &self.grid
    }

    pub fn lookup_baseline(
        &self,
        meal_type: MealType,
        region: &str,
        energy_type: EnergyType,
        city: Option<&str>,
        restaurant_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedBaseline> {
        let region = region.trim();
        let mut rungs = vec![(region, city, restaurant_type, BaselineFallback::Exact)];
        if city.is_some() || restaurant_type.is_some() {
            rungs.push((region, None, None, BaselineFallback::RegionDefault));
        }
        if region != NATIONAL_BASELINE_REGION {
            rungs.push((NATIONAL_BASELINE_REGION, None, None, BaselineFallback::NationalDefault));
        }

        for (rung_region, rung_city, rung_type, fallback) in rungs {
            let current = self
                .baselines
                .iter()
                .filter(|b| {
                    let c = &b.category;
                    c.meal_type == meal_type
                        && c.energy_type == energy_type
                        && c.region == rung_region
                        && c.city.as_deref() == rung_city
                        && c.restaurant_type.as_deref() == rung_type
                })
                .filter(|b| b.is_current_at(now))
                .max_by(|a, b| a.version.cmp(&b.version).then_with(|| b.id().cmp(&a.id())));

            if let Some(baseline) = current {
                if fallback != BaselineFallback::Exact {
                    tracing::info!(
                        "Baseline for {}/{}/{} resolved via {:?}: {}",
                        meal_type,
                        region,
                        energy_type,
                        fallback,
                        baseline.id()
                    );
                }
                return Ok(self.adjust(baseline, region, fallback));
            }
        }

        let tuple = BaselineCategory {
            meal_type,
            region: region.to_string(),
            energy_type,
            city: city.map(str::to_string),
            restaurant_type: restaurant_type.map(str::to_string),
        };
        Err(CarbonError::config_missing(format!("baseline/{}", tuple.baseline_id())))
    }

    fn adjust(&self, baseline: &Baseline, region: &str, fallback: BaselineFallback) -> ResolvedBaseline {
        let reference = baseline.reference_region();
        let interval = baseline.comparison_interval();
        let mut adjusted = baseline.clone();

        let ratio = if region == reference {
            1.0
        } else {
            match self.grid.ratio(region, reference) {
                Some(ratio) => ratio,
                None => {
                    tracing::warn!(
                        "No grid factor for '{}' or '{}'; baseline {} left unadjusted",
                        region,
                        reference,
                        baseline.id()
                    );
                    1.0
                }
            }
        };

        if ratio == 1.0 {
            adjusted.carbon_footprint.confidence_interval = Some(interval);
            return ResolvedBaseline {
                baseline: adjusted,
                fallback,
                grid_ratio: 1.0,
                confidence_interval: interval,
            };
        }

        let b = &baseline.breakdown;
        let cooking_energy = b.cooking_energy * ratio;
        let value = b.ingredients + cooking_energy + b.packaging + b.other;
        let delta = value - baseline.carbon_footprint.value;
        let shifted = ConfidenceInterval {
            lower: (interval.lower + delta).max(0.0),
            upper: interval.upper + delta,
        };

        adjusted.breakdown.cooking_energy = cooking_energy;
        adjusted.carbon_footprint.value = value;
        adjusted.carbon_footprint.confidence_interval = Some(shifted);

        tracing::debug!(
            "Baseline {} rescaled for {}: cooking energy x{:.4}, {:.4} -> {:.4}",
            baseline.id(),
            region,
            ratio,
            baseline.carbon_footprint.value,
            value
        );

        ResolvedBaseline {
            baseline: adjusted,
            fallback,
            grid_ratio: ratio,
            confidence_interval: shifted,
        }
    }
}
