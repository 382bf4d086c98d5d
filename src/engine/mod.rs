//! Calculation Engine
//!
//! Orchestrates factor resolution, baseline lookup and classification for a
//! single menu item at one of three fidelity levels:
//!
//! - **L1** baseline-only estimate
//! - **L2** recipe-level: standard BOM and the standard cooking-energy model
//! - **L3** verified weights, meter readings and traceability factors
//!
//! Each call reads the store afresh (optionally through `CachedStore`), so
//! calculations share no mutable state.

pub mod batch;
mod terms;

pub use batch::{ItemError, ItemResult, RecalculationSummary};

use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;

use crate::baseline::{BaselineResolver, ResolvedBaseline};
use crate::config::CalculationConfig;
use crate::error::{CarbonError, Result};
use crate::factor::{FactorLookup, FactorQuery, FactorResolver};
use crate::model::{
    BaselineComparison, Breakdown, CalculationLevel, CalculationRequest, CarbonFootprint,
    ConfidenceInterval, FactorMatch, MenuItemCarbonResult, OptimizationFlag,
};
use crate::settings::EngineSettings;
use crate::store::{bounded, CachedStore, CarbonStore, MenuStore};
use terms::TermCalculator;

/// Where a calculation is located for baseline and factor purposes
#[derive(Debug, Clone, PartialEq)]
struct Location {
    region: String,
    city: Option<String>,
    restaurant_type: Option<String>,
}

pub struct CalculationEngine {
    store: Arc<dyn CarbonStore>,
    menus: Arc<dyn MenuStore>,
    settings: EngineSettings,
}

impl CalculationEngine {
    pub fn new(store: Arc<dyn CarbonStore>, menus: Arc<dyn MenuStore>, settings: EngineSettings) -> Self {
        Self { store, menus, settings }
    }

    /// Same as `new`, with factor/baseline/config reads going through a TTL
    /// cache when `cache_ttl_secs > 0`.
    pub fn cached(store: Arc<dyn CarbonStore>, menus: Arc<dyn MenuStore>, settings: EngineSettings) -> Self {
        let store: Arc<dyn CarbonStore> = if settings.cache_ttl_secs > 0 {
            Arc::new(CachedStore::new(store, settings.cache_ttl()))
        } else {
            store
        };
        Self::new(store, menus, settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn calculate_menu_item_carbon(&self, request: &CalculationRequest) -> Result<MenuItemCarbonResult> {
        self.calculate_at(request, Utc::now()).await
    }

    /// Calculate as of `now`, which selects date-valid baselines and the
    /// factor year.
    pub async fn calculate_at(&self, request: &CalculationRequest, now: DateTime<Utc>) -> Result<MenuItemCarbonResult> {
        request.validate()?;
        let deadline = self.settings.store_timeout();

        let location = self.locate(request).await?;
        let docs = bounded("config_documents", deadline, self.store.config_documents()).await?;
        let config = CalculationConfig::from_documents(&docs)?;

        let baselines =
            BaselineResolver::from_store(self.store.as_ref(), request.meal_type, request.energy_type, deadline).await?;
        let lookup = baselines.lookup_baseline(
            request.meal_type,
            &location.region,
            request.energy_type,
            location.city.as_deref(),
            location.restaurant_type.as_deref(),
            now,
        );

        let (value, breakdown, matches, baseline) = match request.calculation_level {
            CalculationLevel::L1 => {
                let baseline = lookup?;
                let b = &baseline.baseline.breakdown;
                let breakdown = Breakdown {
                    ingredients: b.ingredients,
                    energy: b.cooking_energy,
                    packaging: b.packaging,
                    transport: 0.0,
                    other: b.other,
                };
                (baseline.value(), breakdown, Vec::new(), Some(baseline))
            }
            CalculationLevel::L2 | CalculationLevel::L3 => {
                let baseline = match lookup {
                    Ok(baseline) => Some(baseline),
                    Err(CarbonError::ConfigMissing { key }) => {
                        tracing::warn!("No baseline for {}: reduction unavailable", key);
                        None
                    }
                    Err(e) => return Err(e),
                };

                let resolver = FactorResolver::from_store(self.store.as_ref(), deadline).await?;
                let calculator = TermCalculator {
                    resolver: &resolver,
                    config: &config,
                    region: &location.region,
                    year: Some(now.year()),
                    verified: request.calculation_level == CalculationLevel::L3,
                };
                let terms = calculator.compute(request);
                (terms.breakdown.total(), terms.breakdown, terms.matches, baseline)
            }
        };

        let result = self.assemble(request, &config, value, breakdown, matches, baseline, now);

        if request.calculation_level == CalculationLevel::L3 {
            self.audit(request, &result);
        }
        Ok(result)
    }

    /// Look up emission factors for a list of names without calculating.
    pub async fn match_factors(&self, items: &[FactorQuery], region: &str) -> Result<Vec<FactorLookup>> {
        if region.trim().is_empty() {
            return Err(CarbonError::validation("region", "is required"));
        }
        let resolver = FactorResolver::from_store(self.store.as_ref(), self.settings.store_timeout()).await?;
        Ok(resolver.match_factors(items, region))
    }

    /// Request region wins; otherwise the restaurant's.
    async fn locate(&self, request: &CalculationRequest) -> Result<Location> {
        if let Some(region) = &request.region {
            return Ok(Location {
                region: region.trim().to_string(),
                city: request.city.clone(),
                restaurant_type: request.restaurant_type.clone(),
            });
        }

        let restaurant = bounded(
            "restaurant",
            self.settings.store_timeout(),
            self.menus.restaurant(&request.restaurant_id),
        )
        .await?;

        match restaurant {
            Some(r) if r.region.as_deref().is_some_and(|s| !s.trim().is_empty()) => Ok(Location {
                region: r.region.unwrap_or_default().trim().to_string(),
                city: request.city.clone().or(r.city),
                restaurant_type: request.restaurant_type.clone().or(r.restaurant_type),
            }),
            Some(_) => Err(CarbonError::validation(
                "region",
                format!("not supplied and restaurant '{}' has no region", request.restaurant_id),
            )),
            None => Err(CarbonError::validation(
                "region",
                format!("not supplied and restaurant '{}' is unknown", request.restaurant_id),
            )),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        request: &CalculationRequest,
        config: &CalculationConfig,
        value: f64,
        breakdown: Breakdown,
        matches: Vec<FactorMatch>,
        baseline: Option<ResolvedBaseline>,
        now: DateTime<Utc>,
    ) -> MenuItemCarbonResult {
        self.sanity_check(request, value, &breakdown);

        let levels = config.carbon_levels();
        let carbon_level = levels.classify(value);

        let baseline_value = baseline.as_ref().map(ResolvedBaseline::value);
        let (comparison, optimization_flag) = match &baseline {
            Some(b) => compare(value, b.confidence_interval),
            None => (BaselineComparison::Unavailable, OptimizationFlag::default()),
        };

        MenuItemCarbonResult {
            calculation_level: request.calculation_level,
            carbon_footprint: CarbonFootprint {
                value,
                baseline: baseline_value,
                reduction: baseline_value.map(|b| (b - value).max(0.0)),
                breakdown,
            },
            incomplete: matches.iter().any(FactorMatch::is_missing),
            factor_match_info: matches,
            calculated_at: now,
            carbon_level,
            carbon_level_color: levels.color(carbon_level).to_string(),
            baseline_info: baseline.as_ref().map(ResolvedBaseline::info),
            baseline_comparison: comparison,
            optimization_flag,
            is_estimated: request.calculation_level == CalculationLevel::L1,
            has_meter_reading: request.calculation_level == CalculationLevel::L3 && request.meter_reading.is_some(),
        }
    }

    fn sanity_check(&self, request: &CalculationRequest, value: f64, breakdown: &Breakdown) {
        if value > self.settings.max_carbon_footprint {
            tracing::warn!(
                "Footprint {:.3} kg CO₂e for restaurant {} exceeds {:.1}; check inputs",
                value,
                request.restaurant_id,
                self.settings.max_carbon_footprint
            );
        }
        let gap = (breakdown.total() - value).abs();
        if gap > self.settings.sum_tolerance {
            tracing::warn!(
                "Breakdown sums to {:.4} but total is {:.4} (restaurant {})",
                breakdown.total(),
                value,
                request.restaurant_id
            );
        }
    }

    fn audit(&self, request: &CalculationRequest, result: &MenuItemCarbonResult) {
        let traced = request
            .ingredients
            .iter()
            .filter(|i| i.traceability.is_some())
            .count();
        let b = &result.carbon_footprint.breakdown;
        tracing::info!(
            target: "menu_carbon::audit",
            restaurant_id = %request.restaurant_id,
            meal_type = %request.meal_type,
            energy_type = %request.energy_type,
            meter = request.meter_reading.as_ref().and_then(|m| m.meter_id.as_deref()).unwrap_or("-"),
            has_meter_reading = result.has_meter_reading,
            traced_ingredients = traced,
            ingredients = b.ingredients,
            energy = b.energy,
            packaging = b.packaging,
            transport = b.transport,
            total = result.carbon_footprint.value,
            "L3 calculation recorded"
        );
    }
}

/// Judge a footprint against the baseline band.
fn compare(value: f64, band: ConfidenceInterval) -> (BaselineComparison, OptimizationFlag) {
    if value < band.lower {
        (BaselineComparison::SignificantReduction, OptimizationFlag::default())
    } else if value > band.upper {
        (
            BaselineComparison::AboveBand,
            OptimizationFlag {
                needs_optimization: true,
                warning_message: Some(format!(
                    "Footprint {:.2} kg CO₂e is above the baseline range (upper bound {:.2}); consider lower-carbon ingredients or cooking methods",
                    value, band.upper
                )),
            },
        )
    } else {
        (BaselineComparison::WithinBand, OptimizationFlag::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::tests::baseline;
    use crate::config::tests::carbon_level_documents;
    use crate::factor::tests::factor;
    use crate::model::{
        BaselineBreakdown, BaselineFallback, CarbonLevel, EnergyType, FactorCategory, IngredientInput,
        MatchType, MealType, Restaurant,
    };
    use crate::store::{InMemoryStore, StoreSnapshot};

    fn snapshot() -> StoreSnapshot {
        let mut electricity = factor("ef-elec", "电力", FactorCategory::Energy, 0.7035);
        electricity.sub_category = Some("electricity".into());
        StoreSnapshot {
            emission_factors: vec![factor("ef-rice", "大米", FactorCategory::Ingredient, 1.2), electricity],
            baselines: vec![baseline(
                MealType::MeatSimple,
                "east_china",
                EnergyType::Electric,
                5.0,
                BaselineBreakdown {
                    ingredients: 3.5,
                    cooking_energy: 1.2,
                    packaging: 0.2,
                    other: 0.1,
                },
            )],
            config_documents: carbon_level_documents(),
            restaurants: vec![Restaurant {
                restaurant_id: "r-1".into(),
                region: Some("east_china".into()),
                city: None,
                restaurant_type: None,
            }],
            ..Default::default()
        }
    }

    fn engine(snapshot: StoreSnapshot) -> CalculationEngine {
        let store = Arc::new(InMemoryStore::new(snapshot));
        CalculationEngine::new(store.clone(), store, EngineSettings::default())
    }

    #[tokio::test]
    async fn test_l1_uses_restaurant_region() {
        let engine = engine(snapshot());
        let req = CalculationRequest::new("r-1", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L1);
        let result = engine.calculate_menu_item_carbon(&req).await.unwrap();

        assert_eq!(result.carbon_footprint.value, 5.0);
        assert_eq!(result.carbon_footprint.reduction, Some(0.0));
        assert!(result.is_estimated);
        assert_eq!(result.baseline_comparison, BaselineComparison::WithinBand);
        assert_eq!(result.baseline_info.unwrap().fallback, BaselineFallback::Exact);
    }

    #[tokio::test]
    async fn test_l2_without_baseline_is_not_fatal() {
        let mut snap = snapshot();
        snap.baselines.clear();
        let engine = engine(snap);
        let req = CalculationRequest::new("r-1", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L2)
            .with_ingredient(IngredientInput::new("大米", 0.2));
        let result = engine.calculate_menu_item_carbon(&req).await.unwrap();

        assert!((result.carbon_footprint.value - 0.24).abs() < 1e-9);
        assert_eq!(result.carbon_footprint.baseline, None);
        assert_eq!(result.carbon_footprint.reduction, None);
        assert_eq!(result.baseline_comparison, BaselineComparison::Unavailable);
        assert_eq!(result.carbon_level, CarbonLevel::UltraLow);
        assert_eq!(result.factor_match_info[0].match_type, MatchType::Exact);

        let l1 = CalculationRequest::new("r-1", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L1);
        let err = engine.calculate_menu_item_carbon(&l1).await.unwrap_err();
        assert!(matches!(err, CarbonError::ConfigMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_region_is_validation_error() {
        let engine = engine(snapshot());
        let req = CalculationRequest::new("r-404", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L2);
        let err = engine.calculate_menu_item_carbon(&req).await.unwrap_err();
        assert!(matches!(err, CarbonError::Validation { ref field, .. } if field == "region"));
    }

    #[tokio::test]
    async fn test_missing_carbon_levels_is_fatal() {
        let mut snap = snapshot();
        snap.config_documents.clear();
        let engine = engine(snap);
        let req = CalculationRequest::new("r-1", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L2);
        let err = engine.calculate_menu_item_carbon(&req).await.unwrap_err();
        assert_eq!(err, CarbonError::config_missing("carbon_level_threshold/ultra_low"));
    }

    #[tokio::test]
    async fn test_above_band_sets_optimization_flag() {
        let engine = engine(snapshot());
        let req = CalculationRequest::new("r-1", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L2)
            .with_ingredient(IngredientInput::new("大米", 5.0));
        let result = engine.calculate_menu_item_carbon(&req).await.unwrap();

        assert_eq!(result.baseline_comparison, BaselineComparison::AboveBand);
        assert!(result.optimization_flag.needs_optimization);
        assert!(result.optimization_flag.warning_message.is_some());
        assert_eq!(result.carbon_footprint.reduction, Some(0.0));
        assert_eq!(result.carbon_level, CarbonLevel::High);
        assert_eq!(result.carbon_level_color, "#ff4d4f");
    }

    #[test]
    fn test_compare_band_edges() {
        let band = ConfidenceInterval { lower: 4.5, upper: 5.5 };
        assert_eq!(compare(4.4, band).0, BaselineComparison::SignificantReduction);
        assert_eq!(compare(4.5, band).0, BaselineComparison::WithinBand);
        assert_eq!(compare(5.5, band).0, BaselineComparison::WithinBand);
        assert_eq!(compare(5.6, band).0, BaselineComparison::AboveBand);
    }
}
