//! Footprint terms for recipe-level (L2) and verified (L3) calculations.
//!
//! Every term is resolved independently; a term whose factor cannot be
//! found contributes zero and is reported as `missing`.

use crate::config::CalculationConfig;
use crate::factor::{energy_key, FactorResolver, Resolution};
use crate::model::{
    Breakdown, CalculationRequest, DataSource, EnergyType, FactorCategory, FactorMatch,
    IngredientInput, MatchType, PackagingInput, TermKind, TransportInput,
};

/// Natural gas burners: m³/h per kW of rated power
const GAS_FLOW_PER_KW: f64 = 0.1;

/// Factor applied to one energy carrier, from the library or from config
struct EnergyFactor {
    factor_id: Option<String>,
    value: Option<f64>,
    unit: Option<String>,
    match_type: MatchType,
}

pub(crate) struct Terms {
    pub breakdown: Breakdown,
    pub matches: Vec<FactorMatch>,
}

impl Terms {
    #[cfg(test)]
    pub fn incomplete(&self) -> bool {
        self.matches.iter().any(FactorMatch::is_missing)
    }
}

pub(crate) struct TermCalculator<'a> {
    pub resolver: &'a FactorResolver,
    pub config: &'a CalculationConfig,
    pub region: &'a str,
    pub year: Option<i32>,
    /// L3: verified quantities replace nominal ones where supplied
    pub verified: bool,
}

impl<'a> TermCalculator<'a> {
    pub fn compute(&self, request: &CalculationRequest) -> Terms {
        let mut matches = Vec::new();

        let ingredients = self.ingredients(&request.ingredients);
        let energy = self.energy(request);
        let packaging = self.packaging(&request.packaging);
        let transport = request.transport.as_ref().map(|t| self.transport(t));

        let breakdown = Breakdown {
            ingredients: ingredients.iter().map(|m| m.carbon).sum(),
            energy: energy.iter().map(|m| m.carbon).sum(),
            packaging: packaging.0,
            transport: transport.as_ref().map_or(0.0, |m| m.carbon),
            other: 0.0,
        };

        matches.extend(ingredients);
        matches.extend(energy);
        matches.extend(packaging.1);
        matches.extend(transport);

        Terms { breakdown, matches }
    }

    fn source(&self) -> DataSource {
        if self.verified {
            DataSource::Verified
        } else {
            DataSource::Nominal
        }
    }

    fn term(&self, term: TermKind, name: &str, resolution: &Resolution<'_>, quantity: f64) -> FactorMatch {
        FactorMatch {
            term,
            name: name.to_string(),
            match_type: resolution.match_type,
            factor_id: resolution.factor_id(),
            factor_value: resolution.factor.and_then(|f| f.usable_value()),
            unit: resolution.factor.map(|f| f.unit.clone()),
            quantity,
            waste_rate: None,
            carbon: quantity * resolution.value(),
            source: self.source(),
            lot_id: None,
        }
    }

    fn ingredients(&self, items: &[IngredientInput]) -> Vec<FactorMatch> {
        items
            .iter()
            .map(|item| {
                let resolution = self.resolver.resolve_factor(&item.name, item.category.as_deref(), self.region, self.year);

                let trace = item.traceability.as_ref().filter(|_| self.verified);
                let weight = trace.and_then(|t| t.verified_weight).unwrap_or(item.weight);

                let category = item.category.clone().or_else(|| {
                    self.resolver.rules().infer(&item.name).map(|hit| hit.rule.code.clone())
                });
                let waste_rate = item
                    .waste_rate
                    .unwrap_or_else(|| self.config.waste_rate(category.as_deref()));

                let mut term = self.term(TermKind::Ingredient, &item.name, &resolution, weight);
                term.carbon = weight * resolution.value() * (1.0 + waste_rate);
                term.waste_rate = Some(waste_rate);
                term.lot_id = trace.and_then(|t| t.lot_id.clone());
                term
            })
            .collect()
    }

    fn energy_factor(&self, carrier: EnergyType) -> EnergyFactor {
        let resolution = self.resolver.resolve_energy(carrier, self.region, self.year);
        if let Some(factor) = resolution.factor {
            return EnergyFactor {
                factor_id: Some(factor.factor_id.clone()),
                value: factor.usable_value(),
                unit: Some(factor.unit.clone()),
                match_type: resolution.match_type,
            };
        }

        match self.config.default_energy_factor(carrier) {
            Some((key, value)) => EnergyFactor {
                factor_id: Some(format!("config:{}", key)),
                value: Some(value),
                unit: Some(match carrier {
                    EnergyType::Gas => "kg CO₂e/m³".to_string(),
                    _ => "kg CO₂e/kWh".to_string(),
                }),
                match_type: MatchType::CategoryInferred,
            },
            None => {
                tracing::warn!("No energy factor for {} in {}", carrier, self.region);
                EnergyFactor {
                    factor_id: None,
                    value: None,
                    unit: None,
                    match_type: MatchType::Missing,
                }
            }
        }
    }

    /// Energy consumed by each carrier with its share of the cooking load.
    /// `mixed` splits the load evenly between electricity and gas.
    fn carriers(energy_type: EnergyType) -> Vec<(EnergyType, f64)> {
        match energy_type {
            EnergyType::Mixed => vec![(EnergyType::Electric, 0.5), (EnergyType::Gas, 0.5)],
            single => vec![(single, 1.0)],
        }
    }

    fn energy(&self, request: &CalculationRequest) -> Vec<FactorMatch> {
        let metered = request
            .meter_reading
            .as_ref()
            .filter(|_| self.verified)
            .map(|r| r.energy_consumption);

        // kWh-equivalent load per carrier before applying the carrier's unit
        let load = match (metered, request.cooking_method.as_deref()) {
            (Some(_), _) => None,
            (None, Some(method)) => {
                let minutes = request
                    .cooking_time
                    .unwrap_or_else(|| self.config.standard_minutes(method));
                let power = request.power.unwrap_or_else(|| self.config.standard_power(method));
                Some(power * minutes / 60.0)
            }
            (None, None) => return Vec::new(),
        };

        // A meter reports one quantity in kWh; a mixed kitchen's reading is all electricity
        let carriers = match (metered, request.energy_type) {
            (Some(_), EnergyType::Mixed) => vec![(EnergyType::Electric, 1.0)],
            (_, energy_type) => Self::carriers(energy_type),
        };

        carriers
            .into_iter()
            .map(|(carrier, share)| {
                let quantity = match (metered, load) {
                    (Some(reading), _) => reading * share,
                    (None, Some(kwh)) if carrier == EnergyType::Gas => kwh * GAS_FLOW_PER_KW * share,
                    (None, Some(kwh)) => kwh * share,
                    (None, None) => 0.0,
                };
                let factor = self.energy_factor(carrier);
                FactorMatch {
                    term: TermKind::Energy,
                    name: energy_key(carrier).unwrap_or(carrier.as_str()).to_string(),
                    match_type: factor.match_type,
                    factor_id: factor.factor_id,
                    factor_value: factor.value,
                    unit: factor.unit,
                    quantity,
                    waste_rate: None,
                    carbon: quantity * factor.value.unwrap_or(0.0),
                    source: self.source(),
                    lot_id: None,
                }
            })
            .collect()
    }

    /// Total packaging carbon and one term per item. No packaging at all
    /// falls back to the configured default.
    fn packaging(&self, items: &[PackagingInput]) -> (f64, Vec<FactorMatch>) {
        if items.is_empty() {
            return (self.config.default_packaging_carbon(), Vec::new());
        }

        let terms: Vec<FactorMatch> = items
            .iter()
            .map(|item| {
                let weight = item
                    .weight
                    .or_else(|| item.kind.as_deref().and_then(|k| self.config.packaging_weight(k)))
                    .unwrap_or_else(|| {
                        tracing::debug!("No weight for packaging '{}'; counted as 0 kg", item.material);
                        0.0
                    });
                let resolution = self
                    .resolver
                    .resolve_scoped(FactorCategory::Material, &item.material, self.region, self.year);
                self.term(TermKind::Packaging, &item.material, &resolution, weight)
            })
            .collect();

        (terms.iter().map(|t| t.carbon).sum(), terms)
    }

    fn transport(&self, transport: &TransportInput) -> FactorMatch {
        let quantity = transport.distance * transport.weight.unwrap_or(1.0);

        if let Some(value) = transport.traceability_factor.filter(|_| self.verified) {
            return FactorMatch {
                term: TermKind::Transport,
                name: transport.mode.clone(),
                match_type: MatchType::Exact,
                factor_id: Some(format!("traceability:{}", transport.mode)),
                factor_value: Some(value),
                unit: Some("kg CO₂e/(km·kg)".to_string()),
                quantity,
                waste_rate: None,
                carbon: quantity * value,
                source: DataSource::Verified,
                lot_id: None,
            };
        }

        let resolution = self
            .resolver
            .resolve_scoped(FactorCategory::Transport, &transport.mode, self.region, self.year);
        self.term(TermKind::Transport, &transport.mode, &resolution, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::carbon_level_documents;
    use crate::factor::tests::factor;
    use crate::model::{
        ConfigDocument, IngredientCategory, MealType, MeterReading, CalculationLevel, RecordStatus,
        TraceabilityRecord,
    };
    use serde_json::json;

    fn resolver() -> FactorResolver {
        let mut electricity = factor("ef-elec", "电力", FactorCategory::Energy, 0.6);
        electricity.sub_category = Some("electricity".into());
        let mut gas = factor("ef-gas", "天然气", FactorCategory::Energy, 2.0);
        gas.sub_category = Some("natural_gas".into());
        FactorResolver::new(
            vec![
                factor("ef-rice", "大米", FactorCategory::Ingredient, 1.5),
                factor("ef-box", "PP塑料", FactorCategory::Material, 3.0),
                factor("ef-truck", "truck", FactorCategory::Transport, 0.0001),
                electricity,
                gas,
            ],
            &[],
            &[IngredientCategory {
                category_code: "grains".into(),
                factor_sub_category: "grain".into(),
                keywords: vec!["米".into()],
                priority: 1,
                status: RecordStatus::Active,
            }],
        )
    }

    fn config(extra: Vec<ConfigDocument>) -> CalculationConfig {
        let mut docs = carbon_level_documents();
        docs.extend(extra);
        CalculationConfig::from_documents(&docs).unwrap()
    }

    fn request(energy: EnergyType) -> CalculationRequest {
        CalculationRequest::new("r-1", MealType::MeatSimple, energy, CalculationLevel::L2)
    }

    #[test]
    fn test_ingredient_waste_rate_from_inferred_category() {
        let resolver = resolver();
        let config = config(vec![ConfigDocument::new(
            "waste_rate",
            "ingredient_waste_rate",
            "grains",
            json!(0.1),
        )]);
        let calc = TermCalculator { resolver: &resolver, config: &config, region: "east_china", year: None, verified: false };

        let terms = calc.compute(&request(EnergyType::Electric).with_ingredient(IngredientInput::new("大米", 0.2)));
        assert!((terms.breakdown.ingredients - 0.2 * 1.5 * 1.1).abs() < 1e-12);
        assert_eq!(terms.matches[0].waste_rate, Some(0.1));
        assert!(!terms.incomplete());
    }

    #[test]
    fn test_cooking_energy_uses_hours() {
        let resolver = resolver();
        let config = config(vec![]);
        let calc = TermCalculator { resolver: &resolver, config: &config, region: "east_china", year: None, verified: false };

        let electric = calc.compute(&request(EnergyType::Electric).with_cooking("stir_fried", 10.0));
        assert!((electric.breakdown.energy - 3.0 * (10.0 / 60.0) * 0.6).abs() < 1e-12);

        let gas = calc.compute(&request(EnergyType::Gas).with_cooking("stir_fried", 10.0));
        assert!((gas.breakdown.energy - 0.3 * (10.0 / 60.0) * 2.0).abs() < 1e-12);

        let mixed = calc.compute(&request(EnergyType::Mixed).with_cooking("stir_fried", 10.0));
        let mean = (electric.breakdown.energy + gas.breakdown.energy) / 2.0;
        assert!((mixed.breakdown.energy - mean).abs() < 1e-12);
        assert_eq!(mixed.matches.len(), 2);

        assert!(calc.compute(&request(EnergyType::Electric)).matches.is_empty());
    }

    #[test]
    fn test_configured_energy_default() {
        let resolver = FactorResolver::new(vec![], &[], &[]);
        let config = config(vec![ConfigDocument::new(
            "energy_factor",
            "default_gas_factor",
            "gas",
            json!(2.16),
        )]);
        let calc = TermCalculator { resolver: &resolver, config: &config, region: "east_china", year: None, verified: false };

        let terms = calc.compute(&request(EnergyType::Gas).with_cooking("boiled", 20.0));
        let energy = &terms.matches[0];
        assert_eq!(energy.match_type, MatchType::CategoryInferred);
        assert_eq!(energy.factor_id.as_deref(), Some("config:default_gas_factor"));

        let terms = calc.compute(&request(EnergyType::Electric).with_cooking("boiled", 20.0));
        assert!(terms.incomplete());
        assert_eq!(terms.breakdown.energy, 0.0);
    }

    #[test]
    fn test_packaging_weights_and_default() {
        let resolver = resolver();
        let config = config(vec![
            ConfigDocument::new("packaging", "packaging_weight", "meal_box", json!(0.03)),
            ConfigDocument::new("packaging", "default_packaging_carbon", "default", json!(0.15)),
        ]);
        let calc = TermCalculator { resolver: &resolver, config: &config, region: "east_china", year: None, verified: false };

        assert_eq!(calc.compute(&request(EnergyType::Electric)).breakdown.packaging, 0.15);

        let mut req = request(EnergyType::Electric);
        req.packaging.push(PackagingInput {
            material: "PP塑料".into(),
            kind: Some("meal_box".into()),
            weight: None,
        });
        let terms = calc.compute(&req);
        assert!((terms.breakdown.packaging - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_verified_quantities() {
        let resolver = resolver();
        let config = config(vec![]);
        let calc = TermCalculator { resolver: &resolver, config: &config, region: "east_china", year: None, verified: true };

        let mut ingredient = IngredientInput::new("大米", 0.2);
        ingredient.traceability = Some(TraceabilityRecord {
            lot_id: Some("LOT-7".into()),
            supplier_id: None,
            verified_weight: Some(0.25),
        });
        let mut req = request(EnergyType::Electric).with_ingredient(ingredient).with_cooking("baked", 45.0);
        req.meter_reading = Some(MeterReading { energy_consumption: 1.5, meter_id: None });
        req.transport = Some(TransportInput {
            mode: "truck".into(),
            distance: 100.0,
            weight: Some(2.0),
            traceability_factor: Some(0.0002),
        });

        let terms = calc.compute(&req);
        assert!((terms.breakdown.ingredients - 0.25 * 1.5).abs() < 1e-12);
        assert!((terms.breakdown.energy - 1.5 * 0.6).abs() < 1e-12);
        assert!((terms.breakdown.transport - 200.0 * 0.0002).abs() < 1e-12);
        assert!(terms.matches.iter().all(|m| m.source == DataSource::Verified));
    }

    #[test]
    fn test_mixed_meter_reading_counts_as_electricity() {
        let resolver = resolver();
        let config = config(vec![]);
        let calc = TermCalculator { resolver: &resolver, config: &config, region: "east_china", year: None, verified: true };

        let mut req = request(EnergyType::Mixed).with_cooking("stir_fried", 10.0);
        req.meter_reading = Some(MeterReading { energy_consumption: 10.0, meter_id: None });

        let terms = calc.compute(&req);
        assert_eq!(terms.matches.len(), 1);
        assert_eq!(terms.matches[0].name, "electricity");
        assert_eq!(terms.matches[0].quantity, 10.0);
        assert!((terms.breakdown.energy - 6.0).abs() < 1e-12);
        assert_eq!(terms.matches[0].lot_id.as_deref(), Some("LOT-7"));
    }
}
