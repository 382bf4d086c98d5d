//! Factor Resolver
//!
//! Maps a named ingredient, energy carrier, packaging material or transport
//! mode to an emission factor. Stages run in a fixed order (exact name,
//! alias, category keyword, missing) and the first stage with a usable
//! candidate wins. Resolution is a pure function of the loaded tables.

pub mod category;

pub use category::{CategoryHit, CategoryRule, CategoryRules};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::model::{
    EmissionFactor, EnergyType, FactorCategory, FactorStatus, IngredientAlias, IngredientCategory,
    MatchType, RecordStatus, NATIONAL_FACTOR_REGION,
};
use crate::store::{bounded, CarbonStore};

/// Map a baseline-format region (`east_china`) to the factor library's
/// format (`CN-East`). Factor-format codes pass through; anything else is
/// treated as national.
pub fn factor_region(region: &str) -> String {
    let trimmed = region.trim();
    if trimmed == NATIONAL_FACTOR_REGION || trimmed.starts_with("CN-") {
        return trimmed.to_string();
    }
    let mapped = match trimmed.to_lowercase().as_str() {
        "north_china" | "northeast" => "CN-North",
        "east_china" | "central_china" => "CN-East",
        "northwest" => "CN-West",
        "south_china" => "CN-South",
        _ => NATIONAL_FACTOR_REGION,
    };
    mapped.to_string()
}

/// Sub-category (and canonical name) of the energy factor for a supply type
pub fn energy_key(energy_type: EnergyType) -> Option<&'static str> {
    match energy_type {
        EnergyType::Electric => Some("electricity"),
        EnergyType::Gas => Some("natural_gas"),
        EnergyType::Mixed => None,
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Outcome of one lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub factor: Option<&'a EmissionFactor>,
    pub match_type: MatchType,
}

impl<'a> Resolution<'a> {
    fn found(factor: &'a EmissionFactor, match_type: MatchType) -> Self {
        Self {
            factor: Some(factor),
            match_type,
        }
    }

    pub fn missing() -> Self {
        Self {
            factor: None,
            match_type: MatchType::Missing,
        }
    }

    /// Factor value, or 0 for a missing factor
    pub fn value(&self) -> f64 {
        self.factor.and_then(|f| f.usable_value()).unwrap_or(0.0)
    }

    pub fn factor_id(&self) -> Option<String> {
        self.factor.map(|f| f.factor_id.clone())
    }
}

/// Item of a factor lookup request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorQuery {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorLookup {
    pub input: String,
    pub factor_id: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub source: Option<String>,
    pub match_type: MatchType,
}

pub struct FactorResolver {
    factors: Vec<EmissionFactor>,
    aliases: HashMap<String, String>,
    rules: CategoryRules,
}

impl FactorResolver {
    /// Unusable factors (inactive, no value, negative) are dropped here and
    /// never considered again.
    pub fn new(factors: Vec<EmissionFactor>, aliases: &[IngredientAlias], categories: &[IngredientCategory]) -> Self {
        let total = factors.len();
        let factors: Vec<EmissionFactor> = factors.into_iter().filter(|f| f.is_usable()).collect();
        if factors.len() < total {
            tracing::debug!("Skipped {} unusable emission factors", total - factors.len());
        }

        let aliases = aliases
            .iter()
            .filter(|a| a.status == RecordStatus::Active)
            .map(|a| (normalize(&a.alias), a.standard_name.trim().to_string()))
            .collect();

        Self {
            factors,
            aliases,
            rules: CategoryRules::from_categories(categories),
        }
    }

    /// Load active factors, aliases and category rules, each read bounded by `deadline`.
    pub async fn from_store(store: &dyn CarbonStore, deadline: Duration) -> Result<Self> {
        let factors = bounded("emission_factors", deadline, store.emission_factors(FactorStatus::Active)).await?;
        let aliases = bounded("ingredient_aliases", deadline, store.ingredient_aliases()).await?;
        let categories = bounded("ingredient_categories", deadline, store.ingredient_categories()).await?;
        Ok(Self::new(factors, &aliases, &categories))
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// Resolve an ingredient. `category` is the caller's hint, used when no
    /// keyword matches the name or the matched category has no representative.
    pub fn resolve_factor(&self, name: &str, category: Option<&str>, region: &str, year: Option<i32>) -> Resolution<'_> {
        let region = factor_region(region);
        if let Some(hit) = self.by_name(FactorCategory::Ingredient, name, &region, year) {
            return hit;
        }

        let inferred = self.rules.infer(name).map(|hit| hit.rule);
        let hinted = category
            .and_then(|c| self.rules.by_code(c))
            .filter(|hint| inferred.map_or(true, |rule| rule.code != hint.code));

        for rule in inferred.into_iter().chain(hinted) {
            let representative = self.select(
                self.in_scope(FactorCategory::Ingredient)
                    .filter(|f| f.sub_category.as_deref() == Some(rule.sub_category.as_str())),
                &region,
                year,
            );
            if let Some(factor) = representative {
                tracing::debug!("'{}' inferred as category '{}' -> {}", name, rule.code, factor.factor_id);
                return Resolution::found(factor, MatchType::CategoryInferred);
            }
        }

        tracing::debug!("No emission factor for ingredient '{}'", name);
        Resolution::missing()
    }

    /// Resolve within one factor library with the exact and alias stages only.
    pub fn resolve_scoped(&self, scope: FactorCategory, name: &str, region: &str, year: Option<i32>) -> Resolution<'_> {
        let region = factor_region(region);
        self.by_name(scope, name, &region, year).unwrap_or_else(|| {
            tracing::debug!("No {} factor for '{}'", scope.as_str(), name);
            Resolution::missing()
        })
    }

    /// Energy factor for a single supply type. Matches by sub-category first,
    /// then by name.
    pub fn resolve_energy(&self, energy_type: EnergyType, region: &str, year: Option<i32>) -> Resolution<'_> {
        let Some(key) = energy_key(energy_type) else {
            return Resolution::missing();
        };
        let mapped = factor_region(region);
        let by_sub_category = self.select(
            self.in_scope(FactorCategory::Energy)
                .filter(|f| f.sub_category.as_deref().map(normalize).as_deref() == Some(key)),
            &mapped,
            year,
        );
        match by_sub_category {
            Some(factor) => Resolution::found(factor, MatchType::Exact),
            None => self.resolve_scoped(FactorCategory::Energy, key, region, year),
        }
    }

    pub fn match_factors(&self, items: &[FactorQuery], region: &str) -> Vec<FactorLookup> {
        items
            .iter()
            .map(|item| {
                let resolution = self.resolve_factor(&item.name, item.category.as_deref(), region, None);
                FactorLookup {
                    input: item.name.clone(),
                    factor_id: resolution.factor_id(),
                    value: resolution.factor.and_then(|f| f.usable_value()),
                    unit: resolution.factor.map(|f| f.unit.clone()),
                    source: resolution.factor.and_then(|f| f.source.clone()),
                    match_type: resolution.match_type,
                }
            })
            .collect()
    }

    fn in_scope(&self, scope: FactorCategory) -> impl Iterator<Item = &EmissionFactor> {
        self.factors.iter().filter(move |f| f.category == scope)
    }

    /// Exact and alias stages
    fn by_name(&self, scope: FactorCategory, name: &str, region: &str, year: Option<i32>) -> Option<Resolution<'_>> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }

        let exact = self.select(self.in_scope(scope).filter(|f| normalize(&f.name) == wanted), region, year);
        if let Some(factor) = exact {
            return Some(Resolution::found(factor, MatchType::Exact));
        }

        if let Some(standard) = self.aliases.get(&wanted) {
            let canonical = normalize(standard);
            let via_table = self.select(self.in_scope(scope).filter(|f| normalize(&f.name) == canonical), region, year);
            if let Some(factor) = via_table {
                return Some(Resolution::found(factor, MatchType::Alias));
            }
        }

        self.select(
            self.in_scope(scope)
                .filter(|f| f.alias.iter().any(|a| normalize(a) == wanted)),
            region,
            year,
        )
        .map(|factor| Resolution::found(factor, MatchType::Alias))
    }

    /// Prefer the request region, then national, then anything; within that
    /// the newest year not after `year` (else the oldest after it); then the
    /// smallest factor id.
    fn select<'a>(
        &self,
        candidates: impl Iterator<Item = &'a EmissionFactor>,
        region: &str,
        year: Option<i32>,
    ) -> Option<&'a EmissionFactor> {
        candidates.min_by(|a, b| rank(a, region, year).cmp(&rank(b, region, year)))
    }
}

fn rank<'f>(factor: &'f EmissionFactor, region: &str, year: Option<i32>) -> (u8, u8, i64, &'f str) {
    let region_rank = if factor.region == region {
        0
    } else if factor.region == NATIONAL_FACTOR_REGION {
        1
    } else {
        2
    };

    let (bucket, order) = match (factor.year, year) {
        (Some(fy), Some(y)) if fy <= y => (0, -(fy as i64)),
        (Some(fy), None) => (0, -(fy as i64)),
        (None, _) => (1, 0),
        (Some(fy), Some(_)) => (2, fy as i64),
    };

    (region_rank, bucket, order, factor.factor_id.as_str())
}
