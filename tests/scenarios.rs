use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};

use menu_carbon::factor::FactorQuery;
use menu_carbon::model::{
    BaselineComparison, BaselineFallback, CalculationLevel, CalculationRequest, CarbonLevel,
    DataSource, EnergyType, IngredientInput, MatchType, MealType, MeterReading, PackagingInput,
    TermKind, TraceabilityRecord, TransportInput,
};
use menu_carbon::{CalculationEngine, CarbonError, EngineSettings, InMemoryStore};

const SNAPSHOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/snapshot.json");
const EPS: f64 = 1e-9;

async fn engine() -> Result<CalculationEngine> {
    let store = Arc::new(InMemoryStore::load(SNAPSHOT).await?);
    Ok(CalculationEngine::new(store.clone(), store, EngineSettings::default()))
}

fn request(level: CalculationLevel) -> CalculationRequest {
    CalculationRequest::new("r-001", MealType::MeatSimple, EnergyType::Electric, level).with_region("east_china")
}

#[tokio::test]
async fn test_l1_estimate_returns_baseline() -> Result<()> {
    let engine = engine().await?;
    let result = engine.calculate_menu_item_carbon(&request(CalculationLevel::L1)).await?;

    let footprint = &result.carbon_footprint;
    assert_eq!(footprint.value, 5.0);
    assert_eq!(footprint.baseline, Some(5.0));
    assert_eq!(footprint.reduction, Some(0.0));
    assert_eq!(footprint.breakdown.ingredients, 3.5);
    assert_eq!(footprint.breakdown.energy, 1.2);
    assert_eq!(footprint.breakdown.packaging, 0.2);
    assert_eq!(footprint.breakdown.other, 0.1);
    assert!(result.factor_match_info.is_empty());
    assert!(result.is_estimated);
    assert!(!result.incomplete);

    let info = result.baseline_info.expect("baseline info");
    assert_eq!(info.baseline_id, "meat_simple_east_china_electric_default_default");
    assert_eq!(info.fallback, BaselineFallback::Exact);
    Ok(())
}

#[tokio::test]
async fn test_l2_recipe_calculation() -> Result<()> {
    let engine = engine().await?;
    let req = request(CalculationLevel::L2)
        .with_ingredient(IngredientInput::new("大米", 0.2).with_category("grains"))
        .with_cooking("stir_fried", 10.0);
    let result = engine.calculate_menu_item_carbon(&req).await?;

    let rice = &result.factor_match_info[0];
    assert_eq!(rice.match_type, MatchType::Exact);
    assert_eq!(rice.factor_id.as_deref(), Some("ef-ing-0001"));

    let b = result.carbon_footprint.breakdown;
    assert!((b.ingredients - 0.2 * 1.2).abs() < EPS);
    // regional grid factor preferred over the national one
    assert!((b.energy - 3.0 * (10.0 / 60.0) * 0.7035).abs() < EPS);

    let value = result.carbon_footprint.value;
    assert!((result.carbon_footprint.reduction.unwrap() - (5.0 - value)).abs() < EPS);
    assert_eq!(result.carbon_level, CarbonLevel::Low);
    assert_eq!(result.carbon_level_color, "#a0d911");
    assert_eq!(result.baseline_comparison, BaselineComparison::SignificantReduction);
    assert!(!result.optimization_flag.needs_optimization);
    Ok(())
}

#[tokio::test]
async fn test_alias_and_category_matches() -> Result<()> {
    let engine = engine().await?;
    let req = request(CalculationLevel::L2)
        .with_ingredient(IngredientInput::new("粳米", 0.1))
        .with_ingredient(IngredientInput::new("生菜", 0.1));
    let result = engine.calculate_menu_item_carbon(&req).await?;

    assert_eq!(result.factor_match_info[0].match_type, MatchType::Alias);
    assert_eq!(result.factor_match_info[0].factor_id.as_deref(), Some("ef-ing-0001"));

    let lettuce = &result.factor_match_info[1];
    assert_eq!(lettuce.match_type, MatchType::CategoryInferred);
    assert_eq!(lettuce.factor_id.as_deref(), Some("ef-ing-0091"));
    // vegetables carry a 15% waste rate
    assert!((lettuce.carbon - 0.1 * 0.5 * 1.15).abs() < EPS);
    Ok(())
}

#[tokio::test]
async fn test_unmatched_ingredient_marks_incomplete() -> Result<()> {
    let engine = engine().await?;
    let req = request(CalculationLevel::L2)
        .with_ingredient(IngredientInput::new("unobtainium", 0.3))
        .with_ingredient(IngredientInput::new("大米", 0.2));
    let result = engine.calculate_menu_item_carbon(&req).await?;

    assert!(result.incomplete);
    let missing = &result.factor_match_info[0];
    assert_eq!(missing.match_type, MatchType::Missing);
    assert_eq!(missing.factor_id, None);
    assert_eq!(missing.carbon, 0.0);
    assert!((result.carbon_footprint.breakdown.ingredients - 0.24).abs() < EPS);
    Ok(())
}

#[tokio::test]
async fn test_pending_factor_is_skipped() -> Result<()> {
    let engine = engine().await?;
    let req = request(CalculationLevel::L2).with_ingredient(IngredientInput::new("奇亚籽", 0.1));
    let result = engine.calculate_menu_item_carbon(&req).await?;
    assert_eq!(result.factor_match_info[0].match_type, MatchType::Missing);
    assert!(result.incomplete);
    Ok(())
}

#[tokio::test]
async fn test_grid_adjustment_for_north_china() -> Result<()> {
    let engine = engine().await?;
    let req = CalculationRequest::new("r-002", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L1)
        .with_region("north_china");
    let result = engine.calculate_menu_item_carbon(&req).await?;

    let info = result.baseline_info.as_ref().expect("baseline info");
    assert_eq!(info.fallback, BaselineFallback::NationalDefault);
    assert_eq!(info.version, 2);
    assert!((info.grid_ratio - 1.3389).abs() < 1e-3);

    let b = result.carbon_footprint.breakdown;
    assert!((b.energy - 1.2 * info.grid_ratio).abs() < EPS);
    assert_eq!(b.ingredients, 3.5);
    assert_eq!(b.packaging, 0.2);
    assert!((result.carbon_footprint.value - b.total()).abs() < EPS);
    assert!(info.confidence_interval.upper > 5.5);
    Ok(())
}

#[tokio::test]
async fn test_restaurant_region_and_city_fallback() -> Result<()> {
    let engine = engine().await?;
    let req = CalculationRequest::new("r-001", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L1);
    let result = engine.calculate_menu_item_carbon(&req).await?;
    // r-001 is in shanghai, which has no city-specific baseline
    assert_eq!(result.baseline_info.unwrap().fallback, BaselineFallback::RegionDefault);

    let req = CalculationRequest::new("r-003", MealType::MeatSimple, EnergyType::Electric, CalculationLevel::L2);
    let err = engine.calculate_menu_item_carbon(&req).await.unwrap_err();
    assert!(matches!(err, CarbonError::Validation { ref field, .. } if field == "region"));
    Ok(())
}

#[tokio::test]
async fn test_breakdown_reconciles_and_reduction_is_non_negative() -> Result<()> {
    let engine = engine().await?;
    let mut heavy = request(CalculationLevel::L2).with_ingredient(IngredientInput::new("猪肉", 1.5));
    heavy.packaging.push(PackagingInput {
        material: "聚丙烯".into(),
        kind: Some("takeout_container".into()),
        weight: None,
    });
    heavy.transport = Some(TransportInput {
        mode: "truck".into(),
        distance: 300.0,
        weight: Some(1.5),
        traceability_factor: None,
    });

    let requests = vec![
        request(CalculationLevel::L1),
        request(CalculationLevel::L2),
        request(CalculationLevel::L2).with_cooking("baked", 45.0),
        heavy,
        CalculationRequest::new("r-001", MealType::MeatFull, EnergyType::Gas, CalculationLevel::L2)
            .with_region("east_china")
            .with_ingredient(IngredientInput::new("鸡肉", 0.25))
            .with_cooking("fried", 8.0),
        CalculationRequest::new("r-001", MealType::MeatSimple, EnergyType::Mixed, CalculationLevel::L2)
            .with_region("south_china")
            .with_cooking("boiled", 20.0),
    ];

    for req in &requests {
        let result = engine.calculate_menu_item_carbon(req).await?;
        let footprint = &result.carbon_footprint;
        assert!(
            (footprint.breakdown.total() - footprint.value).abs() < 0.01,
            "breakdown does not reconcile for {:?}",
            req
        );
        if let Some(reduction) = footprint.reduction {
            assert!(reduction >= 0.0);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_packaging_and_transport_terms() -> Result<()> {
    let engine = engine().await?;
    let mut req = request(CalculationLevel::L2);
    req.packaging.push(PackagingInput {
        material: "PP塑料".into(),
        kind: Some("meal_box".into()),
        weight: None,
    });
    req.transport = Some(TransportInput {
        mode: "冷链货车".into(),
        distance: 200.0,
        weight: None,
        traceability_factor: Some(1.0),
    });
    let result = engine.calculate_menu_item_carbon(&req).await?;

    let b = result.carbon_footprint.breakdown;
    assert!((b.packaging - 0.03 * 1.8).abs() < EPS);
    // traceability factors only apply at L3
    assert!((b.transport - 200.0 * 0.00012).abs() < EPS);
    assert!(result
        .factor_match_info
        .iter()
        .any(|m| m.term == TermKind::Transport && m.factor_id.as_deref() == Some("ef-trn-0001")));
    Ok(())
}

#[tokio::test]
async fn test_l3_uses_verified_data() -> Result<()> {
    let engine = engine().await?;
    let mut rice = IngredientInput::new("大米", 0.2);
    rice.traceability = Some(TraceabilityRecord {
        lot_id: Some("LOT-2024-001".into()),
        supplier_id: Some("sup-9".into()),
        verified_weight: Some(0.22),
    });
    let mut req = request(CalculationLevel::L3).with_ingredient(rice).with_cooking("steamed", 15.0);
    req.meter_reading = Some(MeterReading {
        energy_consumption: 0.8,
        meter_id: Some("meter-17".into()),
    });
    req.transport = Some(TransportInput {
        mode: "冷链货车".into(),
        distance: 100.0,
        weight: Some(0.2),
        traceability_factor: Some(0.0001),
    });

    let result = engine.calculate_menu_item_carbon(&req).await?;
    let b = result.carbon_footprint.breakdown;
    assert!((b.ingredients - 0.22 * 1.2).abs() < EPS);
    assert!((b.energy - 0.8 * 0.7035).abs() < EPS);
    assert!((b.transport - 100.0 * 0.2 * 0.0001).abs() < EPS);
    assert!(result.has_meter_reading);
    assert!(!result.is_estimated);
    assert!(result.factor_match_info.iter().all(|m| m.source == DataSource::Verified));
    assert_eq!(result.factor_match_info[0].lot_id.as_deref(), Some("LOT-2024-001"));
    Ok(())
}

#[tokio::test]
async fn test_results_are_deterministic() -> Result<()> {
    let engine = engine().await?;
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let req = request(CalculationLevel::L2)
        .with_ingredient(IngredientInput::new("西红柿", 0.15))
        .with_ingredient(IngredientInput::new("鸡蛋", 0.1))
        .with_cooking("stir_fried", 6.0);

    let first = engine.calculate_at(&req, now).await?;
    let second = engine.calculate_at(&req, now).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_fail_fast() -> Result<()> {
    let engine = engine().await?;

    let req = request(CalculationLevel::L2).with_ingredient(IngredientInput::new("大米", -1.0));
    let err = engine.calculate_menu_item_carbon(&req).await.unwrap_err();
    assert_eq!(err, CarbonError::validation("ingredients[0].weight", "must not be negative"));

    let err = CalculationRequest::from_json(serde_json::json!({
        "restaurantId": "r-001",
        "mealType": "vegan_feast",
        "energyType": "electric"
    }))
    .unwrap_err();
    assert!(matches!(err, CarbonError::Validation { .. }));
    Ok(())
}

#[tokio::test]
async fn test_missing_baseline_only_fatal_for_l1() -> Result<()> {
    let engine = engine().await?;
    let l1 = CalculationRequest::new("r-001", MealType::MeatFull, EnergyType::Mixed, CalculationLevel::L1)
        .with_region("east_china");
    let err = engine.calculate_menu_item_carbon(&l1).await.unwrap_err();
    assert_eq!(
        err,
        CarbonError::config_missing("baseline/meat_full_east_china_mixed_default_default")
    );

    let mut l2 = l1.clone();
    l2.calculation_level = CalculationLevel::L2;
    let result = engine.calculate_menu_item_carbon(&l2).await?;
    assert_eq!(result.carbon_footprint.baseline, None);
    assert_eq!(result.baseline_comparison, BaselineComparison::Unavailable);
    Ok(())
}

#[tokio::test]
async fn test_match_factors_lookup() -> Result<()> {
    let engine = engine().await?;
    let queries = vec![
        FactorQuery { name: "西红柿".into(), category: None },
        FactorQuery { name: "生菜".into(), category: None },
        FactorQuery { name: "藜".into(), category: Some("grains".into()) },
        FactorQuery { name: "奇亚籽".into(), category: None },
    ];
    let out = engine.match_factors(&queries, "east_china").await?;

    assert_eq!(out[0].match_type, MatchType::Alias);
    assert_eq!(out[0].factor_id.as_deref(), Some("ef-ing-0004"));
    assert_eq!(out[1].match_type, MatchType::CategoryInferred);
    assert_eq!(out[2].factor_id.as_deref(), Some("ef-ing-0090"));
    assert_eq!(out[3].match_type, MatchType::Missing);
    Ok(())
}
