//! Batch Recalculation
//!
//! Recomputes a restaurant's menu items from their stored inputs. Items run
//! in fixed-size batches with bounded parallelism and a pause between
//! batches. One item failing never stops the others.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CalculationEngine;
use crate::error::{CarbonError, Result};
use crate::model::{
    CalculationLevel, CalculationRequest, EnergyType, MealType, MenuItem, MenuItemCarbonResult,
    Restaurant, NATIONAL_BASELINE_REGION,
};
use crate::store::bounded;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub menu_item_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub menu_item_id: String,
    pub result: MenuItemCarbonResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationSummary {
    pub run_id: String,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub per_item_errors: Vec<ItemError>,
    pub results: Vec<ItemResult>,
}

/// Build a calculation request from a stored menu item. Missing settings
/// take the defaults menu items were created with.
pub fn request_for(item: &MenuItem, restaurant: Option<&Restaurant>) -> CalculationRequest {
    let region = item
        .restaurant_region
        .clone()
        .filter(|r| !r.trim().is_empty())
        .or_else(|| restaurant.and_then(|r| r.region.clone()))
        .unwrap_or_else(|| NATIONAL_BASELINE_REGION.to_string());

    CalculationRequest {
        restaurant_id: item.restaurant_id.clone(),
        meal_type: item.meal_type.unwrap_or(MealType::MeatSimple),
        energy_type: item.energy_type.unwrap_or(EnergyType::Electric),
        calculation_level: item.calculation_level.unwrap_or(CalculationLevel::L2),
        region: Some(region),
        city: restaurant.and_then(|r| r.city.clone()),
        restaurant_type: restaurant.and_then(|r| r.restaurant_type.clone()),
        ingredients: item.ingredients.clone(),
        cooking_method: item.cooking_method.clone(),
        cooking_time: item.cooking_time,
        power: None,
        packaging: item.packaging.clone(),
        transport: item.transport.clone(),
        meter_reading: None,
    }
}

impl CalculationEngine {
    /// Recalculate the given menu items of a restaurant, or all of them when
    /// `menu_item_ids` is empty. Unknown ids are reported as item errors.
    pub async fn recalculate_menu_items(
        &self,
        restaurant_id: &str,
        menu_item_ids: &[String],
    ) -> Result<RecalculationSummary> {
        if restaurant_id.trim().is_empty() {
            return Err(CarbonError::validation("restaurantId", "is required"));
        }
        let run_id = Uuid::new_v4().to_string();
        let deadline = self.settings.store_timeout();

        let restaurant = bounded("restaurant", deadline, self.menus.restaurant(restaurant_id)).await?;
        let items = bounded("menu_items", deadline, self.menus.menu_items(restaurant_id, menu_item_ids)).await?;

        let mut per_item_errors: Vec<ItemError> = menu_item_ids
            .iter()
            .filter(|id| !items.iter().any(|item| &item.menu_item_id == *id))
            .map(|id| ItemError {
                menu_item_id: id.clone(),
                message: format!("menu item not found for restaurant {}", restaurant_id),
            })
            .collect();
        let mut results = Vec::new();

        tracing::info!(
            "Recalculation {} for restaurant {}: {} items, batch size {}",
            run_id,
            restaurant_id,
            items.len(),
            self.settings.batch_size
        );

        let batches: Vec<&[MenuItem]> = items.chunks(self.settings.batch_size.max(1)).collect();
        for (index, batch) in batches.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.batch_pause()).await;
            }

            let outcomes: Vec<(String, Result<MenuItemCarbonResult>)> = stream::iter(batch.iter())
                .map(|item| {
                    let request = request_for(item, restaurant.as_ref());
                    async move {
                        let outcome = self.calculate_menu_item_carbon(&request).await;
                        (item.menu_item_id.clone(), outcome)
                    }
                })
                .buffer_unordered(self.settings.batch_parallelism.max(1))
                .collect()
                .await;

            for (menu_item_id, outcome) in outcomes {
                match outcome {
                    Ok(result) => results.push(ItemResult { menu_item_id, result }),
                    Err(e) => {
                        tracing::warn!("Recalculation {}: item {} failed: {}", run_id, menu_item_id, e);
                        per_item_errors.push(ItemError {
                            menu_item_id,
                            message: e.to_string(),
                        });
                    }
                }
            }
            tracing::debug!("Recalculation {}: batch {}/{} done", run_id, index + 1, batches.len());
        }

        // buffer_unordered completes out of order
        results.sort_by(|a, b| a.menu_item_id.cmp(&b.menu_item_id));
        per_item_errors.sort_by(|a, b| a.menu_item_id.cmp(&b.menu_item_id));

        let summary = RecalculationSummary {
            run_id,
            total: results.len() + per_item_errors.len(),
            success: results.len(),
            failed: per_item_errors.len(),
            per_item_errors,
            results,
        };
        tracing::info!(
            "Recalculation {} finished: {} ok, {} failed",
            summary.run_id,
            summary.success,
            summary.failed
        );
        Ok(summary)
    }
}
