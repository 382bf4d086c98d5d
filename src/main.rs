//! Menu Carbon CLI
//!
//! Runs the calculation engine against a JSON store snapshot:
//!
//! ```text
//! menu_carbon <snapshot.json> calculate <request.json>
//! menu_carbon <snapshot.json> recalculate <restaurantId> [menuItemId...]
//! menu_carbon <snapshot.json> factors <region> <name>...
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr and honour
//! `RUST_LOG`.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use menu_carbon::{
    CalculationEngine, CalculationRequest, EngineSettings, FactorQuery, InMemoryStore, SettingsManager,
};

const USAGE: &str = "usage: menu_carbon <snapshot.json> (calculate <request.json> | recalculate <restaurantId> [menuItemId...] | factors <region> <name>...)";

// ──────────────────────────────────────────────────────────────────────────────
// CONFIGURATION
// ──────────────────────────────────────────────────────────────────────────────

async fn load_settings() -> Result<EngineSettings> {
    match std::env::var("MENU_CARBON_SETTINGS") {
        Ok(path) => {
            let settings = SettingsManager::new(path).load().await?;
            Ok(settings.with_overrides(|key| std::env::var(key).ok()))
        }
        Err(_) => Ok(EngineSettings::from_env()),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!(USAGE);
    }

    let settings = load_settings().await?;
    let store = Arc::new(InMemoryStore::load(&args[0]).await?);
    let engine = CalculationEngine::cached(store.clone(), store, settings);

    let output = match (args[1].as_str(), &args[2..]) {
        ("calculate", [request_path]) => {
            let raw = tokio::fs::read_to_string(request_path)
                .await
                .with_context(|| format!("reading {}", request_path))?;
            let request = CalculationRequest::from_json(serde_json::from_str(&raw)?)?;
            info!("Calculating {} for restaurant {}", request.calculation_level, request.restaurant_id);
            let result = engine.calculate_menu_item_carbon(&request).await?;
            serde_json::to_value(result)?
        }
        ("recalculate", [restaurant_id, ids @ ..]) => {
            let summary = engine.recalculate_menu_items(restaurant_id, ids).await?;
            serde_json::to_value(summary)?
        }
        ("factors", [region, names @ ..]) if !names.is_empty() => {
            let queries: Vec<FactorQuery> = names
                .iter()
                .map(|name| FactorQuery {
                    name: name.clone(),
                    category: None,
                })
                .collect();
            serde_json::to_value(engine.match_factors(&queries, region).await?)?
        }
        _ => bail!(USAGE),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
