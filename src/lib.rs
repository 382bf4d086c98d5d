//! Menu Carbon
//!
//! Carbon-footprint calculation engine for restaurant menu items:
//! - Multi-stage emission factor resolution (exact, alias, category keyword)
//! - Regional baselines with grid-intensity adjustment
//! - L1 estimate, L2 recipe-level and L3 verified calculations
//! - Carbon-level classification against configured thresholds
//! - Batch recalculation of stored menu items

pub mod baseline;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod factor;
pub mod model;
pub mod settings;
pub mod store;

// Re-exports for convenience
pub use engine::{CalculationEngine, RecalculationSummary};
pub use error::{CarbonError, Result};
pub use factor::{FactorQuery, FactorResolver};
pub use model::{CalculationRequest, MenuItemCarbonResult};
pub use settings::{EngineSettings, SettingsManager};
pub use store::{CachedStore, CarbonStore, InMemoryStore, MenuStore, StoreSnapshot};
