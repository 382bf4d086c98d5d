//! Domain Model
//!
//! Records read from the store, the calculation request, and the result
//! value object returned by the engine.

pub mod baseline;
pub mod factor;
pub mod menu;
pub mod request;
pub mod result;
pub mod types;

pub use baseline::{
    Baseline, BaselineBreakdown, BaselineCategory, BaselineFootprint, ConfidenceInterval,
    NATIONAL_BASELINE_REGION,
};
pub use factor::{
    EmissionFactor, FactorCategory, FactorStatus, GridFactor, IngredientAlias, IngredientCategory,
    NATIONAL_FACTOR_REGION,
};
pub use menu::{ConfigDocument, MenuItem, Restaurant};
pub use request::{
    CalculationRequest, IngredientInput, MeterReading, PackagingInput, TraceabilityRecord,
    TransportInput,
};
pub use result::{
    BaselineComparison, BaselineFallback, BaselineInfo, Breakdown, CarbonFootprint, DataSource,
    FactorMatch, MatchType, MenuItemCarbonResult, OptimizationFlag, TermKind,
};
pub use types::{CalculationLevel, CarbonLevel, EnergyType, MealType, RecordStatus};
