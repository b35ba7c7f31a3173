pub mod catalog;
pub mod error;
pub mod liebig;
pub mod model;
pub mod optimize;
pub mod recommend;
pub mod report;
pub mod trace;
pub mod variability;

use catalog::NutrientCatalog;
use error::LiebigError;
use liebig::SufficiencyRow;
use model::{NutrientLevel, Product};
use optimize::{Blend, Infeasible};
use recommend::Recommendation;
use variability::VariabilityCoefficients;

pub use report::{generate_and_store, generate_report, Report, SamplePolicy};

/// Outcome of [`analyze_snapshot`]: the sweep it was based on and the recommendation.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub sweep: Vec<SufficiencyRow>,
    pub blend: Result<Blend, Infeasible>,
    pub recommendation: Recommendation,
}

/// Analyse a single snapshot without a request or store.
///
/// Runs the minimum-law sweep with `coefficients` (literature defaults for
/// nutrients it lacks), solves the exact blend and assembles the
/// recommendation. Nutrient ids must come from `catalog`.
pub fn analyze_snapshot(
    catalog: &NutrientCatalog,
    current: &NutrientLevel,
    ideal: &NutrientLevel,
    products: &[Product],
    coefficients: &VariabilityCoefficients,
) -> Result<Analysis, LiebigError> {
    if ideal.is_empty() {
        return Err(LiebigError::NoDemands);
    }
    let sweep = liebig::sweep(catalog, current, ideal, coefficients);
    let blend = optimize::optimize(current, ideal, products);
    let recommendation = recommend::assemble(catalog, &sweep, &blend);
    Ok(Analysis {
        sweep,
        blend,
        recommendation,
    })
}
