use liebig_core::error::LiebigError;
use liebig_core::model::NutrientLevel;
use liebig_core::report::request::{load_records, resolve_records};
use liebig_core::report::CoefficientRow;
use liebig_core::variability::coefficients;
use std::path::Path;

use super::catalog_from;
use crate::output;

pub fn run(history: &Path, catalog: Option<&Path>, output_format: &str) -> Result<(), LiebigError> {
    let catalog = catalog_from(catalog)?;
    let defs = load_records(history)?;
    let (records, warnings) = resolve_records(&catalog, &defs);

    let table = coefficients(&catalog, &records, &NutrientLevel::new());
    let rows: Vec<CoefficientRow> = table
        .iter()
        .filter_map(|(id, estimate)| {
            let nutrient = catalog.get(id)?;
            Some(CoefficientRow {
                nutrient: nutrient.name.clone(),
                symbol: nutrient.symbol.clone(),
                value: estimate.value,
                source: estimate.source,
            })
        })
        .collect();

    match output_format {
        "json" => output::json::print(&rows)?,
        _ => {
            println!("Coefficients of variation from {} record(s):\n", records.len());
            output::text::print_coefficients(&rows);
            output::text::print_warnings(&warnings);
        }
    }
    Ok(())
}
