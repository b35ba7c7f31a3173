use liebig_core::catalog::products::{load_products, product_warnings};
use liebig_core::error::LiebigError;
use std::path::Path;

use super::catalog_from;
use crate::output;

pub fn validate(file: &Path, catalog: Option<&Path>) -> Result<(), LiebigError> {
    let catalog = catalog_from(catalog)?;
    let products = load_products(file, &catalog)?;

    println!("Product list is valid: {} products.", products.len());
    for p in &products {
        let supplies: Vec<String> = p
            .contributions
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .filter_map(|(id, v)| catalog.get(id).map(|n| format!("{} {}", n.symbol, v)))
            .collect();
        println!("  {:<24} {}", p.name, supplies.join(", "));
    }

    output::text::print_warnings(&product_warnings(&products, &catalog));
    Ok(())
}
