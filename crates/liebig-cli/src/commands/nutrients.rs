use liebig_core::error::LiebigError;
use std::path::Path;

use super::catalog_from;

pub fn list(catalog: Option<&Path>) -> Result<(), LiebigError> {
    let catalog = catalog_from(catalog)?;

    println!(
        "Nutrient catalog v{} ({} nutrients):\n",
        catalog.version(),
        catalog.len()
    );

    let max_name = catalog
        .nutrients()
        .iter()
        .map(|n| n.name.chars().count())
        .max()
        .unwrap_or(10);

    for n in catalog.nutrients() {
        let pad = max_name - n.name.chars().count();
        println!(
            "  {:<4} {}{}  {:<6} measured in {:<6} applied in {}",
            n.symbol,
            n.name,
            " ".repeat(pad),
            n.category.to_string(),
            n.unit.to_string(),
            n.category.application_unit()
        );
        if let Some(ref desc) = n.description {
            println!("       {}", desc);
        }
    }
    Ok(())
}
