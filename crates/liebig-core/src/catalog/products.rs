use super::schema::ProductDef;
use super::NutrientCatalog;
use crate::error::LiebigError;
use crate::model::Product;
use std::collections::HashSet;
use std::path::Path;

/// Load a product list from a JSON file and resolve it against `catalog`.
pub fn load_products(path: &Path, catalog: &NutrientCatalog) -> Result<Vec<Product>, LiebigError> {
    resolve_products(&load_product_defs(path)?, catalog)
}

/// Read unresolved product definitions, e.g. to splice into a request.
pub fn load_product_defs(path: &Path) -> Result<Vec<ProductDef>, LiebigError> {
    let content = std::fs::read_to_string(path).map_err(|e| LiebigError::ProductsLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| LiebigError::ProductsLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Parse a product list from a JSON string (no file path context).
pub fn parse_products_str(json: &str, catalog: &NutrientCatalog) -> Result<Vec<Product>, LiebigError> {
    let defs: Vec<ProductDef> = serde_json::from_str(json)?;
    resolve_products(&defs, catalog)
}

/// Validate product definitions and convert them into typed products.
pub fn resolve_products(
    defs: &[ProductDef],
    catalog: &NutrientCatalog,
) -> Result<Vec<Product>, LiebigError> {
    validate_products(defs, catalog)?;

    Ok(defs
        .iter()
        .map(|def| {
            let (contributions, _) = catalog.resolve_levels(&def.contributions);
            Product {
                name: def.name.clone(),
                description: def.description.clone(),
                contributions,
            }
        })
        .collect())
}

/// Validate that a product list is well-formed.
pub fn validate_products(defs: &[ProductDef], catalog: &NutrientCatalog) -> Result<(), LiebigError> {
    let mut names = HashSet::new();

    for def in defs {
        if def.name.trim().is_empty() {
            return Err(LiebigError::ProductsInvalid(
                "product name must not be empty".into(),
            ));
        }

        if !names.insert(def.name.as_str()) {
            return Err(LiebigError::ProductsInvalid(format!(
                "product '{}' is listed twice",
                def.name
            )));
        }

        for (key, value) in &def.contributions {
            if catalog.id_of(key).is_none() {
                return Err(LiebigError::ProductsInvalid(format!(
                    "product '{}' references unknown nutrient '{}'",
                    def.name, key
                )));
            }
            if value.is_sign_negative() && !value.is_zero() {
                return Err(LiebigError::ProductsInvalid(format!(
                    "product '{}' has negative contribution {} for '{}'",
                    def.name, value, key
                )));
            }
        }
    }

    Ok(())
}

/// Non-fatal issues worth showing to whoever maintains the product list.
pub fn product_warnings(products: &[Product], catalog: &NutrientCatalog) -> Vec<String> {
    let mut warnings = Vec::new();
    for product in products {
        if product.contributions.is_all_zero() {
            warnings.push(format!("product '{}' contributes no nutrients", product.name));
        }
    }
    for nutrient in catalog.nutrients() {
        if !products
            .iter()
            .any(|p| !p.contributions.get(nutrient.id).is_zero())
        {
            warnings.push(format!(
                "no product supplies {} ({})",
                nutrient.name, nutrient.symbol
            ));
        }
    }
    warnings
}
