pub mod cv;
pub mod nutrients;
pub mod products;
pub mod recommend;

use liebig_core::catalog::{builtin_catalog, load_catalog, NutrientCatalog};
use liebig_core::error::LiebigError;
use std::path::Path;

/// The catalog at `path`, or the built-in one.
fn catalog_from(path: Option<&Path>) -> Result<NutrientCatalog, LiebigError> {
    match path {
        Some(p) => load_catalog(p),
        None => Ok(builtin_catalog().clone()),
    }
}
