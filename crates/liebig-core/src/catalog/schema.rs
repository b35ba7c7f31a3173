use crate::model::{Category, Unit};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A nutrient catalog as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDef {
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Nutrients in catalog order. Order decides ties between limiting nutrients.
    pub nutrients: Vec<NutrientDef>,
}

/// A single nutrient entry within a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientDef {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub unit: Unit,
    pub category: Category,
    /// Alternative names accepted when resolving input keys.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A fertilizer product as supplied by the product list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Map of nutrient name or symbol -> contribution per unit (as string for exact decimal).
    pub contributions: BTreeMap<String, Decimal>,
}
