pub mod builtin;
pub mod products;
pub mod schema;

use crate::error::LiebigError;
use crate::model::{Nutrient, NutrientId, NutrientLevel};
use rust_decimal::Decimal;
use schema::{CatalogDef, NutrientDef};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub use builtin::builtin_catalog;

/// Immutable nutrient reference table with a prebuilt name/symbol index.
///
/// Built once when a catalog is loaded and shared by reference with every
/// engine call.
#[derive(Debug, Clone)]
pub struct NutrientCatalog {
    version: String,
    nutrients: Vec<Nutrient>,
    by_symbol: HashMap<String, NutrientId>,
    by_key: HashMap<String, NutrientId>,
}

impl NutrientCatalog {
    /// Build and validate a catalog from its definition.
    pub fn from_def(def: &CatalogDef) -> Result<Self, LiebigError> {
        validate_catalog(def)?;

        let mut nutrients = Vec::with_capacity(def.nutrients.len());
        let mut by_symbol = HashMap::new();
        let mut by_key = HashMap::new();

        for (idx, nd) in def.nutrients.iter().enumerate() {
            let id = NutrientId(idx as u16);
            by_symbol.insert(nd.symbol.clone(), id);
            by_key.insert(lookup_key(&nd.name), id);
            for alias in &nd.aliases {
                by_key.entry(lookup_key(alias)).or_insert(id);
            }
            nutrients.push(Nutrient {
                id,
                name: nd.name.clone(),
                symbol: nd.symbol.clone(),
                unit: nd.unit,
                category: nd.category,
                description: nd.description.clone(),
            });
        }

        // Lowercase symbols last so they never shadow a name or alias.
        for n in &nutrients {
            by_key.entry(n.symbol.to_lowercase()).or_insert(n.id);
        }

        Ok(Self {
            version: def.version.clone(),
            nutrients,
            by_symbol,
            by_key,
        })
    }

    /// The embedded default catalog.
    pub fn builtin() -> &'static NutrientCatalog {
        builtin_catalog()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// All nutrients in catalog order.
    pub fn nutrients(&self) -> &[Nutrient] {
        &self.nutrients
    }

    pub fn len(&self) -> usize {
        self.nutrients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nutrients.is_empty()
    }

    pub fn get(&self, id: NutrientId) -> Option<&Nutrient> {
        self.nutrients.get(id.index())
    }

    /// Display name for `id`, or "unknown" for ids from another catalog.
    pub fn name(&self, id: NutrientId) -> &str {
        self.get(id).map(|n| n.name.as_str()).unwrap_or("unknown")
    }

    /// Resolve a symbol ("Cu"), a name ("Nitrógeno", "nitrogeno") or an alias ("Nitrogen").
    pub fn lookup(&self, key: &str) -> Option<&Nutrient> {
        self.id_of(key).and_then(|id| self.get(id))
    }

    pub fn id_of(&self, key: &str) -> Option<NutrientId> {
        let trimmed = key.trim();
        if let Some(id) = self.by_symbol.get(trimmed) {
            return Some(*id);
        }
        self.by_key.get(&lookup_key(trimmed)).copied()
    }

    /// Convert a boundary map keyed by name or symbol into a typed level.
    ///
    /// Unknown keys are dropped and returned so the caller can report them.
    pub fn resolve_levels(&self, raw: &BTreeMap<String, Decimal>) -> (NutrientLevel, Vec<String>) {
        let mut level = NutrientLevel::new();
        let mut unknown = Vec::new();
        for (key, value) in raw {
            match self.id_of(key) {
                Some(id) => level.set(id, *value),
                None => unknown.push(key.clone()),
            }
        }
        (level, unknown)
    }

    /// Convert a typed level back into a map keyed by nutrient symbol.
    pub fn to_symbol_map(&self, level: &NutrientLevel) -> BTreeMap<String, Decimal> {
        level
            .iter()
            .filter_map(|(id, v)| self.get(id).map(|n| (n.symbol.clone(), v)))
            .collect()
    }
}

/// Normalize a nutrient name to its lookup key.
///
/// Lowercases, folds Spanish accents and drops everything that is not a
/// letter or digit: "Nitrógeno" -> "nitrogeno", "Materia Orgánica" -> "materiaorganica".
pub fn lookup_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => Some('a'),
            'é' | 'è' | 'ë' | 'ê' => Some('e'),
            'í' | 'ì' | 'ï' | 'î' => Some('i'),
            'ó' | 'ò' | 'ö' | 'ô' => Some('o'),
            'ú' | 'ù' | 'ü' | 'û' => Some('u'),
            'ñ' => Some('n'),
            c if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Load a nutrient catalog from a JSON file.
pub fn load_catalog(path: &Path) -> Result<NutrientCatalog, LiebigError> {
    let content = std::fs::read_to_string(path).map_err(|e| LiebigError::CatalogLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let def: CatalogDef = serde_json::from_str(&content).map_err(|e| LiebigError::CatalogLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    NutrientCatalog::from_def(&def)
}

/// Parse a nutrient catalog from a JSON string (no file path context).
pub fn parse_catalog_str(json: &str) -> Result<NutrientCatalog, LiebigError> {
    let def: CatalogDef = serde_json::from_str(json)?;
    NutrientCatalog::from_def(&def)
}

/// Validate that a catalog definition is well-formed.
pub fn validate_catalog(def: &CatalogDef) -> Result<(), LiebigError> {
    if def.nutrients.is_empty() {
        return Err(LiebigError::CatalogInvalid(
            "nutrients must not be empty".into(),
        ));
    }
    if def.nutrients.len() > u16::MAX as usize {
        return Err(LiebigError::CatalogInvalid(format!(
            "too many nutrients ({})",
            def.nutrients.len()
        )));
    }

    let mut symbols: HashMap<&str, &NutrientDef> = HashMap::new();
    let mut keys: HashMap<String, &NutrientDef> = HashMap::new();

    for nd in &def.nutrients {
        if nd.name.trim().is_empty() {
            return Err(LiebigError::CatalogInvalid(
                "nutrient name must not be empty".into(),
            ));
        }
        if nd.symbol.trim().is_empty() {
            return Err(LiebigError::CatalogInvalid(format!(
                "nutrient '{}' has an empty symbol",
                nd.name
            )));
        }
        if let Some(prev) = symbols.insert(nd.symbol.as_str(), nd) {
            return Err(LiebigError::CatalogInvalid(format!(
                "symbol '{}' used by both '{}' and '{}'",
                nd.symbol, prev.name, nd.name
            )));
        }
        if let Some(prev) = keys.insert(lookup_key(&nd.name), nd) {
            return Err(LiebigError::CatalogInvalid(format!(
                "nutrient names '{}' and '{}' collide",
                prev.name, nd.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lookup_key_folds_accents() {
        assert_eq!(lookup_key("Nitrógeno"), "nitrogeno");
        assert_eq!(lookup_key("  Materia Orgánica "), "materiaorganica");
        assert_eq!(lookup_key("FÓSFORO"), "fosforo");
    }

    #[test]
    fn test_lookup_by_symbol_name_and_alias() {
        let catalog = builtin_catalog();
        let n = catalog.lookup("N").unwrap();
        assert_eq!(n.name, "Nitrógeno");
        assert_eq!(catalog.lookup("nitrogeno").unwrap().id, n.id);
        assert_eq!(catalog.lookup("Nitrogen").unwrap().id, n.id);
        assert_eq!(catalog.lookup("n").unwrap().id, n.id);
        assert!(catalog.lookup("plutonio").is_none());
    }

    #[test]
    fn test_symbol_is_case_sensitive_first() {
        let catalog = builtin_catalog();
        // "Cu" is copper; "cu" falls through to the lowercase symbol index.
        assert_eq!(catalog.lookup("Cu").unwrap().symbol, "Cu");
        assert_eq!(catalog.lookup("cu").unwrap().symbol, "Cu");
    }

    #[test]
    fn test_resolve_levels_reports_unknown() {
        let catalog = builtin_catalog();
        let raw = BTreeMap::from([
            ("Nitrógeno".to_string(), dec!(2.5)),
            ("K".to_string(), dec!(1.8)),
            ("textura".to_string(), dec!(1)),
        ]);
        let (level, unknown) = catalog.resolve_levels(&raw);
        assert_eq!(level.len(), 2);
        assert_eq!(level.get(catalog.id_of("N").unwrap()), dec!(2.5));
        assert_eq!(unknown, vec!["textura".to_string()]);
    }

    #[test]
    fn test_parse_valid_catalog() {
        let json = r#"{
            "version": "1",
            "nutrients": [
                { "name": "Nitrogen", "symbol": "N", "unit": "%", "category": "macro" },
                { "name": "Zinc", "symbol": "Zn", "unit": "ppm", "category": "micro" }
            ]
        }"#;
        let catalog = parse_catalog_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name(catalog.id_of("zinc").unwrap()), "Zinc");
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let json = r#"{
            "version": "1",
            "nutrients": [
                { "name": "Nitrogen", "symbol": "N", "category": "macro" },
                { "name": "Nitrate", "symbol": "N", "category": "macro" }
            ]
        }"#;
        assert!(parse_catalog_str(json).is_err());
    }

    #[test]
    fn test_colliding_names_rejected() {
        let json = r#"{
            "version": "1",
            "nutrients": [
                { "name": "Fósforo", "symbol": "P", "category": "macro" },
                { "name": "fosforo", "symbol": "P2", "category": "macro" }
            ]
        }"#;
        assert!(parse_catalog_str(json).is_err());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let json = r#"{ "version": "1", "nutrients": [] }"#;
        assert!(matches!(
            parse_catalog_str(json),
            Err(LiebigError::CatalogInvalid(_))
        ));
    }

    #[test]
    fn test_symbol_map_round_trip() {
        let catalog = builtin_catalog();
        let raw = BTreeMap::from([("Zn".to_string(), dec!(18)), ("P".to_string(), dec!(0.3))]);
        let (level, _) = catalog.resolve_levels(&raw);
        assert_eq!(catalog.to_symbol_map(&level), raw);
    }
}
