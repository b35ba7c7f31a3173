use super::schema::CatalogDef;
use super::NutrientCatalog;
use std::sync::LazyLock;

const NUTRIENTS_JSON: &str = include_str!("../../../../data/nutrients.json");

static BUILTIN_CATALOG: LazyLock<NutrientCatalog> = LazyLock::new(|| {
    let def: CatalogDef =
        serde_json::from_str(NUTRIENTS_JSON).expect("embedded nutrients.json is valid");
    NutrientCatalog::from_def(&def).expect("embedded nutrients.json passes validation")
});

/// The default 14-nutrient catalog, built once per process.
pub fn builtin_catalog() -> &'static NutrientCatalog {
    &BUILTIN_CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn test_builtin_loads() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 14);
        assert_eq!(catalog.version(), "2025.1");
    }

    #[test]
    fn test_builtin_classification() {
        let catalog = builtin_catalog();
        let macros = catalog
            .nutrients()
            .iter()
            .filter(|n| n.category == Category::Macro)
            .count();
        assert_eq!(macros, 6);
        assert_eq!(catalog.lookup("Fe").unwrap().category, Category::Micro);
    }

    #[test]
    fn test_builtin_order_starts_with_npk() {
        let symbols: Vec<&str> = builtin_catalog()
            .nutrients()
            .iter()
            .take(3)
            .map(|n| n.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["N", "P", "K"]);
    }
}
