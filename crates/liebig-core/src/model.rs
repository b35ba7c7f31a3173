use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a nutrient in its catalog. Ordering follows catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientId(pub(crate) u16);

impl NutrientId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Macro,
    Micro,
}

impl Category {
    /// Unit used when reporting how much of a nutrient a blend delivers.
    pub fn application_unit(self) -> Unit {
        match self {
            Category::Macro => Unit::KgPerHa,
            Category::Micro => Unit::GPerHa,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Macro => write!(f, "macro"),
            Category::Micro => write!(f, "micro"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kg/ha")]
    #[default]
    KgPerHa,
    #[serde(rename = "g/ha")]
    GPerHa,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "ppm")]
    Ppm,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::KgPerHa => write!(f, "kg/ha"),
            Unit::GPerHa => write!(f, "g/ha"),
            Unit::Percent => write!(f, "%"),
            Unit::Ppm => write!(f, "ppm"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nutrient {
    pub id: NutrientId,
    pub name: String,
    pub symbol: String,
    pub unit: Unit,
    pub category: Category,
    pub description: Option<String>,
}

/// Quantity per nutrient. Missing nutrients read as zero.
///
/// Used for current levels, ideal targets, per-unit product contributions and
/// delivered amounts. Values are never negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientLevel(BTreeMap<NutrientId, Decimal>);

impl NutrientLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `id`, zero if absent.
    pub fn get(&self, id: NutrientId) -> Decimal {
        self.0.get(&id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Value for `id` only if it was actually recorded.
    pub fn reading(&self, id: NutrientId) -> Option<Decimal> {
        self.0.get(&id).copied()
    }

    pub fn contains(&self, id: NutrientId) -> bool {
        self.0.contains_key(&id)
    }

    /// Store a value, clamping negatives to zero.
    pub fn set(&mut self, id: NutrientId, value: Decimal) {
        if value.is_sign_negative() && !value.is_zero() {
            log::warn!("negative nutrient value {value} for id {} clamped to 0", id.0);
            self.0.insert(id, Decimal::ZERO);
        } else {
            self.0.insert(id, value);
        }
    }

    /// Add to the stored value (missing counts as zero).
    pub fn add(&mut self, id: NutrientId, value: Decimal) {
        let total = self.get(id) + value;
        self.set(id, total);
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (NutrientId, Decimal)> + '_ {
        self.0.iter().map(|(id, v)| (*id, *v))
    }

    pub fn ids(&self) -> impl Iterator<Item = NutrientId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every stored value is zero (an empty level counts).
    pub fn is_all_zero(&self) -> bool {
        self.0.values().all(|v| v.is_zero())
    }
}

impl FromIterator<(NutrientId, Decimal)> for NutrientLevel {
    fn from_iter<I: IntoIterator<Item = (NutrientId, Decimal)>>(iter: I) -> Self {
        let mut level = NutrientLevel::new();
        for (id, value) in iter {
            level.set(id, value);
        }
        level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: Option<String>,
    /// Nutrients supplied by one unit of product.
    pub contributions: NutrientLevel,
}

/// Ideal nutrient profile for a crop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub crop: String,
    pub ideal: NutrientLevel,
    pub target_value: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub rest: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    #[default]
    Foliar,
    Soil,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::Foliar => write!(f, "foliar"),
            SampleKind::Soil => write!(f, "soil"),
        }
    }
}

/// One sampling of a plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    /// ISO date (`YYYY-MM-DD`), so lexical order is chronological.
    pub date: String,
    pub kind: SampleKind,
    pub levels: NutrientLevel,
}

/// Same-plot records analysed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub plot_id: String,
    pub records: Vec<AnalysisRecord>,
}
