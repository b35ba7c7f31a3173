//! Per-nutrient coefficient of variation from a plot's sampling history.
//!
//! The coefficient scales how aggressively the limiting nutrient is corrected.
//! Sparse or degenerate history falls back to literature values so the
//! pipeline never stops on missing data.

use crate::catalog::NutrientCatalog;
use crate::model::{AnalysisRecord, Nutrient, NutrientId, NutrientLevel};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Most recent readings considered per nutrient.
pub const HISTORY_WINDOW: usize = 10;

/// Minimum readings needed before the statistic is trusted.
pub const MIN_HISTORY: usize = 3;

pub const CV_MIN: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05
pub const CV_MAX: Decimal = Decimal::ONE;
pub const CV_GENERIC: Decimal = Decimal::from_parts(3, 0, 0, false, 1); // 0.3

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CoefficientSource {
    /// Computed from this many historical readings.
    History { samples: usize },
    /// Too few readings; literature value for the nutrient.
    Literature { samples: usize },
    /// Mean of zero or arithmetic failure.
    Fallback,
    /// Set explicitly by an agronomist.
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientEstimate {
    pub value: Decimal,
    pub source: CoefficientSource,
}

/// Coefficient table for one plot. Nutrients without an entry read as their
/// literature default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariabilityCoefficients(BTreeMap<NutrientId, CoefficientEstimate>);

impl VariabilityCoefficients {
    pub fn get(&self, nutrient: &Nutrient) -> Decimal {
        self.0
            .get(&nutrient.id)
            .map(|e| e.value)
            .unwrap_or_else(|| literature_default(nutrient))
    }

    pub fn estimate(&self, id: NutrientId) -> Option<&CoefficientEstimate> {
        self.0.get(&id)
    }

    pub fn insert(&mut self, id: NutrientId, estimate: CoefficientEstimate) {
        self.0.insert(id, estimate);
    }

    pub fn iter(&self) -> impl Iterator<Item = (NutrientId, &CoefficientEstimate)> + '_ {
        self.0.iter().map(|(id, e)| (*id, e))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Literature coefficient used when history is too short.
pub fn literature_default(nutrient: &Nutrient) -> Decimal {
    match nutrient.symbol.as_str() {
        "N" => Decimal::from_parts(5, 0, 0, false, 1),
        "P" => Decimal::from_parts(3, 0, 0, false, 1),
        "K" => Decimal::from_parts(4, 0, 0, false, 1),
        "Cu" | "Zn" => Decimal::from_parts(25, 0, 0, false, 2),
        _ => CV_GENERIC,
    }
}

/// Coefficient of variation for one nutrient.
///
/// `history` holds readings ordered newest first, already stripped of missing
/// values. Only the first [`HISTORY_WINDOW`] are used.
pub fn estimate(history: &[Decimal], nutrient: &Nutrient) -> Decimal {
    estimate_detailed(history, nutrient).value
}

/// Like [`estimate`], also reporting where the value came from.
pub fn estimate_detailed(history: &[Decimal], nutrient: &Nutrient) -> CoefficientEstimate {
    let window = &history[..history.len().min(HISTORY_WINDOW)];

    if window.len() < MIN_HISTORY {
        return CoefficientEstimate {
            value: literature_default(nutrient),
            source: CoefficientSource::Literature {
                samples: window.len(),
            },
        };
    }

    match coefficient_of_variation(window) {
        Some(cv) => CoefficientEstimate {
            value: cv
                .clamp(CV_MIN, CV_MAX)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            source: CoefficientSource::History {
                samples: window.len(),
            },
        },
        None => {
            log::warn!(
                "coefficient of variation for {} fell back to {CV_GENERIC}",
                nutrient.name
            );
            CoefficientEstimate {
                value: CV_GENERIC,
                source: CoefficientSource::Fallback,
            }
        }
    }
}

/// σ/μ with sample standard deviation. `None` on zero mean or arithmetic failure.
fn coefficient_of_variation(values: &[Decimal]) -> Option<Decimal> {
    let n = Decimal::from(values.len());
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    let mean = sum.checked_div(n)?;
    if mean.is_zero() {
        return None;
    }

    let squares = values.iter().try_fold(Decimal::ZERO, |acc, v| {
        let d = v.checked_sub(mean)?;
        acc.checked_add(d.checked_mul(d)?)
    })?;
    let variance = squares.checked_div(n - Decimal::ONE)?;
    let sigma = variance.sqrt()?;
    sigma.checked_div(mean).map(|cv| cv.abs())
}

/// Coefficients for every catalog nutrient from a plot's past records.
///
/// Records may arrive in any order; they are sorted newest first. `overrides`
/// replaces computed values and is clamped to the same bounds.
pub fn coefficients(
    catalog: &NutrientCatalog,
    history: &[AnalysisRecord],
    overrides: &NutrientLevel,
) -> VariabilityCoefficients {
    let mut records: Vec<&AnalysisRecord> = history.iter().collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));

    let mut table = VariabilityCoefficients::default();
    for nutrient in catalog.nutrients() {
        let estimate = match overrides.reading(nutrient.id) {
            Some(value) => CoefficientEstimate {
                value: value.clamp(CV_MIN, CV_MAX),
                source: CoefficientSource::Override,
            },
            None => {
                let readings: Vec<Decimal> = records
                    .iter()
                    .filter_map(|r| r.levels.reading(nutrient.id))
                    .take(HISTORY_WINDOW)
                    .collect();
                estimate_detailed(&readings, nutrient)
            }
        };
        log::debug!(
            "cv {} = {} ({:?})",
            nutrient.symbol,
            estimate.value,
            estimate.source
        );
        table.insert(nutrient.id, estimate);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::model::SampleKind;
    use rust_decimal_macros::dec;

    fn nutrient(symbol: &str) -> &'static Nutrient {
        builtin_catalog().lookup(symbol).unwrap()
    }

    #[test]
    fn test_short_history_uses_literature() {
        for len in 0..3 {
            let history = vec![dec!(2.0); len];
            assert_eq!(estimate(&history, nutrient("N")), dec!(0.5));
            assert_eq!(estimate(&history, nutrient("P")), dec!(0.3));
            assert_eq!(estimate(&history, nutrient("K")), dec!(0.4));
            assert_eq!(estimate(&history, nutrient("Cu")), dec!(0.25));
            assert_eq!(estimate(&history, nutrient("Zn")), dec!(0.25));
            assert_eq!(estimate(&history, nutrient("Mg")), dec!(0.3));
        }
    }

    #[test]
    fn test_cv_computed_and_rounded() {
        // mean 3, sample sd 1 -> 0.333.. -> 0.33
        let history = [dec!(2), dec!(3), dec!(4)];
        let est = estimate_detailed(&history, nutrient("N"));
        assert_eq!(est.value, dec!(0.33));
        assert_eq!(est.source, CoefficientSource::History { samples: 3 });
    }

    #[test]
    fn test_zero_mean_falls_back() {
        let history = [dec!(0), dec!(0), dec!(0)];
        let est = estimate_detailed(&history, nutrient("N"));
        assert_eq!(est.value, dec!(0.3));
        assert_eq!(est.source, CoefficientSource::Fallback);
    }

    #[test]
    fn test_constant_history_clamped_to_minimum() {
        let history = [dec!(2.5), dec!(2.5), dec!(2.5), dec!(2.5)];
        assert_eq!(estimate(&history, nutrient("K")), dec!(0.05));
    }

    #[test]
    fn test_wild_history_clamped_to_maximum() {
        let history = [dec!(0.1), dec!(0.1), dec!(0.1), dec!(50)];
        assert_eq!(estimate(&history, nutrient("K")), dec!(1.0));
    }

    #[test]
    fn test_order_reversal_invariant() {
        let history = [
            dec!(2.3),
            dec!(2.9),
            dec!(2.1),
            dec!(3.4),
            dec!(2.6),
            dec!(2.2),
        ];
        let mut reversed = history;
        reversed.reverse();
        let a = estimate(&history, nutrient("N"));
        let b = estimate(&reversed, nutrient("N"));
        assert_eq!(a, b);
        assert!(a >= CV_MIN && a <= CV_MAX);
    }

    #[test]
    fn test_window_limits_history() {
        // First ten readings are constant; the outlier beyond the window is ignored.
        let mut history = vec![dec!(1); HISTORY_WINDOW];
        history.push(dec!(100));
        assert_eq!(estimate(&history, nutrient("P")), CV_MIN);
    }

    fn record(id: &str, date: &str, n: Decimal) -> AnalysisRecord {
        let catalog = builtin_catalog();
        let mut levels = NutrientLevel::new();
        levels.set(catalog.id_of("N").unwrap(), n);
        AnalysisRecord {
            id: id.into(),
            date: date.into(),
            kind: SampleKind::Foliar,
            levels,
        }
    }

    #[test]
    fn test_coefficients_cover_catalog() {
        let catalog = builtin_catalog();
        let history = vec![
            record("a", "2025-01-10", dec!(2)),
            record("b", "2025-03-10", dec!(4)),
            record("c", "2025-02-10", dec!(3)),
        ];
        let table = coefficients(catalog, &history, &NutrientLevel::new());
        assert_eq!(table.len(), catalog.len());
        assert_eq!(table.get(nutrient("N")), dec!(0.33));
        // No phosphorus readings at all.
        let p = table.estimate(catalog.id_of("P").unwrap()).unwrap();
        assert_eq!(p.source, CoefficientSource::Literature { samples: 0 });
    }

    #[test]
    fn test_overrides_win_and_are_clamped() {
        let catalog = builtin_catalog();
        let n = catalog.id_of("N").unwrap();
        let k = catalog.id_of("K").unwrap();
        let mut overrides = NutrientLevel::new();
        overrides.set(n, dec!(0.15));
        overrides.set(k, dec!(3));
        let table = coefficients(catalog, &[], &overrides);
        assert_eq!(table.get(nutrient("N")), dec!(0.15));
        assert_eq!(table.get(nutrient("K")), dec!(1));
        assert_eq!(
            table.estimate(n).unwrap().source,
            CoefficientSource::Override
        );
    }

    #[test]
    fn test_empty_table_reads_literature() {
        let table = VariabilityCoefficients::default();
        assert_eq!(table.get(nutrient("N")), dec!(0.5));
        assert_eq!(table.get(nutrient("K")), dec!(0.4));
        assert_eq!(table.get(nutrient("Zn")), dec!(0.25));
        assert_eq!(table.get(nutrient("Mg")), CV_GENERIC);
    }
}
