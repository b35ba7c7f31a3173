//! Liebig's Law of the Minimum: growth is bounded by the scarcest nutrient
//! relative to demand, so only that nutrient gets a corrective delta.

use crate::catalog::NutrientCatalog;
use crate::model::{NutrientId, NutrientLevel};
use crate::variability::{VariabilityCoefficients, CV_GENERIC};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Current level as a percentage of demand. Non-positive demand yields 0.
///
/// A ratio too large for `Decimal` saturates at `Decimal::MAX`.
pub fn sufficiency(level: Decimal, demand: Decimal) -> Decimal {
    if demand <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    level
        .checked_div(demand)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(if level.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        })
}

/// Nutrient with the lowest sufficiency among those in `demands`.
///
/// Ties go to the first nutrient in catalog order. `None` when nothing is demanded.
pub fn limiting_nutrient(levels: &NutrientLevel, demands: &NutrientLevel) -> Option<NutrientId> {
    let mut best: Option<(NutrientId, Decimal)> = None;
    for (id, demand) in demands.iter() {
        let pct = sufficiency(levels.get(id), demand);
        match best {
            Some((_, lowest)) if pct >= lowest => {}
            _ => best = Some((id, pct)),
        }
    }
    best.map(|(id, _)| id)
}

/// Correction applied to the limiting nutrient, scaled by its coefficient.
pub fn adjustment(sufficiency_pct: Decimal, coefficient: Decimal) -> Decimal {
    let gap = if sufficiency_pct > HUNDRED {
        sufficiency_pct - HUNDRED
    } else {
        HUNDRED - sufficiency_pct
    };
    (gap * coefficient / HUNDRED).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sufficiency after applying `delta` toward 100%.
pub fn corrected_level(sufficiency_pct: Decimal, delta: Decimal) -> Decimal {
    let corrected = if sufficiency_pct > HUNDRED {
        sufficiency_pct - delta
    } else {
        sufficiency_pct + delta
    };
    corrected.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One row of the minimum-law analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SufficiencyRow {
    pub nutrient: NutrientId,
    pub current: Decimal,
    pub demand: Decimal,
    /// Sufficiency percentage.
    pub sufficiency: Decimal,
    /// Corrective delta (zero except for the limiting nutrient).
    pub adjustment: Decimal,
    /// Corrected sufficiency percentage.
    pub corrected: Decimal,
    pub limiting: bool,
}

/// Full sweep over every demanded nutrient, in catalog order.
///
/// A nutrient missing from `coefficients` uses its literature default.
pub fn sweep(
    catalog: &NutrientCatalog,
    levels: &NutrientLevel,
    demands: &NutrientLevel,
    coefficients: &VariabilityCoefficients,
) -> Vec<SufficiencyRow> {
    let limiting = limiting_nutrient(levels, demands);

    demands
        .iter()
        .map(|(id, demand)| {
            let current = levels.get(id);
            let pct = sufficiency(current, demand);
            let is_limiting = limiting == Some(id);
            let delta = if is_limiting {
                let cv = catalog
                    .get(id)
                    .map(|n| coefficients.get(n))
                    .unwrap_or(CV_GENERIC);
                adjustment(pct, cv)
            } else {
                Decimal::ZERO
            };
            SufficiencyRow {
                nutrient: id,
                current,
                demand,
                sufficiency: pct,
                adjustment: delta,
                corrected: corrected_level(pct, delta),
                limiting: is_limiting,
            }
        })
        .collect()
}
