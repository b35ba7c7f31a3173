//! Minimal product blend that closes every nutrient deficit.
//!
//! One non-negative quantity per product; minimize total product applied
//! subject to `Σ contribution · quantity = deficit` for each deficient
//! nutrient. An unreachable target is returned as [`Infeasible`], never
//! approximated.

mod simplex;

use crate::model::{NutrientId, NutrientLevel, Product};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use simplex::{LpOutcome, Problem, EPS};

/// How deficit constraints are posed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintMode {
    /// Deliver exactly the deficit.
    #[default]
    Exact,
    /// Deliver at least the deficit; overshoot allowed.
    AtLeast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerOptions {
    pub mode: ConstraintMode,
    /// Pivot budget across both simplex phases.
    pub max_iterations: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            mode: ConstraintMode::Exact,
            max_iterations: 1000,
        }
    }
}

impl OptimizerOptions {
    pub fn relaxed() -> Self {
        Self {
            mode: ConstraintMode::AtLeast,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deficit {
    pub nutrient: NutrientId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dose {
    pub product: String,
    pub quantity: Decimal,
}

/// A solved blend. Quantities are rounded to two decimals and `delivered`
/// is recomputed from the rounded values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blend {
    /// Products with a non-zero rounded quantity, in product list order.
    pub doses: Vec<Dose>,
    pub delivered: NutrientLevel,
    pub deficits: Vec<Deficit>,
    pub mode: ConstraintMode,
}

impl Blend {
    pub fn is_empty(&self) -> bool {
        self.doses.is_empty()
    }

    pub fn total_quantity(&self) -> Decimal {
        self.doses.iter().map(|d| d.quantity).sum()
    }

    /// Quantity of `product`, zero when it is not part of the blend.
    pub fn quantity_of(&self, product: &str) -> Decimal {
        self.doses
            .iter()
            .find(|d| d.product == product)
            .map(|d| d.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Delivered amount against each deficit, in deficit order.
    pub fn coverage(&self) -> Vec<Coverage> {
        self.deficits
            .iter()
            .map(|d| {
                let delivered = self.delivered.get(d.nutrient);
                let percent = delivered
                    .checked_div(d.amount)
                    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                    .unwrap_or(Decimal::ZERO)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                Coverage {
                    nutrient: d.nutrient,
                    deficit: d.amount,
                    delivered,
                    percent,
                }
            })
            .collect()
    }
}

/// Share of one deficit a blend delivers. Above 100 means over-supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub nutrient: NutrientId,
    pub deficit: Decimal,
    pub delivered: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibleReason {
    /// No product supplies at least one deficient nutrient.
    Uncovered,
    /// Products exist but no non-negative combination meets the constraints.
    NoCombination,
    /// The solver hit its pivot budget or a numeric limit.
    SolverLimit,
}

/// Deficits that no blend of the available products can close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("no blend closes the deficit for {} nutrient(s)", .unmet.len())]
pub struct Infeasible {
    pub unmet: Vec<Deficit>,
    pub reason: InfeasibleReason,
    pub mode: ConstraintMode,
}

impl Infeasible {
    pub fn nutrients(&self) -> impl Iterator<Item = NutrientId> + '_ {
        self.unmet.iter().map(|d| d.nutrient)
    }
}

/// Positive `ideal - current` gaps for nutrients named in `ideal`, in catalog order.
pub fn deficits(current: &NutrientLevel, ideal: &NutrientLevel) -> Vec<Deficit> {
    ideal
        .iter()
        .filter_map(|(id, target)| {
            let gap = target - current.get(id);
            (gap > Decimal::ZERO).then_some(Deficit {
                nutrient: id,
                amount: gap,
            })
        })
        .collect()
}

/// Nutrients supplied by `doses` of `products`.
pub fn delivered_by(doses: &[Dose], products: &[Product]) -> NutrientLevel {
    let mut delivered = NutrientLevel::new();
    for dose in doses {
        let Some(product) = products.iter().find(|p| p.name == dose.product) else {
            continue;
        };
        for (id, per_unit) in product.contributions.iter() {
            if !per_unit.is_zero() {
                delivered.add(id, per_unit * dose.quantity);
            }
        }
    }
    delivered
}

/// Exact-constraint blend with default options.
pub fn optimize(
    current: &NutrientLevel,
    ideal: &NutrientLevel,
    products: &[Product],
) -> Result<Blend, Infeasible> {
    optimize_with(current, ideal, products, &OptimizerOptions::default())
}

pub fn optimize_with(
    current: &NutrientLevel,
    ideal: &NutrientLevel,
    products: &[Product],
    options: &OptimizerOptions,
) -> Result<Blend, Infeasible> {
    let gaps = deficits(current, ideal);
    if gaps.is_empty() {
        return Ok(Blend {
            doses: Vec::new(),
            delivered: NutrientLevel::new(),
            deficits: gaps,
            mode: options.mode,
        });
    }

    let uncovered: Vec<Deficit> = gaps
        .iter()
        .filter(|d| {
            !products
                .iter()
                .any(|p| p.contributions.get(d.nutrient) > Decimal::ZERO)
        })
        .copied()
        .collect();
    if !uncovered.is_empty() {
        log::debug!("{} deficient nutrient(s) have no supplier", uncovered.len());
        return Err(Infeasible {
            unmet: uncovered,
            reason: InfeasibleReason::Uncovered,
            mode: options.mode,
        });
    }

    let problem = Problem {
        a: gaps
            .iter()
            .map(|d| {
                products
                    .iter()
                    .map(|p| p.contributions.get(d.nutrient))
                    .collect()
            })
            .collect(),
        b: gaps.iter().map(|d| d.amount).collect(),
        cost: vec![Decimal::ONE; products.len()],
        at_least: options.mode == ConstraintMode::AtLeast,
    };
    log::debug!(
        "solving blend: {} constraint(s), {} product(s), {:?}",
        problem.b.len(),
        products.len(),
        options.mode
    );

    match simplex::solve(&problem, options.max_iterations) {
        LpOutcome::Optimal(x) => {
            let doses: Vec<Dose> = products
                .iter()
                .zip(x)
                .filter_map(|(p, q)| {
                    let quantity =
                        q.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                    (quantity > Decimal::ZERO).then(|| Dose {
                        product: p.name.clone(),
                        quantity,
                    })
                })
                .collect();
            let delivered = delivered_by(&doses, products);
            Ok(Blend {
                doses,
                delivered,
                deficits: gaps,
                mode: options.mode,
            })
        }
        LpOutcome::Infeasible(residual) => {
            let mut unmet: Vec<Deficit> = gaps
                .iter()
                .zip(&residual)
                .filter(|(_, r)| **r > EPS)
                .map(|(d, _)| *d)
                .collect();
            if unmet.is_empty() {
                unmet = gaps;
            }
            Err(Infeasible {
                unmet,
                reason: InfeasibleReason::NoCombination,
                mode: options.mode,
            })
        }
        outcome => {
            log::warn!("blend solver gave up: {outcome:?}");
            Err(Infeasible {
                unmet: gaps,
                reason: InfeasibleReason::SolverLimit,
                mode: options.mode,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const N: NutrientId = NutrientId(0);
    const P: NutrientId = NutrientId(1);
    const K: NutrientId = NutrientId(2);
    const ZN: NutrientId = NutrientId(9);

    fn level(pairs: &[(NutrientId, Decimal)]) -> NutrientLevel {
        pairs.iter().copied().collect()
    }

    fn make_product(name: &str, pairs: &[(NutrientId, Decimal)]) -> Product {
        Product {
            name: name.into(),
            description: None,
            contributions: level(pairs),
        }
    }

    #[test]
    fn test_no_deficit_is_empty_blend() {
        let current = level(&[(N, dec!(3)), (P, dec!(1))]);
        let ideal = level(&[(N, dec!(2)), (P, dec!(1))]);
        let blend = optimize(&current, &ideal, &[make_product("U", &[(N, dec!(1))])]).unwrap();
        assert!(blend.is_empty());
        assert!(blend.delivered.is_all_zero());
        assert!(blend.deficits.is_empty());
    }

    #[test]
    fn test_no_deficit_without_products_still_succeeds() {
        let ideal = level(&[(N, dec!(2))]);
        let blend = optimize(&ideal, &ideal, &[]).unwrap();
        assert!(blend.is_empty());
    }

    #[test]
    fn test_single_product_exact() {
        let current = level(&[(N, dec!(2.0))]);
        let ideal = level(&[(N, dec!(3.0))]);
        let blend = optimize(&current, &ideal, &[make_product("UreaX", &[(N, dec!(1.0))])]).unwrap();
        assert_eq!(blend.doses.len(), 1);
        assert_eq!(blend.quantity_of("UreaX"), dec!(1.00));
        assert_eq!(blend.delivered.get(N), dec!(1.0));
    }

    #[test]
    fn test_exact_ratio_product_delivers_deficit() {
        let current = level(&[(N, dec!(1)), (P, dec!(0.5)), (K, dec!(2))]);
        let ideal = level(&[(N, dec!(4)), (P, dec!(2)), (K, dec!(3))]);
        // Deficits 3 : 1.5 : 1 match the product ratio exactly.
        let product = make_product("Blend", &[(N, dec!(0.6)), (P, dec!(0.3)), (K, dec!(0.2))]);
        let blend = optimize(&current, &ideal, &[product]).unwrap();
        assert_eq!(blend.quantity_of("Blend"), dec!(5.00));
        for d in &blend.deficits {
            assert!((blend.delivered.get(d.nutrient) - d.amount).abs() <= dec!(0.01));
        }
    }

    #[test]
    fn test_picks_most_concentrated_product() {
        let current = level(&[(N, dec!(0))]);
        let ideal = level(&[(N, dec!(46))]);
        let products = [
            make_product("Ammonium nitrate", &[(N, dec!(33))]),
            make_product("Urea", &[(N, dec!(46))]),
        ];
        let blend = optimize(&current, &ideal, &products).unwrap();
        assert_eq!(blend.doses.len(), 1);
        assert_eq!(blend.quantity_of("Urea"), dec!(1.00));
    }

    #[test]
    fn test_uncovered_nutrient_is_named() {
        let current = level(&[(N, dec!(1)), (ZN, dec!(0))]);
        let ideal = level(&[(N, dec!(2)), (ZN, dec!(5))]);
        let err = optimize(&current, &ideal, &[make_product("U", &[(N, dec!(1))])]).unwrap_err();
        assert_eq!(err.reason, InfeasibleReason::Uncovered);
        assert_eq!(err.nutrients().collect::<Vec<_>>(), vec![ZN]);
        assert_eq!(err.unmet[0].amount, dec!(5));
    }

    #[test]
    fn test_empty_products_with_deficit_is_infeasible() {
        let current = level(&[(N, dec!(1)), (P, dec!(1))]);
        let ideal = level(&[(N, dec!(2)), (P, dec!(2))]);
        let err = optimize(&current, &ideal, &[]).unwrap_err();
        assert_eq!(err.unmet.len(), 2);
    }

    #[test]
    fn test_ratio_conflict_infeasible_then_relaxed() {
        let current = level(&[(N, dec!(0)), (P, dec!(0))]);
        let ideal = level(&[(N, dec!(1)), (P, dec!(2))]);
        let products = [make_product("NP", &[(N, dec!(1)), (P, dec!(1))])];

        let err = optimize(&current, &ideal, &products).unwrap_err();
        assert_eq!(err.reason, InfeasibleReason::NoCombination);
        assert!(!err.unmet.is_empty());

        let blend = optimize_with(&current, &ideal, &products, &OptimizerOptions::relaxed()).unwrap();
        assert_eq!(blend.mode, ConstraintMode::AtLeast);
        assert_eq!(blend.quantity_of("NP"), dec!(2.00));
        assert!(blend.delivered.get(P) >= dec!(2));
    }

    #[test]
    fn test_quantities_rounded_and_delivered_recomputed() {
        let current = level(&[(N, dec!(0))]);
        let ideal = level(&[(N, dec!(1))]);
        let blend = optimize(&current, &ideal, &[make_product("T", &[(N, dec!(3))])]).unwrap();
        assert_eq!(blend.quantity_of("T"), dec!(0.33));
        assert_eq!(blend.delivered.get(N), dec!(0.99));
    }

    #[test]
    fn test_solver_limit_reported() {
        let current = level(&[(N, dec!(0))]);
        let ideal = level(&[(N, dec!(1))]);
        let options = OptimizerOptions {
            max_iterations: 0,
            ..OptimizerOptions::default()
        };
        let err = optimize_with(&current, &ideal, &[make_product("U", &[(N, dec!(1))])], &options)
            .unwrap_err();
        assert_eq!(err.reason, InfeasibleReason::SolverLimit);
    }

    #[test]
    fn test_deficits_ignore_surplus_and_unlisted() {
        let current = level(&[(N, dec!(5)), (P, dec!(1)), (K, dec!(9))]);
        let ideal = level(&[(N, dec!(4)), (P, dec!(1.5))]);
        let gaps = deficits(&current, &ideal);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].nutrient, P);
        assert_eq!(gaps[0].amount, dec!(0.5));
    }

    #[test]
    fn test_coverage_shows_relaxed_overshoot() {
        let current = level(&[(N, dec!(0)), (P, dec!(0))]);
        let ideal = level(&[(N, dec!(1)), (P, dec!(2))]);
        let products = [make_product("NP", &[(N, dec!(1)), (P, dec!(1))])];
        let blend =
            optimize_with(&current, &ideal, &products, &OptimizerOptions::relaxed()).unwrap();

        let coverage = blend.coverage();
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[0].deficit, dec!(1));
        assert_eq!(coverage[0].delivered, dec!(2));
        assert_eq!(coverage[0].percent, dec!(200));
        assert_eq!(coverage[1].percent, dec!(100));
    }
}
