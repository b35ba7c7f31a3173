//! Dense two-phase simplex over exact decimals.
//!
//! Problems here are tiny (under ~20 constraints and products), so a dense
//! tableau with Bland's rule is plenty and never cycles.

use rust_decimal::Decimal;

/// Values within this distance of zero are treated as zero.
pub(crate) const EPS: Decimal = Decimal::from_parts(1, 0, 0, false, 12);

/// `minimize cost·x  s.t.  A x (= or >=) b,  x >= 0`, with `b >= 0`.
#[derive(Debug, Clone)]
pub(crate) struct Problem {
    pub a: Vec<Vec<Decimal>>,
    pub b: Vec<Decimal>,
    pub cost: Vec<Decimal>,
    /// Rows are `>=` instead of `=`.
    pub at_least: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpOutcome {
    /// Values of the structural variables.
    Optimal(Vec<Decimal>),
    /// Phase one could not zero the artificials; residual per constraint row.
    Infeasible(Vec<Decimal>),
    Unbounded,
    IterationLimit,
    /// A checked decimal operation overflowed.
    NumericFailure,
}

struct Tableau {
    rows: Vec<Vec<Decimal>>,
    /// Reduced costs; last entry is minus the objective value.
    obj: Vec<Decimal>,
    basis: Vec<usize>,
    /// Columns that may never enter the basis.
    barred: Vec<bool>,
    iterations: usize,
    max_iterations: usize,
}

enum Step {
    Optimal,
    Unbounded,
    Limit,
    Overflow,
}

/// a - b * c, checked.
fn sub_mul(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    a.checked_sub(b.checked_mul(c)?)
}

impl Tableau {
    fn width(&self) -> usize {
        self.obj.len()
    }

    fn rhs(&self, row: usize) -> Decimal {
        self.rows[row][self.width() - 1]
    }

    fn pivot(&mut self, row: usize, col: usize) -> Option<()> {
        let p = self.rows[row][col];
        for v in self.rows[row].iter_mut() {
            *v = v.checked_div(p)?;
        }
        let pivot_row = self.rows[row].clone();

        for (i, r) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor.is_zero() {
                continue;
            }
            for (v, pv) in r.iter_mut().zip(&pivot_row) {
                *v = sub_mul(*v, factor, *pv)?;
            }
        }

        let factor = self.obj[col];
        if !factor.is_zero() {
            for (v, pv) in self.obj.iter_mut().zip(&pivot_row) {
                *v = sub_mul(*v, factor, *pv)?;
            }
        }

        self.basis[row] = col;
        Some(())
    }

    /// Bland's rule: lowest-index improving column, lowest-basis tie break on ratios.
    fn run(&mut self) -> Step {
        let cols = self.width() - 1;
        loop {
            let entering = (0..cols).find(|&j| !self.barred[j] && self.obj[j] < -EPS);
            let Some(col) = entering else {
                return Step::Optimal;
            };

            let mut leaving: Option<(usize, Decimal)> = None;
            for i in 0..self.rows.len() {
                let t = self.rows[i][col];
                if t <= EPS {
                    continue;
                }
                let Some(ratio) = self.rhs(i).checked_div(t) else {
                    return Step::Overflow;
                };
                let better = match leaving {
                    None => true,
                    Some((r, best)) => {
                        ratio < best - EPS
                            || ((ratio - best).abs() <= EPS && self.basis[i] < self.basis[r])
                    }
                };
                if better {
                    leaving = Some((i, ratio));
                }
            }
            let Some((row, _)) = leaving else {
                return Step::Unbounded;
            };

            if self.iterations >= self.max_iterations {
                return Step::Limit;
            }
            self.iterations += 1;
            if self.pivot(row, col).is_none() {
                return Step::Overflow;
            }
        }
    }
}

/// Solve `problem` with the two-phase method.
pub(crate) fn solve(problem: &Problem, max_iterations: usize) -> LpOutcome {
    let m = problem.b.len();
    let n = problem.cost.len();
    let surplus = if problem.at_least { m } else { 0 };
    let art0 = n + surplus;
    let width = art0 + m + 1;

    let mut rows = Vec::with_capacity(m);
    for i in 0..m {
        let mut row = vec![Decimal::ZERO; width];
        row[..n].copy_from_slice(&problem.a[i][..n]);
        if problem.at_least {
            row[n + i] = -Decimal::ONE;
        }
        row[art0 + i] = Decimal::ONE;
        row[width - 1] = problem.b[i];
        rows.push(row);
    }

    // Phase one: minimize the sum of artificials, priced out against the initial basis.
    let mut obj = vec![Decimal::ZERO; width];
    for row in &rows {
        for j in 0..art0 {
            obj[j] -= row[j];
        }
        obj[width - 1] -= row[width - 1];
    }

    let mut tab = Tableau {
        rows,
        obj,
        basis: (art0..art0 + m).collect(),
        barred: vec![false; width - 1],
        iterations: 0,
        max_iterations,
    };

    match tab.run() {
        Step::Optimal => {}
        Step::Limit => return LpOutcome::IterationLimit,
        Step::Overflow => return LpOutcome::NumericFailure,
        // Phase one is bounded below by zero.
        Step::Unbounded => return LpOutcome::NumericFailure,
    }

    let infeasibility = -tab.obj[width - 1];
    log::debug!(
        "simplex phase one finished after {} pivots, infeasibility {}",
        tab.iterations,
        infeasibility
    );
    if infeasibility > EPS {
        let mut residual = vec![Decimal::ZERO; m];
        for (i, &b) in tab.basis.iter().enumerate() {
            if b >= art0 {
                residual[b - art0] = tab.rhs(i);
            }
        }
        return LpOutcome::Infeasible(residual);
    }

    // Drive zero-level artificials out of the basis where possible.
    for i in 0..m {
        if tab.basis[i] < art0 {
            continue;
        }
        if let Some(col) = (0..art0).find(|&j| tab.rows[i][j].abs() > EPS) {
            if tab.pivot(i, col).is_none() {
                return LpOutcome::NumericFailure;
            }
        }
        // Otherwise the row is redundant; its artificial stays basic at zero.
    }

    for j in art0..width - 1 {
        tab.barred[j] = true;
    }

    // Phase two: real costs, reduced against the current basis.
    let mut cost = vec![Decimal::ZERO; width];
    cost[..n].copy_from_slice(&problem.cost);
    let mut obj = cost.clone();
    for (i, &b) in tab.basis.iter().enumerate() {
        let cb = cost[b];
        if cb.is_zero() {
            continue;
        }
        for (v, t) in obj.iter_mut().zip(&tab.rows[i]) {
            match sub_mul(*v, cb, *t) {
                Some(x) => *v = x,
                None => return LpOutcome::NumericFailure,
            }
        }
    }
    tab.obj = obj;

    match tab.run() {
        Step::Optimal => {}
        Step::Unbounded => return LpOutcome::Unbounded,
        Step::Limit => return LpOutcome::IterationLimit,
        Step::Overflow => return LpOutcome::NumericFailure,
    }
    log::debug!("simplex finished after {} pivots", tab.iterations);

    let mut x = vec![Decimal::ZERO; n];
    for (i, &b) in tab.basis.iter().enumerate() {
        if b < n {
            x[b] = tab.rhs(i).max(Decimal::ZERO);
        }
    }
    LpOutcome::Optimal(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn test_single_variable_equality() {
        let p = Problem {
            a: vec![vec![dec!(1)]],
            b: vec![dec!(1)],
            cost: vec![dec!(1)],
            at_least: false,
        };
        assert_eq!(solve(&p, 100), LpOutcome::Optimal(vec![dec!(1)]));
    }

    #[test]
    fn test_prefers_cheaper_total() {
        // Product 0 supplies 1 unit, product 1 supplies 2 units: half a unit of 1 is cheapest.
        let p = Problem {
            a: vec![vec![dec!(1), dec!(2)]],
            b: vec![dec!(1)],
            cost: vec![dec!(1), dec!(1)],
            at_least: false,
        };
        let LpOutcome::Optimal(x) = solve(&p, 100) else {
            panic!("expected optimal");
        };
        assert!(close(x[0], dec!(0)));
        assert!(close(x[1], dec!(0.5)));
    }

    #[test]
    fn test_two_constraints_mixed() {
        // 10a + 5b = 50, 5a + 15b = 30 -> a = 4.8, b = 0.4
        let p = Problem {
            a: vec![vec![dec!(10), dec!(5)], vec![dec!(5), dec!(15)]],
            b: vec![dec!(50), dec!(30)],
            cost: vec![dec!(1), dec!(1)],
            at_least: false,
        };
        let LpOutcome::Optimal(x) = solve(&p, 100) else {
            panic!("expected optimal");
        };
        assert!(close(x[0], dec!(4.8)));
        assert!(close(x[1], dec!(0.4)));
    }

    #[test]
    fn test_infeasible_reports_residual_row() {
        // Second row has no supplier at all.
        let p = Problem {
            a: vec![vec![dec!(1)], vec![dec!(0)]],
            b: vec![dec!(1), dec!(2)],
            cost: vec![dec!(1)],
            at_least: false,
        };
        let LpOutcome::Infeasible(residual) = solve(&p, 100) else {
            panic!("expected infeasible");
        };
        assert!(close(residual[0], dec!(0)));
        assert!(close(residual[1], dec!(2)));
    }

    #[test]
    fn test_exact_ratio_conflict_is_infeasible() {
        // One product in fixed 1:1 ratio cannot hit a 1:2 target exactly.
        let p = Problem {
            a: vec![vec![dec!(1)], vec![dec!(1)]],
            b: vec![dec!(1), dec!(2)],
            cost: vec![dec!(1)],
            at_least: false,
        };
        assert!(matches!(solve(&p, 100), LpOutcome::Infeasible(_)));
    }

    #[test]
    fn test_at_least_relaxes_ratio_conflict() {
        let p = Problem {
            a: vec![vec![dec!(1)], vec![dec!(1)]],
            b: vec![dec!(1), dec!(2)],
            cost: vec![dec!(1)],
            at_least: true,
        };
        let LpOutcome::Optimal(x) = solve(&p, 100) else {
            panic!("expected optimal");
        };
        assert!(close(x[0], dec!(2)));
    }

    #[test]
    fn test_redundant_rows_are_tolerated() {
        let p = Problem {
            a: vec![vec![dec!(1), dec!(1)], vec![dec!(2), dec!(2)]],
            b: vec![dec!(3), dec!(6)],
            cost: vec![dec!(1), dec!(1)],
            at_least: false,
        };
        let LpOutcome::Optimal(x) = solve(&p, 100) else {
            panic!("expected optimal");
        };
        assert!(close(x[0] + x[1], dec!(3)));
    }

    #[test]
    fn test_iteration_limit() {
        let p = Problem {
            a: vec![vec![dec!(10), dec!(5)], vec![dec!(5), dec!(15)]],
            b: vec![dec!(50), dec!(30)],
            cost: vec![dec!(1), dec!(1)],
            at_least: false,
        };
        assert_eq!(solve(&p, 0), LpOutcome::IterationLimit);
    }
}
