use crate::catalog::NutrientCatalog;
use crate::liebig::SufficiencyRow;
use crate::optimize::{Blend, ConstraintMode, Infeasible};
use crate::recommend::outcome::{
    CoverageLine, DeliveryLine, DoseLine, LimitingFinding, Recommendation, RecommendationStatus, UnmetLine,
};
use rust_decimal::{Decimal, RoundingStrategy};

pub const NO_APPLICATION: &str = "No application required";

/// Build the recommendation from a minimum-law sweep and the optimizer result.
pub fn assemble(
    catalog: &NutrientCatalog,
    sweep: &[SufficiencyRow],
    solved: &Result<Blend, Infeasible>,
) -> Recommendation {
    let limiting = sweep
        .iter()
        .find(|row| row.limiting)
        .map(|row| limiting_finding(catalog, row));

    let mut narrative = Vec::new();
    if let Some(finding) = &limiting {
        narrative.push(format!(
            "Limiting nutrient: {} ({}) at {:.2}% of ideal",
            finding.nutrient, finding.symbol, finding.sufficiency_pct
        ));
    }

    match solved {
        Ok(blend) => assemble_blend(catalog, blend, limiting, narrative),
        Err(infeasible) => assemble_infeasible(catalog, infeasible, limiting, narrative),
    }
}

fn limiting_finding(catalog: &NutrientCatalog, row: &SufficiencyRow) -> LimitingFinding {
    let (name, symbol) = names(catalog, row.nutrient);
    LimitingFinding {
        nutrient: name,
        symbol,
        sufficiency_pct: row
            .sufficiency
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        adjustment: row.adjustment,
        corrected_pct: row.corrected,
    }
}

fn assemble_blend(
    catalog: &NutrientCatalog,
    blend: &Blend,
    limiting: Option<LimitingFinding>,
    mut narrative: Vec<String>,
) -> Recommendation {
    let relaxed = blend.mode == ConstraintMode::AtLeast;

    if blend.is_empty() {
        narrative.push(NO_APPLICATION.to_string());
        return Recommendation {
            status: RecommendationStatus::NoApplication,
            limiting,
            doses: Vec::new(),
            delivered: Vec::new(),
            coverage: Vec::new(),
            unmet: Vec::new(),
            relaxed,
            narrative,
        };
    }

    let doses: Vec<DoseLine> = blend
        .doses
        .iter()
        .map(|dose| DoseLine {
            product: dose.product.clone(),
            quantity: dose.quantity,
            text: format!("Apply {:.2} units of {}", dose.quantity, dose.product),
        })
        .collect();

    let delivered: Vec<DeliveryLine> = blend
        .delivered
        .iter()
        .filter(|(_, amount)| !amount.is_zero())
        .filter_map(|(id, amount)| {
            let nutrient = catalog.get(id)?;
            let unit = nutrient.category.application_unit();
            Some(DeliveryLine {
                nutrient: nutrient.name.clone(),
                symbol: nutrient.symbol.clone(),
                amount,
                unit,
                text: format!("{}: {:.2} {}", nutrient.name, amount, unit),
            })
        })
        .collect();

    let coverage: Vec<CoverageLine> = blend
        .coverage()
        .into_iter()
        .map(|c| {
            let (nutrient, symbol) = names(catalog, c.nutrient);
            let text = format!("{}: {:.2}% of deficit covered", nutrient, c.percent);
            CoverageLine {
                nutrient,
                symbol,
                deficit: c.deficit,
                delivered: c.delivered,
                percent: c.percent,
                text,
            }
        })
        .collect();

    if relaxed {
        narrative.push("Exact blend not possible; some nutrients are over-supplied".to_string());
    }
    narrative.extend(doses.iter().map(|d| d.text.clone()));
    if !delivered.is_empty() {
        narrative.push("Delivers:".to_string());
        narrative.extend(delivered.iter().map(|d| format!("  {}", d.text)));
    }
    if !coverage.is_empty() {
        narrative.push("Coverage:".to_string());
        narrative.extend(coverage.iter().map(|c| format!("  {}", c.text)));
    }

    Recommendation {
        status: RecommendationStatus::Application,
        limiting,
        doses,
        delivered,
        coverage,
        unmet: Vec::new(),
        relaxed,
        narrative,
    }
}

fn assemble_infeasible(
    catalog: &NutrientCatalog,
    infeasible: &Infeasible,
    limiting: Option<LimitingFinding>,
    mut narrative: Vec<String>,
) -> Recommendation {
    let unmet: Vec<UnmetLine> = infeasible
        .unmet
        .iter()
        .map(|d| {
            let (nutrient, symbol) = names(catalog, d.nutrient);
            UnmetLine {
                nutrient,
                symbol,
                deficit: d.amount,
            }
        })
        .collect();

    let listed: Vec<&str> = unmet.iter().map(|u| u.nutrient.as_str()).collect();
    narrative.push(format!(
        "Cannot fully correct {} with available products",
        listed.join(", ")
    ));

    Recommendation {
        status: RecommendationStatus::Infeasible,
        limiting,
        doses: Vec::new(),
        delivered: Vec::new(),
        coverage: Vec::new(),
        unmet,
        relaxed: infeasible.mode == ConstraintMode::AtLeast,
        narrative,
    }
}

fn names(catalog: &NutrientCatalog, id: crate::model::NutrientId) -> (String, String) {
    match catalog.get(id) {
        Some(n) => (n.name.clone(), n.symbol.clone()),
        None => ("unknown".to_string(), String::new()),
    }
}

/// Total delivered for one nutrient symbol, zero if not delivered.
pub fn delivered_amount(recommendation: &Recommendation, symbol: &str) -> Decimal {
    recommendation
        .delivered
        .iter()
        .find(|d| d.symbol == symbol)
        .map(|d| d.amount)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::liebig::sweep;
    use crate::model::{NutrientLevel, Product};
    use crate::optimize::{optimize, optimize_with, OptimizerOptions};
    use crate::variability::VariabilityCoefficients;
    use rust_decimal_macros::dec;

    fn make_level(pairs: &[(&str, Decimal)]) -> NutrientLevel {
        let catalog = builtin_catalog();
        pairs
            .iter()
            .map(|(sym, v)| (catalog.id_of(sym).unwrap(), *v))
            .collect()
    }

    fn make_product(name: &str, pairs: &[(&str, Decimal)]) -> Product {
        Product {
            name: name.into(),
            description: None,
            contributions: make_level(pairs),
        }
    }

    fn run(current: &NutrientLevel, ideal: &NutrientLevel, products: &[Product]) -> Recommendation {
        let catalog = builtin_catalog();
        let rows = sweep(catalog, current, ideal, &VariabilityCoefficients::default());
        assemble(catalog, &rows, &optimize(current, ideal, products))
    }

    #[test]
    fn test_application_narrative() {
        let current = make_level(&[("N", dec!(2.0)), ("P", dec!(1.5)), ("K", dec!(2.0))]);
        let ideal = make_level(&[("N", dec!(3.0)), ("P", dec!(1.5)), ("K", dec!(2.0))]);
        let rec = run(&current, &ideal, &[make_product("UreaX", &[("N", dec!(1.0))])]);

        assert_eq!(rec.status, RecommendationStatus::Application);
        let limiting = rec.limiting.as_ref().unwrap();
        assert_eq!(limiting.symbol, "N");
        assert_eq!(limiting.sufficiency_pct, dec!(66.67));
        assert_eq!(rec.doses.len(), 1);
        assert_eq!(rec.doses[0].text, "Apply 1.00 units of UreaX");
        assert_eq!(rec.delivered[0].text, "Nitrógeno: 1.00 kg/ha");
        assert_eq!(delivered_amount(&rec, "N"), dec!(1.0));
        assert!(rec.narrative_text().contains("Apply 1.00 units of UreaX"));
        assert_eq!(rec.coverage[0].text, "Nitrógeno: 100.00% of deficit covered");
    }

    #[test]
    fn test_micronutrient_delivery_in_grams() {
        let current = make_level(&[("Zn", dec!(10))]);
        let ideal = make_level(&[("Zn", dec!(30))]);
        let rec = run(&current, &ideal, &[make_product("Zinc sulfate", &[("Zn", dec!(20))])]);
        assert_eq!(rec.delivered[0].text, "Zinc: 20.00 g/ha");
    }

    #[test]
    fn test_no_application() {
        let current = make_level(&[("N", dec!(3)), ("P", dec!(2))]);
        let ideal = make_level(&[("N", dec!(3)), ("P", dec!(1))]);
        let rec = run(&current, &ideal, &[make_product("UreaX", &[("N", dec!(1))])]);
        assert_eq!(rec.status, RecommendationStatus::NoApplication);
        assert!(rec.doses.is_empty());
        assert!(rec.narrative.iter().any(|l| l == NO_APPLICATION));
    }

    #[test]
    fn test_infeasible_names_nutrient() {
        let current = make_level(&[("N", dec!(2)), ("Zn", dec!(5))]);
        let ideal = make_level(&[("N", dec!(3)), ("Zn", dec!(20))]);
        let rec = run(&current, &ideal, &[make_product("UreaX", &[("N", dec!(1))])]);
        assert_eq!(rec.status, RecommendationStatus::Infeasible);
        assert!(rec.doses.is_empty());
        assert_eq!(rec.unmet.len(), 1);
        assert_eq!(rec.unmet[0].symbol, "Zn");
        assert!(rec
            .narrative
            .contains(&"Cannot fully correct Zinc with available products".to_string()));
    }

    #[test]
    fn test_relaxed_blend_is_flagged() {
        let current = make_level(&[("N", dec!(0)), ("P", dec!(0))]);
        let ideal = make_level(&[("N", dec!(1)), ("P", dec!(2))]);
        let products = [make_product("NP", &[("N", dec!(1)), ("P", dec!(1))])];
        let rows = sweep(builtin_catalog(), &current, &ideal, &VariabilityCoefficients::default());
        let solved = optimize_with(&current, &ideal, &products, &OptimizerOptions::relaxed());
        let rec = assemble(builtin_catalog(), &rows, &solved);
        assert!(rec.relaxed);
        assert_eq!(rec.status, RecommendationStatus::Application);
        assert_eq!(rec.coverage.len(), 2);
        assert_eq!(rec.coverage[0].symbol, "N");
        assert_eq!(rec.coverage[0].percent, dec!(200));
        assert!(rec
            .narrative
            .iter()
            .any(|l| l.ends_with("200.00% of deficit covered")));
    }
}
