//! Report aggregation for one analysis batch of a plot.
//!
//! Resolves the request, picks the representative snapshot, estimates
//! coefficients, runs the minimum-law sweep and the blend optimizer, and
//! bundles everything with a decision trace into a [`Report`].

pub mod request;
pub mod store;

use crate::catalog::NutrientCatalog;
use crate::error::LiebigError;
use crate::liebig::{sweep, SufficiencyRow};
use crate::model::{AnalysisBatch, NutrientLevel, Unit};
use crate::optimize::{optimize_with, InfeasibleReason, OptimizerOptions};
use crate::recommend::{assemble, Recommendation};
use crate::trace::{self, TraceBundle, TraceStepType};
use crate::variability::{coefficients, CoefficientSource, VariabilityCoefficients};
use request::{ReportRequest, ResolvedRequest};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use store::ReportStore;

/// How a multi-record batch is reduced to one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePolicy {
    /// First record as listed.
    #[default]
    First,
    /// Latest sample date; ties go to the earlier listed record.
    MostRecent,
    /// Per-nutrient mean over the records that report it.
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Deficient,
    Optimal,
    Excess,
}

/// Current vs ideal for one demanded nutrient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub nutrient: String,
    pub symbol: String,
    pub unit: Unit,
    pub current: Decimal,
    pub ideal: Decimal,
    pub status: LevelStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRow {
    pub nutrient: String,
    pub symbol: String,
    /// Sufficiency percentage, rounded for display.
    pub sufficiency: Decimal,
    pub adjustment: Decimal,
    pub corrected: Decimal,
    pub limiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub nutrient: String,
    pub symbol: String,
    pub value: Decimal,
    pub source: CoefficientSource,
}

/// Persisted result of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub plot_id: String,
    pub crop: String,
    pub catalog_version: String,
    /// Ids of every record in the batch.
    pub record_ids: Vec<String>,
    /// Id of the snapshot analysed (or the joined ids when averaged).
    pub representative: String,
    pub policy: SamplePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<Decimal>,
    pub comparison: Vec<ComparisonRow>,
    pub sweep: Vec<SweepRow>,
    pub coefficients: Vec<CoefficientRow>,
    pub recommendation: Recommendation,
    pub trace: TraceBundle,
    pub applied: bool,
}

impl Report {
    /// Record that the recommendation has been applied in the field.
    pub fn mark_applied(&mut self) {
        self.applied = true;
    }

    /// Base storage key: plot and representative id, restricted to
    /// `[A-Za-z0-9_-]`. Stores add a suffix when the base is already taken.
    pub fn key(&self) -> String {
        format!("{}_{}", self.plot_id, self.representative)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// Reduce a batch to the snapshot that gets analysed, plus its label.
pub fn select_sample(
    batch: &AnalysisBatch,
    policy: SamplePolicy,
) -> Result<(NutrientLevel, String), LiebigError> {
    let first = batch.records.first().ok_or(LiebigError::EmptyBatch)?;

    match policy {
        SamplePolicy::First => Ok((first.levels.clone(), first.id.clone())),
        SamplePolicy::MostRecent => {
            let mut latest = first;
            for record in &batch.records[1..] {
                if record.date > latest.date {
                    latest = record;
                }
            }
            Ok((latest.levels.clone(), latest.id.clone()))
        }
        SamplePolicy::Average => {
            let mut sums: BTreeMap<_, (Decimal, u32)> = BTreeMap::new();
            for record in &batch.records {
                for (id, value) in record.levels.iter() {
                    let entry = sums.entry(id).or_insert((Decimal::ZERO, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }
            }
            let mean: NutrientLevel = sums
                .into_iter()
                .map(|(id, (sum, n))| {
                    let avg = (sum / Decimal::from(n))
                        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
                    (id, avg)
                })
                .collect();
            let label = batch
                .records
                .iter()
                .map(|r| r.id.as_str())
                .collect::<Vec<_>>()
                .join("+");
            Ok((mean, label))
        }
    }
}

/// Build a report from a request, resolving nutrient keys against `catalog`.
pub fn generate_report(
    request: &ReportRequest,
    catalog: &NutrientCatalog,
) -> Result<Report, LiebigError> {
    let resolved = request.resolve(catalog)?;
    analyze(catalog, &resolved)
}

/// Build a report and persist it, returning the storage key with the report.
pub fn generate_and_store(
    request: &ReportRequest,
    catalog: &NutrientCatalog,
    store: &dyn ReportStore,
) -> Result<(String, Report), LiebigError> {
    let report = generate_report(request, catalog)?;
    let key = store.save(&report)?;
    Ok((key, report))
}

/// Run the full pipeline on an already resolved request.
pub fn analyze(catalog: &NutrientCatalog, input: &ResolvedRequest) -> Result<Report, LiebigError> {
    let mut bundle = TraceBundle::default();
    for warning in &input.warnings {
        bundle.warn(warning.clone());
    }

    let (current, representative) = select_sample(&input.batch, input.policy)?;
    bundle.push(trace::build_sample_selection_step(format!(
        "Analysing '{}' from {} record(s) using {:?} policy",
        representative,
        input.batch.records.len(),
        input.policy
    )));

    let ideal = &input.objective.ideal;
    let cvs = coefficients(catalog, &input.history, &input.overrides);
    bundle.extend(trace::build_coefficient_steps(catalog, &cvs, ideal.ids()));

    let rows = sweep(catalog, &current, ideal, &cvs);
    bundle.extend(trace::build_sweep_steps(catalog, &rows));

    let mut solved = optimize_with(&current, ideal, &input.products, &OptimizerOptions::default());
    bundle.push(trace::build_optimization_step(
        catalog,
        TraceStepType::Optimization,
        &solved,
    ));

    let retry = input.allow_relaxed
        && matches!(&solved, Err(e) if e.reason == InfeasibleReason::NoCombination);
    if retry {
        log::info!("exact blend infeasible; retrying with at-least constraints");
        solved = optimize_with(&current, ideal, &input.products, &OptimizerOptions::relaxed());
        bundle.push(trace::build_optimization_step(
            catalog,
            TraceStepType::RelaxedRetry,
            &solved,
        ));
    }

    let recommendation = assemble(catalog, &rows, &solved);
    log::info!(
        "plot {}: {:?}, {} dose(s)",
        input.batch.plot_id,
        recommendation.status,
        recommendation.doses.len()
    );

    Ok(Report {
        plot_id: input.batch.plot_id.clone(),
        crop: input.objective.crop.clone(),
        catalog_version: catalog.version().to_string(),
        record_ids: input.batch.records.iter().map(|r| r.id.clone()).collect(),
        representative,
        policy: input.policy,
        target_value: input.objective.target_value,
        protein: input.objective.protein,
        rest: input.objective.rest,
        comparison: comparison_rows(catalog, &current, ideal),
        sweep: sweep_rows(catalog, &rows),
        coefficients: coefficient_rows(catalog, &cvs, ideal),
        recommendation,
        trace: bundle,
        applied: false,
    })
}

fn comparison_rows(
    catalog: &NutrientCatalog,
    current: &NutrientLevel,
    ideal: &NutrientLevel,
) -> Vec<ComparisonRow> {
    ideal
        .iter()
        .filter_map(|(id, target)| {
            let nutrient = catalog.get(id)?;
            let value = current.get(id);
            let status = match value.cmp(&target) {
                std::cmp::Ordering::Less => LevelStatus::Deficient,
                std::cmp::Ordering::Equal => LevelStatus::Optimal,
                std::cmp::Ordering::Greater => LevelStatus::Excess,
            };
            Some(ComparisonRow {
                nutrient: nutrient.name.clone(),
                symbol: nutrient.symbol.clone(),
                unit: nutrient.unit,
                current: value,
                ideal: target,
                status,
            })
        })
        .collect()
}

fn sweep_rows(catalog: &NutrientCatalog, rows: &[SufficiencyRow]) -> Vec<SweepRow> {
    rows.iter()
        .filter_map(|row| {
            let nutrient = catalog.get(row.nutrient)?;
            Some(SweepRow {
                nutrient: nutrient.name.clone(),
                symbol: nutrient.symbol.clone(),
                sufficiency: row
                    .sufficiency
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
                adjustment: row.adjustment,
                corrected: row.corrected,
                limiting: row.limiting,
            })
        })
        .collect()
}

fn coefficient_rows(
    catalog: &NutrientCatalog,
    cvs: &VariabilityCoefficients,
    ideal: &NutrientLevel,
) -> Vec<CoefficientRow> {
    ideal
        .ids()
        .filter_map(|id| {
            let nutrient = catalog.get(id)?;
            let estimate = cvs.estimate(id)?;
            Some(CoefficientRow {
                nutrient: nutrient.name.clone(),
                symbol: nutrient.symbol.clone(),
                value: estimate.value,
                source: estimate.source,
            })
        })
        .collect()
}
