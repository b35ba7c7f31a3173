use crate::catalog::NutrientCatalog;
use crate::liebig::SufficiencyRow;
use crate::model::NutrientId;
use crate::optimize::{Blend, Infeasible, InfeasibleReason};
use crate::variability::{CoefficientSource, VariabilityCoefficients};
use serde::{Deserialize, Serialize};

pub const TRACE_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceSeverity {
    Critical,
    Important,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStepType {
    SampleSelection,
    CoefficientEstimate,
    Sufficiency,
    LimitingDecision,
    Optimization,
    RelaxedRetry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub step_type: TraceStepType,
    /// Symbol of the nutrient the step concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrient: Option<String>,
    pub message: String,
    pub severity: TraceSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceWarning {
    pub message: String,
    pub severity: TraceSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceBundle {
    pub trace_schema_version: String,
    pub steps: Vec<TraceStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TraceWarning>,
}

impl Default for TraceBundle {
    fn default() -> Self {
        Self {
            trace_schema_version: TRACE_SCHEMA_VERSION.to_string(),
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl TraceBundle {
    pub fn push(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    pub fn extend(&mut self, steps: impl IntoIterator<Item = TraceStep>) {
        self.steps.extend(steps);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(TraceWarning {
            message: message.into(),
            severity: TraceSeverity::Important,
        });
    }

    pub fn steps_of(&self, step_type: TraceStepType) -> impl Iterator<Item = &TraceStep> + '_ {
        self.steps.iter().filter(move |s| s.step_type == step_type)
    }
}

fn symbol(catalog: &NutrientCatalog, id: NutrientId) -> Option<String> {
    catalog.get(id).map(|n| n.symbol.clone())
}

pub fn build_sample_selection_step(message: String) -> TraceStep {
    TraceStep {
        step_type: TraceStepType::SampleSelection,
        nutrient: None,
        message,
        severity: TraceSeverity::Info,
    }
}

/// One step per nutrient in `demanded`, explaining where its coefficient came from.
pub fn build_coefficient_steps(
    catalog: &NutrientCatalog,
    coefficients: &VariabilityCoefficients,
    demanded: impl IntoIterator<Item = NutrientId>,
) -> Vec<TraceStep> {
    demanded
        .into_iter()
        .filter_map(|id| {
            let estimate = coefficients.estimate(id)?;
            let name = catalog.name(id);
            let (message, severity) = match estimate.source {
                CoefficientSource::History { samples } => (
                    format!("CV for {name} = {} from {samples} historical readings", estimate.value),
                    TraceSeverity::Info,
                ),
                CoefficientSource::Literature { samples } => (
                    format!(
                        "CV for {name} = {} (literature default, only {samples} readings)",
                        estimate.value
                    ),
                    TraceSeverity::Info,
                ),
                CoefficientSource::Fallback => (
                    format!(
                        "CV for {name} fell back to {} (zero mean or arithmetic failure)",
                        estimate.value
                    ),
                    TraceSeverity::Important,
                ),
                CoefficientSource::Override => (
                    format!("CV for {name} = {} (agronomist override)", estimate.value),
                    TraceSeverity::Info,
                ),
            };
            Some(TraceStep {
                step_type: TraceStepType::CoefficientEstimate,
                nutrient: symbol(catalog, id),
                message,
                severity,
            })
        })
        .collect()
}

/// Sufficiency steps for every row plus the limiting decision.
pub fn build_sweep_steps(catalog: &NutrientCatalog, sweep: &[SufficiencyRow]) -> Vec<TraceStep> {
    let mut steps: Vec<TraceStep> = sweep
        .iter()
        .map(|row| TraceStep {
            step_type: TraceStepType::Sufficiency,
            nutrient: symbol(catalog, row.nutrient),
            message: format!(
                "{}: {} of {} -> {:.2}%",
                catalog.name(row.nutrient),
                row.current,
                row.demand,
                row.sufficiency
            ),
            severity: TraceSeverity::Info,
        })
        .collect();

    match sweep.iter().find(|row| row.limiting) {
        Some(row) => steps.push(TraceStep {
            step_type: TraceStepType::LimitingDecision,
            nutrient: symbol(catalog, row.nutrient),
            message: format!(
                "{} is limiting at {:.2}%; corrected to {}% (delta {})",
                catalog.name(row.nutrient),
                row.sufficiency,
                row.corrected,
                row.adjustment
            ),
            severity: TraceSeverity::Important,
        }),
        None => steps.push(TraceStep {
            step_type: TraceStepType::LimitingDecision,
            nutrient: None,
            message: "No nutrient demanded; nothing is limiting".to_string(),
            severity: TraceSeverity::Info,
        }),
    }
    steps
}

pub fn build_optimization_step(
    catalog: &NutrientCatalog,
    step_type: TraceStepType,
    solved: &Result<Blend, Infeasible>,
) -> TraceStep {
    match solved {
        Ok(blend) if blend.is_empty() => TraceStep {
            step_type,
            nutrient: None,
            message: format!(
                "No product needed ({} deficient nutrient(s))",
                blend.deficits.len()
            ),
            severity: TraceSeverity::Info,
        },
        Ok(blend) => TraceStep {
            step_type,
            nutrient: None,
            message: format!(
                "Blend of {} product(s), total {} units, closes {} deficit(s) ({:?})",
                blend.doses.len(),
                blend.total_quantity(),
                blend.deficits.len(),
                blend.mode
            ),
            severity: TraceSeverity::Info,
        },
        Err(infeasible) => {
            let names: Vec<&str> = infeasible.nutrients().map(|id| catalog.name(id)).collect();
            let why = match infeasible.reason {
                InfeasibleReason::Uncovered => "no product supplies",
                InfeasibleReason::NoCombination => "no non-negative combination reaches",
                InfeasibleReason::SolverLimit => "solver gave up on",
            };
            TraceStep {
                step_type,
                nutrient: None,
                message: format!("Infeasible ({:?}): {why} {}", infeasible.mode, names.join(", ")),
                severity: TraceSeverity::Critical,
            }
        }
    }
}
