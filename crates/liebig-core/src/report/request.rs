use super::SamplePolicy;
use crate::catalog::products::resolve_products;
use crate::catalog::schema::ProductDef;
use crate::catalog::NutrientCatalog;
use crate::error::LiebigError;
use crate::model::{AnalysisBatch, AnalysisRecord, NutrientLevel, Objective, Product, SampleKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Crop objective as supplied by the caller, keyed by nutrient name or symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveDef {
    pub crop: String,
    pub nutrients: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub target_value: Option<Decimal>,
    #[serde(default)]
    pub protein: Option<Decimal>,
    #[serde(default)]
    pub rest: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDef {
    pub id: String,
    /// Plot the sample belongs to; defaults to the request's plot.
    #[serde(default)]
    pub plot_id: Option<String>,
    pub date: String,
    #[serde(default)]
    pub kind: SampleKind,
    pub levels: BTreeMap<String, Decimal>,
}

/// Everything needed to build one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub plot_id: String,
    pub objective: ObjectiveDef,
    /// Records analysed together; at least one.
    pub batch: Vec<RecordDef>,
    /// Earlier records of the same plot, any order.
    #[serde(default)]
    pub history: Vec<RecordDef>,
    #[serde(default)]
    pub products: Vec<ProductDef>,
    #[serde(default)]
    pub cv_overrides: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub policy: SamplePolicy,
    #[serde(default)]
    pub allow_relaxed: bool,
}

/// A request with every nutrient key resolved against a catalog.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub objective: Objective,
    pub batch: AnalysisBatch,
    /// History plus the batch records, deduplicated by id.
    pub history: Vec<AnalysisRecord>,
    pub products: Vec<Product>,
    pub overrides: NutrientLevel,
    pub policy: SamplePolicy,
    pub allow_relaxed: bool,
    /// Dropped keys and skipped records.
    pub warnings: Vec<String>,
}

pub fn load_request(path: &Path) -> Result<ReportRequest, LiebigError> {
    let content = std::fs::read_to_string(path).map_err(|e| LiebigError::RequestLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| LiebigError::RequestLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn parse_request_str(json: &str) -> Result<ReportRequest, LiebigError> {
    Ok(serde_json::from_str(json)?)
}

/// Read a bare list of records, such as a plot's history export.
pub fn load_records(path: &Path) -> Result<Vec<RecordDef>, LiebigError> {
    let content = std::fs::read_to_string(path).map_err(|e| LiebigError::RequestLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| LiebigError::RequestLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Resolve standalone records, returning them with any warnings.
pub fn resolve_records(
    catalog: &NutrientCatalog,
    defs: &[RecordDef],
) -> (Vec<AnalysisRecord>, Vec<String>) {
    let mut warnings = Vec::new();
    let records = defs
        .iter()
        .map(|def| resolve_record(catalog, def, &mut warnings))
        .collect();
    (records, warnings)
}

impl ReportRequest {
    pub fn resolve(&self, catalog: &NutrientCatalog) -> Result<ResolvedRequest, LiebigError> {
        let mut warnings = Vec::new();

        if self.batch.is_empty() {
            return Err(LiebigError::EmptyBatch);
        }
        for def in &self.batch {
            if let Some(found) = def.plot_id.as_deref().filter(|p| *p != self.plot_id) {
                return Err(LiebigError::MixedPlots {
                    expected: self.plot_id.clone(),
                    found: found.to_string(),
                });
            }
        }

        let (ideal, unknown) = catalog.resolve_levels(&self.objective.nutrients);
        note_unknown(&mut warnings, "objective", &unknown);
        if ideal.is_empty() {
            return Err(LiebigError::EmptyObjective {
                crop: self.objective.crop.clone(),
            });
        }
        let objective = Objective {
            crop: self.objective.crop.clone(),
            ideal,
            target_value: self.objective.target_value,
            protein: self.objective.protein,
            rest: self.objective.rest,
        };

        let records: Vec<AnalysisRecord> = self
            .batch
            .iter()
            .map(|def| resolve_record(catalog, def, &mut warnings))
            .collect();

        let mut seen = HashSet::new();
        let mut history = Vec::new();
        for def in &self.history {
            if def.plot_id.as_deref().is_some_and(|p| p != self.plot_id) {
                let msg = format!(
                    "history record '{}' belongs to another plot and was skipped",
                    def.id
                );
                log::warn!("{msg}");
                warnings.push(msg);
                continue;
            }
            if seen.insert(def.id.clone()) {
                history.push(resolve_record(catalog, def, &mut warnings));
            }
        }
        for record in &records {
            if seen.insert(record.id.clone()) {
                history.push(record.clone());
            }
        }

        let products = resolve_products(&self.products, catalog)?;

        let (overrides, unknown) = catalog.resolve_levels(&self.cv_overrides);
        note_unknown(&mut warnings, "cv_overrides", &unknown);

        Ok(ResolvedRequest {
            objective,
            batch: AnalysisBatch {
                plot_id: self.plot_id.clone(),
                records,
            },
            history,
            products,
            overrides,
            policy: self.policy,
            allow_relaxed: self.allow_relaxed,
            warnings,
        })
    }
}

fn resolve_record(
    catalog: &NutrientCatalog,
    def: &RecordDef,
    warnings: &mut Vec<String>,
) -> AnalysisRecord {
    let (levels, unknown) = catalog.resolve_levels(&def.levels);
    note_unknown(warnings, &format!("record '{}'", def.id), &unknown);
    AnalysisRecord {
        id: def.id.clone(),
        date: def.date.clone(),
        kind: def.kind,
        levels,
    }
}

fn note_unknown(warnings: &mut Vec<String>, context: &str, unknown: &[String]) {
    if unknown.is_empty() {
        return;
    }
    let msg = format!("{context}: ignored unknown nutrient(s) {}", unknown.join(", "));
    log::warn!("{msg}");
    warnings.push(msg);
}
