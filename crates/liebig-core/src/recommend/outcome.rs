use crate::model::Unit;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    /// At least one product must be applied.
    Application,
    /// Every demanded nutrient is already at or above its ideal.
    NoApplication,
    /// The deficit cannot be closed with the available products.
    Infeasible,
}

/// The nutrient that bounds growth under the minimum law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitingFinding {
    /// Display name (e.g., "Nitrógeno").
    pub nutrient: String,
    pub symbol: String,
    /// Sufficiency percentage, rounded to two decimals.
    pub sufficiency_pct: Decimal,
    /// Corrective delta scaled by the variability coefficient.
    pub adjustment: Decimal,
    /// Sufficiency after the corrective delta.
    pub corrected_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseLine {
    pub product: String,
    pub quantity: Decimal,
    /// "Apply Q units of P".
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub nutrient: String,
    pub symbol: String,
    pub amount: Decimal,
    /// kg/ha for macronutrients, g/ha for micronutrients.
    pub unit: Unit,
    /// "Name: Q unit".
    pub text: String,
}

/// Delivered amount measured against one deficit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageLine {
    pub nutrient: String,
    pub symbol: String,
    pub deficit: Decimal,
    pub delivered: Decimal,
    /// Percent of the deficit delivered; over 100 is over-supply.
    pub percent: Decimal,
    /// "Name: P% of deficit covered".
    pub text: String,
}

/// A deficit left open by an infeasible blend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetLine {
    pub nutrient: String,
    pub symbol: String,
    pub deficit: Decimal,
}

/// Final, immutable recommendation for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub status: RecommendationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limiting: Option<LimitingFinding>,
    pub doses: Vec<DoseLine>,
    pub delivered: Vec<DeliveryLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coverage: Vec<CoverageLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmet: Vec<UnmetLine>,
    /// True when the blend was solved with at-least constraints.
    #[serde(default)]
    pub relaxed: bool,
    /// Human-readable lines, in display order.
    pub narrative: Vec<String>,
}

impl Recommendation {
    /// Narrative joined into a single block of text.
    pub fn narrative_text(&self) -> String {
        self.narrative.join("\n")
    }

    pub fn requires_application(&self) -> bool {
        self.status == RecommendationStatus::Application
    }
}
