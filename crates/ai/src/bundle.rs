use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sales prediction for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionItem {
    /// Product name as shown in the shop data.
    pub product: String,
    /// Expected units sold over `period`.
    pub predicted_units: f64,
    /// Human-readable horizon, e.g. "next 7 days".
    pub period: String,
    /// Model confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Restocking suggestion for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RestockSuggestion {
    pub product: String,
    pub current_stock: i64,
    /// Units to order; always > 0.
    pub suggested_quantity: u32,
    pub urgency: Urgency,
    pub reason: String,
}

/// Parsed output of one model invocation, scoped to one shop.
///
/// Cached wholesale and never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightBundle {
    pub predictions: Vec<PredictionItem>,
    pub restocking: Vec<RestockSuggestion>,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}
