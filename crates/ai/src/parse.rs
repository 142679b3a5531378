//! Model response parsing.
//!
//! The provider contract is best-effort text, so the response is treated as
//! untrusted: fences and chatter around the JSON object are tolerated, but
//! the object itself must carry all three sections. A partial response (for
//! example predictions without restocking) is a parse failure as a whole.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::bundle::{InsightBundle, PredictionItem, RestockSuggestion};
use crate::error::InsightError;

/// Shape the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ModelInsights {
    pub predictions: Vec<PredictionItem>,
    pub summary: String,
    pub restocking: Vec<RestockSuggestion>,
}

impl ModelInsights {
    pub fn into_bundle(self, generated_at: DateTime<Utc>) -> InsightBundle {
        InsightBundle {
            predictions: self.predictions,
            restocking: self.restocking,
            summary: self.summary.trim().to_string(),
            generated_at,
        }
    }

    fn validate(&self) -> Result<(), InsightError> {
        if self.summary.trim().is_empty() {
            return Err(InsightError::parse("summary is empty"));
        }

        for p in &self.predictions {
            if p.product.trim().is_empty() {
                return Err(InsightError::parse("prediction without a product"));
            }
            if !(p.predicted_units.is_finite() && p.predicted_units >= 0.0) {
                return Err(InsightError::parse(format!(
                    "predicted_units for '{}' must be a non-negative number",
                    p.product
                )));
            }
            if let Some(c) = p.confidence {
                if !(0.0..=1.0).contains(&c) {
                    return Err(InsightError::parse(format!(
                        "confidence for '{}' must be in [0,1]",
                        p.product
                    )));
                }
            }
        }

        for r in &self.restocking {
            if r.product.trim().is_empty() {
                return Err(InsightError::parse("restocking suggestion without a product"));
            }
            if r.suggested_quantity == 0 {
                return Err(InsightError::parse(format!(
                    "suggested_quantity for '{}' must be > 0",
                    r.product
                )));
            }
        }

        Ok(())
    }
}

/// Parse and validate raw model text.
pub fn parse_insights(raw: &str) -> Result<ModelInsights, InsightError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| InsightError::parse("no JSON object in model response"))?;

    let parsed: ModelInsights =
        serde_json::from_str(json).map_err(|e| InsightError::parse(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

/// Outermost `{ ... }` span, ignoring code fences and surrounding prose.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Urgency;

    const GOOD: &str = r#"{
        "predictions": [
            {"product": "coffee", "predicted_units": 14, "period": "next 7 days", "confidence": 0.7}
        ],
        "summary": "Coffee drives most revenue.",
        "restocking": [
            {"product": "coffee", "current_stock": 12, "suggested_quantity": 24, "urgency": "high", "reason": "below a week of cover"}
        ]
    }"#;

    #[test]
    fn parses_well_formed_response() {
        let parsed = parse_insights(GOOD).unwrap();
        assert_eq!(parsed.predictions.len(), 1);
        assert_eq!(parsed.predictions[0].predicted_units, 14.0);
        assert_eq!(parsed.restocking[0].urgency, Urgency::High);
        assert_eq!(parsed.summary, "Coffee drives most revenue.");
    }

    #[test]
    fn tolerates_fences_and_prose() {
        let raw = format!("Here you go:\n```json\n{GOOD}\n```\nHope this helps!");
        assert!(parse_insights(&raw).is_ok());
    }

    #[test]
    fn missing_restocking_is_a_parse_failure() {
        let raw = r#"{"predictions": [], "summary": "ok"}"#;
        match parse_insights(raw) {
            Err(InsightError::ParseFailure(msg)) => assert!(msg.contains("restocking")),
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_a_parse_failure() {
        assert!(matches!(
            parse_insights("Sales look fine, restock coffee."),
            Err(InsightError::ParseFailure(_))
        ));
    }

    #[test]
    fn blank_summary_is_rejected() {
        let raw = r#"{"predictions": [], "summary": "  ", "restocking": []}"#;
        assert_eq!(
            parse_insights(raw),
            Err(InsightError::ParseFailure("summary is empty".to_string()))
        );
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let raw = GOOD.replace("0.7", "1.7");
        assert!(matches!(parse_insights(&raw), Err(InsightError::ParseFailure(_))));
    }

    #[test]
    fn zero_restock_quantity_is_rejected() {
        let raw = GOOD.replace("\"suggested_quantity\": 24", "\"suggested_quantity\": 0");
        assert!(matches!(parse_insights(&raw), Err(InsightError::ParseFailure(_))));
    }

    #[test]
    fn unknown_urgency_is_rejected() {
        let raw = GOOD.replace("\"high\"", "\"urgent\"");
        assert!(matches!(parse_insights(&raw), Err(InsightError::ParseFailure(_))));
    }

    #[test]
    fn bundle_trims_summary_and_stamps_time() {
        let at = Utc::now();
        let raw = GOOD.replace("Coffee drives most revenue.", "  Coffee drives most revenue.  ");
        let bundle = parse_insights(&raw).unwrap().into_bundle(at);
        assert_eq!(bundle.summary, "Coffee drives most revenue.");
        assert_eq!(bundle.generated_at, at);
    }
}
