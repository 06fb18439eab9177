//! Headline metrics: small named scalars pulled out of a batch summary.
//!
//! Rules point into worker payloads with JSON pointers. Anything missing
//! (the worker, its success, the field, a numeric value) degrades to `0.0`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::{BatchSummary, Headline};
use crate::worker::Cadence;

/// How a pointed-at value becomes a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduce {
    /// Numeric value (numeric strings and booleans are accepted).
    #[default]
    Value,
    /// Number of items in an array or fields in an object.
    Count,
}

/// One headline extraction rule, as written under `[[headlines]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRule {
    pub cadence: Cadence,
    pub metric: String,
    pub worker: String,
    pub pointer: String,
    #[serde(default)]
    pub reduce: Reduce,
}

impl HeadlineRule {
    pub fn new(cadence: Cadence, metric: &str, worker: &str, pointer: &str, reduce: Reduce) -> Self {
        Self {
            cadence,
            metric: metric.to_string(),
            worker: worker.to_string(),
            pointer: pointer.to_string(),
            reduce,
        }
    }

    fn evaluate(&self, summary: &BatchSummary) -> f64 {
        summary
            .result_for(&self.worker)
            .filter(|r| r.success)
            .and_then(|r| r.payload.pointer(&self.pointer))
            .map(|v| reduce_value(v, self.reduce))
            .unwrap_or(0.0)
    }
}

fn reduce_value(value: &Value, reduce: Reduce) -> f64 {
    match reduce {
        Reduce::Count => match value {
            Value::Array(items) => items.len() as f64,
            Value::Object(fields) => fields.len() as f64,
            _ => 0.0,
        },
        Reduce::Value => match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
            Value::Bool(b) => f64::from(u8::from(*b)),
            _ => 0.0,
        },
    }
}

/// Rules used when the config file declares none.
pub fn default_rules() -> Vec<HeadlineRule> {
    use Cadence::{Daily, Monthly, Weekly};
    let value = Reduce::Value;
    let count = Reduce::Count;
    vec![
        HeadlineRule::new(Daily, "leads_generated", "sales_dev", "/leads_generated", value),
        HeadlineRule::new(Daily, "priority_alerts", "market_intel", "/alerts", count),
        HeadlineRule::new(Daily, "at_risk_customers", "customer_success", "/report/at_risk_customers", count),
        HeadlineRule::new(
            Daily,
            "expansion_opportunities",
            "customer_success",
            "/report/expansion_opportunities",
            count,
        ),
        HeadlineRule::new(Weekly, "current_arr", "financial", "/metrics/current_arr", value),
        HeadlineRule::new(Weekly, "current_mrr", "financial", "/metrics/current_mrr", value),
        HeadlineRule::new(Weekly, "customers", "financial", "/metrics/customers", value),
        HeadlineRule::new(Weekly, "variance_percent", "financial", "/metrics/variance_percent", value),
        HeadlineRule::new(Weekly, "burn_rate", "financial", "/metrics/burn_rate", value),
        HeadlineRule::new(Weekly, "runway_months", "financial", "/metrics/runway_months", value),
        HeadlineRule::new(
            Monthly,
            "strategic_recommendations",
            "strategic_recommendations",
            "/recommendations",
            count,
        ),
    ]
}

/// Derive the headlines for a batch: worker/failure counters first, then
/// every rule whose cadence matches, in rule order.
pub fn derive_headlines(summary: &BatchSummary, rules: &[HeadlineRule]) -> Vec<Headline> {
    let cadence = summary.cadence;
    let mut headlines = vec![
        Headline {
            name: format!("{}_workers", cadence),
            value: summary.results.len() as f64,
        },
        Headline {
            name: format!("{}_failures", cadence),
            value: summary.failed() as f64,
        },
    ];
    headlines.extend(rules.iter().filter(|r| r.cadence == cadence).map(|rule| Headline {
        name: rule.metric.clone(),
        value: rule.evaluate(summary),
    }));
    headlines
}
