//! Monthly workers: a review of the tracked metrics, then recommendations drawn from it.

use serde_json::{Value, json};

use super::BuiltinWorker;
use crate::errors::WorkerError;
use crate::worker::{Cadence, Task, WorkerContext};

pub(super) fn workers() -> Vec<BuiltinWorker> {
    vec![
        BuiltinWorker::new("performance_review", Cadence::Monthly, "monthly_review", performance_review),
        BuiltinWorker::new(
            "strategic_recommendations",
            Cadence::Monthly,
            "strategic_recommendations",
            strategic_recommendations,
        ),
    ]
}

/// `(metric, threshold)`. A metric is healthy at or above its threshold,
/// except zero thresholds, which count bad events and must stay at zero.
const WATCHED: [(&str, f64); 5] = [
    ("healthy_services", 5.0),
    ("tests_failed", 0.0),
    ("at_risk_customers", 0.0),
    ("runway_months", 18.0),
    ("leads_generated_today", 40.0),
];

fn performance_review(ctx: &WorkerContext, _task: &Task) -> Result<Value, WorkerError> {
    let latest = ctx.latest_metrics()?;

    let mut highlights = Vec::new();
    let mut concerns = Vec::new();
    for (metric, threshold) in WATCHED {
        let Some(&value) = latest.get(metric) else {
            continue;
        };
        let healthy = if threshold == 0.0 { value <= 0.0 } else { value >= threshold };
        let line = format!("{}: {}", metric, value);
        if healthy {
            highlights.push(line);
        } else {
            concerns.push(line);
        }
    }

    let review = json!({
        "month": ctx.batch_time().format("%B %Y").to_string(),
        "metrics_tracked": latest.len(),
        "highlights": highlights,
        "concerns": concerns,
    });
    ctx.save(&format!("performance_review_{}", ctx.month_stamp()), &review)?;
    ctx.metric("monthly_concerns", concerns.len() as f64)?;

    Ok(review)
}

fn strategic_recommendations(ctx: &WorkerContext, _task: &Task) -> Result<Value, WorkerError> {
    let review = ctx.load_from("performance_review", &format!("performance_review_{}", ctx.month_stamp()))?;
    let concerns: Vec<String> = review
        .as_ref()
        .and_then(|r| r["concerns"].as_array())
        .map(|items| items.iter().filter_map(|c| c.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let mut recommendations: Vec<String> = concerns
        .iter()
        .filter_map(|concern| {
            let metric = concern.split(':').next()?;
            let advice = match metric {
                "healthy_services" => "Schedule a reliability sprint for degraded services",
                "tests_failed" => "Gate releases on a green integration suite",
                "at_risk_customers" => "Assign executive sponsors to at-risk accounts",
                "runway_months" => "Revisit hiring plan against current runway",
                "leads_generated_today" => "Rebalance outbound effort toward high-scoring verticals",
                _ => return None,
            };
            Some(advice.to_string())
        })
        .collect();
    if recommendations.is_empty() {
        recommendations.push("Accelerate healthcare vertical expansion".to_string());
    }

    ctx.save(
        &format!("strategic_recommendations_{}", ctx.month_stamp()),
        &json!({"recommendations": recommendations}),
    )?;
    ctx.metric("recommendations_made", recommendations.len() as f64)?;

    Ok(json!({
        "review_available": review.is_some(),
        "recommendations": recommendations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContextStore, MetricsSink};
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn ctx(dir: &TempDir, owner: &str) -> WorkerContext {
        WorkerContext::new(
            owner,
            Local.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap(),
            ContextStore::new(dir.path().join("cache")),
            MetricsSink::new(dir.path().join("logs/metrics.jsonl")),
        )
    }

    #[test]
    fn test_review_splits_highlights_and_concerns() {
        let dir = TempDir::new().unwrap();
        let devops = ctx(&dir, "devops");
        devops.metric("healthy_services", 5.0).unwrap();
        devops.metric("at_risk_customers", 2.0).unwrap();

        let review = performance_review(&ctx(&dir, "performance_review"), &Task::new("x")).unwrap();
        assert_eq!(review["month"], "December 2025");
        assert_eq!(review["highlights"], json!(["healthy_services: 5"]));
        assert_eq!(review["concerns"], json!(["at_risk_customers: 2"]));
    }

    #[test]
    fn test_recommendations_follow_review() {
        let dir = TempDir::new().unwrap();
        ctx(&dir, "qa_testing").metric("tests_failed", 3.0).unwrap();
        performance_review(&ctx(&dir, "performance_review"), &Task::new("x")).unwrap();

        let out = strategic_recommendations(&ctx(&dir, "strategic_recommendations"), &Task::new("x")).unwrap();
        assert_eq!(out["review_available"], true);
        assert_eq!(
            out["recommendations"],
            json!(["Gate releases on a green integration suite"])
        );
    }

    #[test]
    fn test_recommendations_without_review_fall_back() {
        let dir = TempDir::new().unwrap();
        let out = strategic_recommendations(&ctx(&dir, "strategic_recommendations"), &Task::new("x")).unwrap();
        assert_eq!(out["review_available"], false);
        assert_eq!(out["recommendations"].as_array().unwrap().len(), 1);
    }
}
