//! Weekly workers. Run in order, so later ones may read what earlier ones saved.

use serde_json::{Value, json};

use super::BuiltinWorker;
use crate::errors::WorkerError;
use crate::worker::{Cadence, Task, WorkerContext};

const YEAR_ONE_ARR_TARGET: f64 = 85_700_000.0;
const CASH_BALANCE: f64 = 4_200_000.0;
const MONTHLY_BURN: f64 = 310_000.0;

pub(super) fn workers() -> Vec<BuiltinWorker> {
    vec![
        BuiltinWorker::new("financial", Cadence::Weekly, "weekly_financial_update", financial_update),
        BuiltinWorker::new("content_marketing", Cadence::Weekly, "weekly_content_plan", content_plan),
        BuiltinWorker::new("product_manager", Cadence::Weekly, "weekly_product_update", product_update),
        BuiltinWorker::new("customer_intel", Cadence::Weekly, "weekly_customer_analysis", customer_analysis),
    ]
}

fn financial_update(ctx: &WorkerContext, _task: &Task) -> Result<Value, WorkerError> {
    let customers = 38u64;
    let arpc = 29_500.0;
    let current_arr = customers as f64 * arpc;
    let variance_percent = (current_arr / YEAR_ONE_ARR_TARGET - 1.0) * 100.0;
    let runway_months = (CASH_BALANCE / MONTHLY_BURN * 10.0).round() / 10.0;

    let metrics = json!({
        "current_arr": current_arr,
        "current_mrr": current_arr / 12.0,
        "target_arr_y1": YEAR_ONE_ARR_TARGET,
        "variance_percent": variance_percent,
        "customers": customers,
        "arpc": arpc,
        "burn_rate": MONTHLY_BURN,
        "runway_months": runway_months,
        "cash_balance": CASH_BALANCE,
    });
    ctx.save(&format!("financial_update_{}", ctx.date_stamp()), &metrics)?;
    ctx.metric("weekly_arr", current_arr)?;
    ctx.metric("weekly_customers", customers as f64)?;

    let mut alerts = Vec::new();
    if variance_percent < -20.0 {
        alerts.push(format!("ARR is {:.0}% behind the year-one plan", -variance_percent));
    }
    if runway_months < 18.0 {
        alerts.push(format!("Runway is {:.1} months", runway_months));
    }

    Ok(json!({
        "metrics": metrics,
        "alerts": alerts,
    }))
}

fn content_plan(ctx: &WorkerContext, _task: &Task) -> Result<Value, WorkerError> {
    let blog_posts = json!([
        {"title": "Compliance automation for regional health systems", "vertical": "healthcare"},
        {"title": "Cutting POS downtime across 200 stores", "vertical": "retail-chains"},
        {"title": "What banks ask before buying AI tooling", "vertical": "banking-financial"},
    ]);
    let social = json!([
        {"channel": "linkedin", "posts": 5},
        {"channel": "x", "posts": 7},
    ]);
    let blog_count = blog_posts.as_array().map_or(0, Vec::len);
    let social_count: u64 = social
        .as_array()
        .map(|channels| channels.iter().filter_map(|c| c["posts"].as_u64()).sum())
        .unwrap_or(0);

    ctx.save(
        &format!("content_plan_{}", ctx.date_stamp()),
        &json!({"blog_posts": blog_posts, "social_content": social}),
    )?;
    ctx.metric("blog_posts_created", blog_count as f64)?;
    ctx.metric("social_posts_created", social_count as f64)?;

    Ok(json!({
        "blog_posts": blog_count,
        "social_posts": social_count,
        "content_calendar": blog_posts,
    }))
}

/// Prioritises revenue work harder when the financial update shows a gap.
fn product_update(ctx: &WorkerContext, _task: &Task) -> Result<Value, WorkerError> {
    let financial = ctx.load_from("financial", &format!("financial_update_{}", ctx.date_stamp()))?;
    let behind_plan = financial
        .as_ref()
        .and_then(|f| f["variance_percent"].as_f64())
        .is_some_and(|v| v < 0.0);

    let billing_score = if behind_plan { 94 } else { 70 };
    let mut features = vec![
        json!({"feature": "SSO for enterprise tenants", "score": 82}),
        json!({"feature": "Usage-based billing", "score": billing_score}),
        json!({"feature": "Offline mode for field staff", "score": 61}),
        json!({"feature": "Audit log export", "score": 77}),
    ];
    features.sort_by_key(|f| std::cmp::Reverse(f["score"].as_u64().unwrap_or(0)));
    let roadmap: Vec<Value> = features.iter().take(3).cloned().collect();

    ctx.save(
        &format!("product_update_{}", ctx.date_stamp()),
        &json!({"feature_priorities": features, "roadmap": roadmap}),
    )?;
    ctx.metric("features_prioritized", features.len() as f64)?;
    ctx.metric("roadmap_items", roadmap.len() as f64)?;

    Ok(json!({
        "financial_context": financial.is_some(),
        "behind_plan": behind_plan,
        "top_feature": features.first().map(|f| f["feature"].clone()).unwrap_or(Value::Null),
        "roadmap": roadmap,
    }))
}

/// Builds on the latest daily customer health check when one exists.
fn customer_analysis(ctx: &WorkerContext, _task: &Task) -> Result<Value, WorkerError> {
    let health = ctx.load_from("customer_success", &format!("health_check_{}", ctx.date_stamp()))?;
    let churn_risks: Vec<Value> = health
        .as_ref()
        .and_then(|h| h["at_risk_customers"].as_array().cloned())
        .unwrap_or_default();
    let expansion: Vec<Value> = health
        .as_ref()
        .and_then(|h| h["expansion_opportunities"].as_array().cloned())
        .unwrap_or_default();

    ctx.save(
        &format!("customer_intel_{}", ctx.date_stamp()),
        &json!({"churn_predictions": churn_risks, "expansion_signals": expansion}),
    )?;
    ctx.metric("churn_risks_identified", churn_risks.len() as f64)?;
    ctx.metric("expansion_signals", expansion.len() as f64)?;

    Ok(json!({
        "health_data": health.is_some(),
        "churn_risks": churn_risks.len(),
        "expansion_signals": expansion.len(),
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
            Local.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap(),
            ContextStore::new(dir.path().join("cache")),
            MetricsSink::new(dir.path().join("logs/metrics.jsonl")),
        )
    }

    #[test]
    fn test_product_update_reads_financial_context() {
        let dir = TempDir::new().unwrap();
        let task = Task::new("weekly_product_update");

        let alone = product_update(&ctx(&dir, "product_manager"), &task).unwrap();
        assert_eq!(alone["financial_context"], false);

        financial_update(&ctx(&dir, "financial"), &task).unwrap();
        let informed = product_update(&ctx(&dir, "product_manager"), &task).unwrap();
        assert_eq!(informed["financial_context"], true);
        assert_eq!(informed["behind_plan"], true);
        assert_eq!(informed["top_feature"], "Usage-based billing");
    }

    #[test]
    fn test_customer_analysis_without_health_data() {
        let dir = TempDir::new().unwrap();
        let out = customer_analysis(&ctx(&dir, "customer_intel"), &Task::new("x")).unwrap();
        assert_eq!(out["health_data"], false);
        assert_eq!(out["churn_risks"], 0);
    }

    #[test]
    fn test_financial_metrics_shape() {
        let dir = TempDir::new().unwrap();
        let out = financial_update(&ctx(&dir, "financial"), &Task::new("x")).unwrap();
        let arr = out["metrics"]["current_arr"].as_f64().unwrap();
        let mrr = out["metrics"]["current_mrr"].as_f64().unwrap();
        assert!((arr / 12.0 - mrr).abs() < 1e-6);
        assert_eq!(out["metrics"]["customers"], 38);
    }
}
