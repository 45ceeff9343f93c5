//! openFDA response fixtures

use serde_json::{Value, json};

/// Path the mock server serves searches on
pub const EVENT_PATH: &str = "/drug/event.json";

/// A realistic single report with two drugs and two reactions
pub fn statin_event(report_id: &str) -> Value {
    json!({
        "safetyreportid": report_id,
        "receivedate": "20220314",
        "serious": "1",
        "primarysourcecountry": "US",
        "occurcountry": "US",
        "primarysource": { "qualification": "3", "reportercountry": "US" },
        "patient": {
            "patientsex": "2",
            "drug": [
                {
                    "drugcharacterization": "1",
                    "medicinalproduct": "LIPITOR",
                    "openfda": {
                        "generic_name": ["ATORVASTATIN CALCIUM"],
                        "brand_name": ["LIPITOR"]
                    }
                },
                {
                    "drugcharacterization": "2",
                    "medicinalproduct": "ASPIRIN"
                }
            ],
            "reaction": [
                { "reactionmeddrapt": "Myalgia" },
                { "reactionmeddrapt": "Fatigue" }
            ]
        }
    })
}

/// A report with no drug entries; it flattens to nothing
pub fn drugless_event(report_id: &str) -> Value {
    json!({
        "safetyreportid": report_id,
        "receivedate": "20220101",
        "serious": "2",
        "patient": { "reaction": [{ "reactionmeddrapt": "Rash" }] }
    })
}

/// Search response body with `total` and the given results
pub fn search_body(total: u64, results: Vec<Value>) -> Value {
    json!({
        "meta": {
            "disclaimer": "Do not rely on openFDA to make decisions regarding medical care.",
            "results": { "skip": 0, "limit": results.len(), "total": total }
        },
        "results": results
    })
}

/// `n` statin events with ids `{prefix}-0 .. {prefix}-{n-1}`
pub fn statin_page(prefix: &str, n: usize) -> Vec<Value> {
    (0..n).map(|i| statin_event(&format!("{prefix}-{i}"))).collect()
}
