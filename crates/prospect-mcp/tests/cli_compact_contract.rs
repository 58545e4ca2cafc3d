use assert_cmd::Command;
use predicates::prelude::*;

fn bundle() -> serde_json::Value {
    serde_json::json!({
        "firmo": {"structuredContent": {
            "companyName": "TaxJar",
            "domain": "taxjar.com",
            "employeeCount": 250,
            "metadata": {"lastUpdated": "2024-05-01T10:00:00Z"}
        }},
        "techno": {"products": [
            {"productName": "Snowflake", "vendorName": "Snowflake", "intensity": 4},
            {"productName": "Snowflake", "vendorName": "Snowflake", "intensity": 5},
            {"productName": "Okta", "vendorName": "Okta", "intensity": 3}
        ]},
        "cloudSpend": {"error": "cloud spend unavailable"},
        "intentTopics": {"topics": ["Zero Trust", {"name": "SASE"}]}
    })
}

#[test]
fn compact_bundle_contract() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("bundle.json");
    std::fs::write(&path, bundle().to_string()).expect("write bundle");

    let out = Command::new(assert_cmd::cargo::cargo_bin!("prospect"))
        .args(["compact", "--input"])
        .arg(&path)
        .output()
        .expect("run prospect compact");
    assert!(out.status.success(), "prospect compact failed");

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse compact json");
    for section in ["company", "tech_highlights", "sales_signals", "product_signals"] {
        assert!(v.get(section).is_some(), "missing section {section}");
    }
    assert_eq!(v["company"]["name"], "TaxJar");
    assert_eq!(v["company"]["data_freshness"], "2024-05-01");

    let tools = v["tech_highlights"]["languages_tools"].as_array().expect("tools array");
    assert_eq!(tools[0]["product"], "Snowflake");
    assert_eq!(tools[0]["intensity"], 9);
    assert_eq!(tools.len(), 2);

    assert_eq!(
        v["tech_highlights"]["cloud_stack_top_spend"],
        serde_json::json!({"error": "cloud spend unavailable"})
    );
    assert_eq!(
        v["product_signals"]["intent_topics"],
        serde_json::json!(["Zero Trust", "SASE"])
    );
}

#[test]
fn compact_rejects_malformed_bundle() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("bundle.json");
    std::fs::write(&path, "[1, 2").expect("write bundle");

    Command::new(assert_cmd::cargo::cargo_bin!("prospect"))
        .args(["compact", "--input"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse bundle"));
}

#[test]
fn compact_rejects_array_bundle() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("bundle.json");
    std::fs::write(&path, r#"[{"companyName": "Acme"}, {"error": "x"}]"#).expect("write bundle");

    Command::new(assert_cmd::cargo::cargo_bin!("prospect"))
        .args(["compact", "--input"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("parse bundle"));
}
