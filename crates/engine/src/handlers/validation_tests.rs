use super::*;
use cv_core::test_support;
use serde_json::json;

#[tokio::test]
async fn missing_schema_is_pass_through() {
    let stage = test_support::stage("c", &["b"]);
    let ctx = StageContext {
        variables: Default::default(),
        input: Some(json!({"data": [{"id": 1}, {"id": 2}]})),
    };
    let output = ValidationHandler.run(&stage, &ctx).await.unwrap();
    assert_eq!(output["total"], 2);
    assert_eq!(output["valid"], 2);
    assert_eq!(output["invalid"], 0);
    assert!(output["schema"].is_null());
}

#[tokio::test]
async fn schema_rejects_records_missing_required_fields() {
    let mut stage = test_support::stage("c", &["b"]);
    stage
        .config
        .insert("schema".to_string(), json!(["id", "name"]));
    let ctx = StageContext {
        variables: Default::default(),
        input: Some(json!({"data": [{"id": 1, "name": "a"}, {"id": 2}]})),
    };
    let output = ValidationHandler.run(&stage, &ctx).await.unwrap();
    assert_eq!(output["total"], 2);
    assert_eq!(output["valid"], 1);
    assert_eq!(output["invalid"], 1);
}
