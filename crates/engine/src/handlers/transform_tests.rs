use super::*;
use cv_core::test_support;
use serde_json::json;

#[tokio::test]
async fn passes_input_records_through() {
    let mut stage = test_support::stage("b", &["a"]);
    stage
        .config
        .insert("operation".to_string(), json!("normalize"));
    let ctx = StageContext {
        variables: Default::default(),
        input: Some(json!({"records": [{"id": 1}, {"id": 2}, {"id": 3}]})),
    };

    let output = TransformHandler.run(&stage, &ctx).await.unwrap();

    assert_eq!(output["operation"], "normalize");
    assert_eq!(output["input_count"], 3);
    assert_eq!(output["output_count"], 3);
    assert_eq!(output["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn defaults_operation_to_identity_with_no_input() {
    let stage = test_support::stage("b", &[]);
    let output = TransformHandler
        .run(&stage, &StageContext::default())
        .await
        .unwrap();
    assert_eq!(output["operation"], "identity");
    assert_eq!(output["input_count"], 0);
}
