use super::*;
use serde_json::json;

#[test]
fn test_empty_section_uses_defaults() {
    let config: DispatchConfig = serde_json::from_value(json!({})).unwrap();
    assert_eq!(config.chat_result_timeout_ms, DEFAULT_CHAT_RESULT_TIMEOUT_MS);
    assert_eq!(config.chat_queue_template(), DEFAULT_TASK_QUEUE);
}

#[test]
fn test_zero_timeout_means_default() {
    let config: DispatchConfig =
        serde_json::from_value(json!({ "chat_result_timeout_ms": 0 })).unwrap();
    assert_eq!(config.chat_result_timeout_ms, DEFAULT_CHAT_RESULT_TIMEOUT_MS);

    let config = DispatchConfig {
        chat_result_timeout_ms: 0,
        ..Default::default()
    };
    assert_eq!(config.chat_result_timeout(), Duration::from_secs(120));
}

#[test]
fn test_explicit_timeout_kept() {
    let config: DispatchConfig =
        serde_json::from_value(json!({ "chat_result_timeout_ms": 5000 })).unwrap();
    assert_eq!(config.chat_result_timeout(), Duration::from_secs(5));
}

#[test]
fn test_queue_override_precedence() {
    let config = DispatchConfig {
        task_queue: Some("global".to_string()),
        chat_task_queue: Some("  ".to_string()),
        doc_task_queue: Some("docs".to_string()),
        ..Default::default()
    };
    assert_eq!(config.chat_queue_template(), "global");
    assert_eq!(config.doc_queue_template(), "docs");
}
