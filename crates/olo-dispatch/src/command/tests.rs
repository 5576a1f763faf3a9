use super::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::new("user", "Hello"),
        ChatMessage::new("assistant", "Hi there"),
        ChatMessage::new("user", "What's new?"),
    ]
}

fn builder_with_templates(dir: &TempDir) -> CommandBuilder {
    CommandBuilder::new(
        TemplateRenderer::new(Some(dir.path().to_path_buf())),
        CommandDefaults::default(),
    )
}

#[test]
fn test_chat_defaults_without_template() {
    let builder = CommandBuilder::default();
    let cmd = builder.chat_command_at(
        Some("rag-mistral"),
        Some("docs"),
        &history(),
        &CommandOptions::default(),
        1_700_000_000_000,
    );

    assert_eq!(cmd.tenant_id, "default");
    assert_eq!(cmd.user_id, "default");
    assert_eq!(cmd.operation, CHAT_OPERATION);
    assert_eq!(cmd.pipeline_name, "rag-mistral");
    assert_eq!(cmd.input["messages"][2]["content"], "What's new?");
    assert_eq!(cmd.metadata["ragTag"], "docs");
    assert_eq!(cmd.metadata["timestamp"], 1_700_000_000_000_i64);
    assert!(cmd.debug.is_none());
    assert!(cmd.debug_id.is_none());
}

#[test]
fn test_chat_without_pipeline_uses_llama_oss() {
    let cmd = CommandBuilder::default().build_chat_command(
        None,
        None,
        &[],
        &CommandOptions::default(),
    );
    assert_eq!(cmd.pipeline_name, "llama-oss");
    assert!(cmd.metadata["ragTag"].is_null());
}

#[test]
fn test_chat_is_pure_apart_from_timestamp() {
    let builder = CommandBuilder::default();
    let a = builder.chat_command_at(Some("p"), None, &history(), &CommandOptions::default(), 1);
    let b = builder.chat_command_at(Some("p"), None, &history(), &CommandOptions::default(), 1);
    assert_eq!(a, b);

    let c = builder.build_chat_command(Some("p"), None, &history(), &CommandOptions::default());
    let d = builder.build_chat_command(Some("p"), None, &history(), &CommandOptions::default());
    assert_eq!(c.input, d.input);
    assert_eq!(c.pipeline_name, d.pipeline_name);
    assert_eq!(c.metadata["ragTag"], d.metadata["ragTag"]);
}

#[test]
fn test_defaults_from_config() {
    let config = DispatchConfig {
        tenant_id: Some("acme".to_string()),
        user_id: Some("  ".to_string()),
        ..Default::default()
    };
    let defaults = CommandDefaults::from_config(&config);
    assert_eq!(defaults.tenant_id, "acme");
    assert_eq!(defaults.user_id, "default");
}

#[test]
fn test_chat_template_overrides_per_field() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("llama-oss_chat.tpl"),
        r#"{
            "pipelineId": "from-template",
            "operation": "summarize",
            "input": {"question": {{messages}}, "tag": "{{ragTag}}"}
        }"#,
    )
    .unwrap();

    let cmd = builder_with_templates(&dir).chat_command_at(
        Some("llama-oss"),
        Some("docs"),
        &history(),
        &CommandOptions::default(),
        7,
    );

    // from template
    assert_eq!(cmd.pipeline_name, "from-template");
    assert_eq!(cmd.operation, "summarize");
    assert_eq!(cmd.input["tag"], "docs");
    assert_eq!(cmd.input["question"][0]["content"], "Hello");
    // from defaults
    assert_eq!(cmd.tenant_id, "default");
    assert_eq!(cmd.metadata["timestamp"], 7);
}

#[test]
fn test_chat_template_pipeline_name_beats_pipeline_id() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("p_chat.tpl"),
        r#"{"pipelineName": "named", "pipelineId": "id"}"#,
    )
    .unwrap();
    let cmd = builder_with_templates(&dir).build_chat_command(
        Some("p"),
        None,
        &[],
        &CommandOptions::default(),
    );
    assert_eq!(cmd.pipeline_name, "named");
}

#[test]
fn test_chat_invalid_template_falls_back() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("p_chat.tpl"), r#"{"input": {{ragTag}} }"#).unwrap();
    let cmd = builder_with_templates(&dir).chat_command_at(
        Some("p"),
        Some("docs"),
        &history(),
        &CommandOptions::default(),
        1,
    );
    assert_eq!(cmd.operation, CHAT_OPERATION);
    assert_eq!(cmd.pipeline_name, "p");
    assert_eq!(cmd.input["messages"].as_array().unwrap().len(), 3);
}

#[test]
fn test_upload_defaults_without_template() {
    let files = vec!["a.pdf".to_string(), "b.txt".to_string()];
    let cmd = CommandBuilder::default().upload_command_at(
        Some("a b/c"),
        &files,
        &CommandOptions::default(),
        99,
    );

    assert_eq!(cmd.operation, INGESTION_OPERATION);
    assert_eq!(cmd.pipeline_name, "doc-a_b_c");
    assert_eq!(cmd.input["ragTag"], "a b/c");
    assert_eq!(cmd.input["fileNames"][1], "b.txt");
    assert_eq!(cmd.input["timestamp"], 99);
    assert_eq!(cmd.metadata["ragTag"], "a b/c");
}

#[test]
fn test_upload_template_is_used() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("upload.tpl"),
        r#"{
            "tenantId": "t1",
            "operation": "ingest",
            "pipelineName": "ingest-{{ragTag}}",
            "input": {"files": {{fileNames}}, "at": {{timestamp}}}
        }"#,
    )
    .unwrap();
    let files = vec!["a.pdf".to_string()];
    let cmd = builder_with_templates(&dir).upload_command_at(
        Some("docs"),
        &files,
        &CommandOptions::default(),
        5,
    );
    assert_eq!(cmd.tenant_id, "t1");
    assert_eq!(cmd.operation, "ingest");
    assert_eq!(cmd.pipeline_name, "ingest-docs");
    assert_eq!(cmd.input["files"][0], "a.pdf");
    assert_eq!(cmd.input["at"], 5);
    assert_eq!(cmd.user_id, "default");
}

#[test]
fn test_debug_fields_require_id() {
    let builder = CommandBuilder::default();

    let with_id = builder.build_chat_command(None, None, &[], &CommandOptions::debug("dbg-1"));
    assert_eq!(with_id.debug, Some(true));
    assert_eq!(with_id.debug_id.as_deref(), Some("dbg-1"));

    let without_id = builder.build_upload_command(
        Some("docs"),
        &[],
        &CommandOptions {
            debug: true,
            debug_id: None,
        },
    );
    assert!(without_id.debug.is_none());

    let off = builder.build_upload_command(
        Some("docs"),
        &[],
        &CommandOptions {
            debug: false,
            debug_id: Some("x".to_string()),
        },
    );
    assert!(off.debug_id.is_none());
}

#[test]
fn test_serialized_field_names() {
    let cmd = CommandBuilder::default().build_chat_command(
        None,
        None,
        &[],
        &CommandOptions::debug("abc"),
    );
    let value = serde_json::to_value(&cmd).unwrap();
    for key in ["tenantId", "userId", "operation", "input", "pipelineName", "metadata", "debug", "debugID"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }

    let plain = CommandBuilder::default().build_chat_command(None, None, &[], &CommandOptions::default());
    let value = serde_json::to_value(&plain).unwrap();
    assert!(value.get("debug").is_none());
    assert!(value.get("debugID").is_none());
}

#[test]
fn test_missing_template_dir_is_not_an_error() {
    let builder = CommandBuilder::new(
        TemplateRenderer::new(Some(PathBuf::from("/no/such/dir"))),
        CommandDefaults::default(),
    );
    let cmd = builder.build_chat_command(Some("p"), None, &[], &CommandOptions::default());
    assert_eq!(cmd.pipeline_name, "p");
}
