use super::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Connector that fails `failures` times, then hands out `client`
struct FakeConnector {
    attempts: AtomicUsize,
    failures: usize,
    client: Option<Arc<dyn WorkflowClient>>,
}

impl FakeConnector {
    fn new(client: impl WorkflowClient + 'static) -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            failures: 0,
            client: Some(Arc::new(client)),
        }
    }

    fn unreachable() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            failures: usize::MAX,
            client: None,
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn WorkflowClient>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.client {
            Some(client) if attempt >= self.failures => Ok(Arc::clone(client)),
            _ => Err(Error::NotConfigured("connection refused".to_string())),
        }
    }
}

/// Client whose workflows never finish in time
struct SlowClient;

#[async_trait]
impl WorkflowClient for SlowClient {
    async fn start_workflow(&self, request: &StartWorkflowRequest) -> Result<WorkflowHandle> {
        Ok(WorkflowHandle {
            workflow_id: request.workflow_id.clone(),
            run_id: None,
        })
    }

    async fn await_result(&self, _handle: &WorkflowHandle) -> Result<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(json!("too late"))
    }
}

fn handle_for(request: &StartWorkflowRequest) -> Result<WorkflowHandle> {
    Ok(WorkflowHandle {
        workflow_id: request.workflow_id.clone(),
        run_id: Some("run-1".to_string()),
    })
}

fn history() -> Vec<ChatMessage> {
    vec![ChatMessage::new("user", "Hello")]
}

#[tokio::test]
async fn test_stub_reply_when_unconnected() {
    let config = DispatchConfig {
        use_stub_llm: true,
        ..Default::default()
    };
    let dispatcher = WorkflowDispatcher::new(&config, Arc::new(FakeConnector::unreachable()));

    let outcome = dispatcher
        .dispatch_chat(None, None, &history(), &CommandOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status, DispatchStatus::Completed);
    let reply = outcome.reply.unwrap();
    assert!(reply.starts_with("[Stub LLM]"));
    assert!(reply.contains("Hello"));
}

#[tokio::test]
async fn test_not_configured_without_stub() {
    let dispatcher = WorkflowDispatcher::new(
        &DispatchConfig::default(),
        Arc::new(FakeConnector::unreachable()),
    );

    let outcome = dispatcher
        .dispatch_chat(None, None, &history(), &CommandOptions::default())
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.status, DispatchStatus::Failed);
    assert!(outcome.error.unwrap().starts_with("Temporal not configured"));

    let ingestion = dispatcher
        .dispatch_ingestion(Some("docs"), &[], &CommandOptions::default())
        .await;
    assert!(!ingestion.started);
    assert!(ingestion.workflow_id.is_none());
    assert_eq!(ingestion.error.as_deref(), Some(NOT_CONFIGURED));
}

#[tokio::test]
async fn test_connects_once() {
    let mut client = MockWorkflowClient::new();
    client
        .expect_start_workflow()
        .times(3)
        .returning(|req| handle_for(req));
    client
        .expect_await_result()
        .times(3)
        .returning(|_| Ok(json!({"reply": "ok"})));

    let connector = Arc::new(FakeConnector::new(client));
    let dispatcher = WorkflowDispatcher::new(&DispatchConfig::default(), connector.clone());

    for _ in 0..3 {
        let outcome = dispatcher
            .dispatch_chat(Some("llama-oss"), None, &history(), &CommandOptions::default())
            .await;
        assert_eq!(outcome.reply.as_deref(), Some("ok"));
    }
    assert_eq!(connector.attempts(), 1);
    assert!(dispatcher.is_connected());
}

#[tokio::test]
async fn test_failed_connect_is_retried() {
    let mut client = MockWorkflowClient::new();
    client
        .expect_start_workflow()
        .times(1)
        .returning(|req| handle_for(req));
    client
        .expect_await_result()
        .times(1)
        .returning(|_| Ok(json!("second time lucky")));

    let connector = Arc::new(FakeConnector {
        failures: 1,
        ..FakeConnector::new(client)
    });
    let dispatcher = WorkflowDispatcher::new(&DispatchConfig::default(), connector.clone());

    let first = dispatcher
        .dispatch_chat(None, None, &history(), &CommandOptions::default())
        .await;
    assert!(!first.success);
    assert!(!dispatcher.is_connected());

    let second = dispatcher
        .dispatch_chat(None, None, &history(), &CommandOptions::default())
        .await;
    assert_eq!(second.reply.as_deref(), Some("second time lucky"));
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn test_chat_timeout_names_queue_and_workflow() {
    let config = DispatchConfig {
        chat_result_timeout_ms: 50,
        ..Default::default()
    };
    let dispatcher = WorkflowDispatcher::new(&config, Arc::new(FakeConnector::new(SlowClient)));

    let outcome = dispatcher
        .dispatch_chat(Some("llama-oss"), None, &history(), &CommandOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.status, DispatchStatus::TimedOut);
    let error = outcome.error.unwrap();
    assert!(error.contains("within 0.05s"), "{error}");
    assert!(error.contains("\"core-task-queue\""), "{error}");
    assert!(error.contains("\"CoreWorkflow\""), "{error}");
}

#[tokio::test]
async fn test_chat_request_shape_and_reply() {
    let mut client = MockWorkflowClient::new();
    client
        .expect_start_workflow()
        .withf(|req| {
            let attrs = req.search_attributes.as_ref().unwrap();
            req.workflow_name == "CoreWorkflow"
                && req.task_queue == "core-task-queue"
                && req.workflow_id.starts_with("chat-rag-phi3-")
                && req.args.len() == 1
                && req.args[0].operation == "question-answer"
                && attrs["pipelineName"] == vec!["rag-phi3".to_string()]
                && attrs["tenantId"] == vec!["default".to_string()]
        })
        .times(1)
        .returning(|req| handle_for(req));
    client
        .expect_await_result()
        .withf(|handle| handle.run_id.as_deref() == Some("run-1"))
        .times(1)
        .returning(|_| Ok(json!([{"stageName": "answer", "data": {"response": "x"}}])));

    let dispatcher =
        WorkflowDispatcher::new(&DispatchConfig::default(), Arc::new(FakeConnector::new(client)));
    let outcome = dispatcher
        .dispatch_chat(Some("rag-phi3"), Some("docs"), &history(), &CommandOptions::default())
        .await;

    assert_eq!(outcome, ChatOutcome::completed("x".to_string()));
}

#[tokio::test]
async fn test_chat_workflow_failure_is_verbatim() {
    let mut client = MockWorkflowClient::new();
    client
        .expect_start_workflow()
        .returning(|req| handle_for(req));
    client
        .expect_await_result()
        .returning(|_| Err(Error::WorkflowFailed("activity exploded".to_string())));

    let dispatcher =
        WorkflowDispatcher::new(&DispatchConfig::default(), Arc::new(FakeConnector::new(client)));
    let outcome = dispatcher
        .dispatch_chat(None, None, &history(), &CommandOptions::default())
        .await;

    assert_eq!(outcome.status, DispatchStatus::Failed);
    assert_eq!(outcome.error.as_deref(), Some("activity exploded"));
}

#[tokio::test]
async fn test_ingestion_started() {
    let mut client = MockWorkflowClient::new();
    client
        .expect_start_workflow()
        .withf(|req| {
            req.workflow_id.starts_with("doc-ingest-my_docs-")
                && req.args[0].pipeline_name == "doc-my_docs"
                && req.args[0].input["fileNames"][0] == "a.pdf"
        })
        .times(1)
        .returning(|req| handle_for(req));
    client.expect_await_result().never();

    let dispatcher =
        WorkflowDispatcher::new(&DispatchConfig::default(), Arc::new(FakeConnector::new(client)));
    let outcome = dispatcher
        .dispatch_ingestion(
            Some("my docs"),
            &["a.pdf".to_string()],
            &CommandOptions::default(),
        )
        .await;

    assert!(outcome.started);
    assert!(outcome.workflow_id.unwrap().starts_with("doc-ingest-my_docs-"));
    assert_eq!(outcome.run_id.as_deref(), Some("run-1"));
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_ingestion_rejected_keeps_workflow_id() {
    let mut client = MockWorkflowClient::new();
    client
        .expect_start_workflow()
        .returning(|_| Err(Error::Api("workflow already started".to_string())));

    let dispatcher =
        WorkflowDispatcher::new(&DispatchConfig::default(), Arc::new(FakeConnector::new(client)));
    let outcome = dispatcher
        .dispatch_ingestion(Some("docs"), &[], &CommandOptions::default())
        .await;

    assert!(!outcome.started);
    assert!(outcome.workflow_id.unwrap().starts_with("doc-ingest-docs-"));
    assert_eq!(outcome.error.as_deref(), Some("workflow already started"));
}

#[test]
fn test_stub_reply_truncates_last_user_message() {
    let long = "x".repeat(150);
    let history = vec![
        ChatMessage::new("user", "first"),
        ChatMessage::new("assistant", "reply"),
        ChatMessage::new("user", long.as_str()),
    ];
    let reply = stub_reply(&history);
    assert!(reply.contains(&format!("\"{}\"", "x".repeat(100))));
    assert!(!reply.contains(&"x".repeat(101)));

    assert_eq!(
        stub_reply(&[]),
        "[Stub LLM] You said: \"\". Configure Temporal and templates for real responses."
    );
}
