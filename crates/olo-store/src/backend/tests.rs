use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_memory_without_redis_url() {
    let backend = StoreBackend::select(&StoreConfig::default()).await;
    assert_eq!(backend.backend_kind(), BackendKind::Memory);
}

#[tokio::test]
async fn test_blank_redis_url_is_ignored() {
    let config = StoreConfig {
        redis_url: Some("   ".to_string()),
        ..Default::default()
    };
    let backend = StoreBackend::select(&config).await;
    assert_eq!(backend.backend_kind(), BackendKind::Memory);
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_memory() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        redis_url: Some("redis://127.0.0.1:1".to_string()),
        snapshot_file: Some(dir.path().join("store.json")),
        ..Default::default()
    };
    let backend = StoreBackend::select(&config).await;
    assert_eq!(backend.backend_kind(), BackendKind::Memory);

    let conv = backend.create_conversation(None, None).await.unwrap();
    assert!(backend.get_conversation(&conv.id).await.unwrap().is_some());
    assert!(dir.path().join("store.json").exists());
}

#[tokio::test]
async fn test_invalid_redis_url_falls_back_to_memory() {
    let config = StoreConfig {
        redis_url: Some("definitely not a url".to_string()),
        ..Default::default()
    };
    let backend = StoreBackend::select(&config).await;
    assert!(matches!(backend, StoreBackend::Memory(_)));
}
