use originsnap::base::SnapError;
use originsnap::capture::{CaptureOrchestrator, DegradeLevel, DroppedCategory};
use originsnap::config::EngineConfig;
use originsnap::context::MemoryContext;
use originsnap::cookies::CookieRecord;
use originsnap::database::MemoryDatabases;
use originsnap::snapshot::{MemoryCatalog, SnapshotCatalog, SnapshotRecord};
use originsnap::storage::StoreScope;
use originsnap::value::RuntimeValue;
use serde_json::Value;
use url::Url;

fn context(url: &str) -> MemoryContext {
    MemoryContext::new("tab", Url::parse(url).unwrap())
}

#[tokio::test]
async fn test_capture_end_to_end_shape() {
    let ctx = context("https://x.com/");
    ctx.jar().insert(CookieRecord::new("sid", "abc", "x.com"));
    ctx.store(StoreScope::Local).insert("theme", "dark");

    let capture = CaptureOrchestrator::default()
        .capture(&ctx, "work")
        .await
        .unwrap();
    assert!(capture.warnings.is_empty());

    let json: Value = serde_json::from_slice(&capture.record.to_json_bytes().unwrap()).unwrap();
    assert_eq!(json["cookies"].as_array().unwrap().len(), 1);
    assert_eq!(json["keyValueStoreA"]["theme"], "dark");
    assert_eq!(json["embeddedDatabases"], serde_json::json!({}));
    assert_eq!(json["domain"], "x.com");
    assert_eq!(json["summary"]["cookieCount"], 1);
}

#[tokio::test]
async fn test_capture_reads_databases_and_partition() {
    let databases = MemoryDatabases::new();
    databases.put_collection(
        "app",
        "photos",
        vec![RuntimeValue::object([
            ("caption", RuntimeValue::from("beach")),
            ("pixels", RuntimeValue::Bytes(vec![0; 64])),
        ])],
    );
    let ctx = context("https://x.com/")
        .with_databases(databases)
        .with_partition("container-1");

    let capture = CaptureOrchestrator::default().capture(&ctx, "db").await.unwrap();
    let record = &capture.record;
    assert_eq!(record.cookie_store_id.as_deref(), Some("container-1"));
    assert_eq!(record.embedded_databases["app"]["photos"][0].elided_count(), 1);
}

#[tokio::test]
async fn test_unreadable_collection_becomes_warning() {
    let databases = MemoryDatabases::new();
    databases.put_collection("app", "ok", vec![RuntimeValue::from("x")]);
    databases.put_collection("app", "broken", vec![RuntimeValue::from("y")]);
    databases.fail_collection("app", "broken");
    let ctx = context("https://x.com/").with_databases(databases);

    let capture = CaptureOrchestrator::default().capture(&ctx, "partial").await.unwrap();
    assert_eq!(capture.warnings.len(), 1);
    assert_eq!(capture.warnings[0].source, "database:app/broken");
    assert!(capture.record.embedded_databases["app"].contains_key("ok"));
}

#[tokio::test]
async fn test_closed_context_fails_capture() {
    let ctx = context("https://x.com/");
    ctx.close();
    let err = CaptureOrchestrator::default().capture(&ctx, "gone").await.unwrap_err();
    assert!(matches!(err, SnapError::TargetUnavailable { .. }));
}

#[tokio::test]
async fn test_oversized_databases_are_dropped_and_reported() {
    let databases = MemoryDatabases::new();
    databases.put_collection("app", "blobs", vec![RuntimeValue::from("z".repeat(16 * 1024))]);
    let ctx = context("https://x.com/").with_databases(databases);
    ctx.jar().insert(CookieRecord::new("sid", "abc", "x.com"));
    ctx.store(StoreScope::Session).insert("tab", "3");

    let catalog = MemoryCatalog::new();
    let orchestrator = CaptureOrchestrator::new(EngineConfig::new().max_snapshot_bytes(8 * 1024));
    let report = orchestrator
        .capture_and_persist(&ctx, "big", &catalog)
        .await
        .unwrap();

    assert_eq!(report.level, DegradeLevel::WithoutDatabases);
    assert_eq!(report.dropped, vec![DroppedCategory::EmbeddedDatabases]);
    assert!(report.is_degraded());
    assert_eq!(report.summary.embedded_database_count, 0);
    assert_eq!(report.summary.cookie_count, 1);

    let stored = catalog.get(&report.snapshot_id).await.unwrap().unwrap();
    let record = SnapshotRecord::from_json_slice(&stored).unwrap();
    assert!(record.embedded_databases.is_empty());
    assert_eq!(record.key_value_store_b["tab"], "3");
}

#[tokio::test]
async fn test_minimal_payload_over_ceiling_is_exhausted() {
    let ctx = context("https://x.com/");
    ctx.store(StoreScope::Local).insert("huge", "q".repeat(16 * 1024));

    let catalog = MemoryCatalog::new();
    let orchestrator = CaptureOrchestrator::new(EngineConfig::new().max_snapshot_bytes(8 * 1024));
    let err = orchestrator
        .capture_and_persist(&ctx, "too big", &catalog)
        .await
        .unwrap_err();

    assert!(matches!(err, SnapError::PersistenceExhausted { .. }));
    assert!(catalog.is_empty());
}
