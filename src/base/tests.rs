use crate::base::snaperror::{ErrorKind, SnapError};
use std::time::Duration;

#[test]
fn test_fatal_classification() {
    assert!(SnapError::PersistenceExhausted { bytes: 10 }.is_fatal());
    assert!(SnapError::target_unavailable("tab closed").is_fatal());

    assert!(!SnapError::validation("bad cookie").is_fatal());
    assert!(!SnapError::not_found("sid").is_fatal());
    assert!(!SnapError::backend("writing cookie", "denied").is_fatal());
    assert!(!SnapError::QuotaExceeded { bytes: 2, limit: 1 }.is_fatal());
    assert!(!SnapError::Timeout {
        stage: "database replay".into(),
        after: Duration::from_secs(2)
    }
    .is_fatal());
}

#[test]
fn test_kind_mapping() {
    assert_eq!(SnapError::validation("x").kind(), ErrorKind::Validation);
    assert_eq!(SnapError::ExportBlocked.kind(), ErrorKind::Gate);
    assert_eq!(SnapError::DecisionCancelled.kind(), ErrorKind::Cancelled);

    let io: SnapError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
    assert_eq!(io.kind(), ErrorKind::Backend);

    let json: SnapError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert_eq!(json.kind(), ErrorKind::Format);
}

#[test]
fn test_retryable_only_for_marked_backend_errors() {
    let locked = SnapError::Backend {
        operation: "reading catalog".into(),
        message: "locked".into(),
        retryable: true,
    };
    assert!(locked.is_retryable());
    assert!(!SnapError::backend("reading catalog", "corrupt").is_retryable());
}
