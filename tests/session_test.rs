//! Session tests
//!
//! Reconnect-on-auth behaviour, logout bookkeeping and error wrapping.

mod common;

use common::{healthy_bmc, session, MockBmc, MockConnector};
use redfish_exporter::error::ExporterError;
use redfish_exporter::redfish::types::{Collection, SYSTEMS};

#[tokio::test]
async fn test_call_reads_and_deserializes_resource() {
    // Given: A session against a healthy BMC
    let connector = MockConnector::single("bmc-1", healthy_bmc());
    let session = session(&connector, "bmc-1").await;

    // When: Reading the systems collection
    let systems: Collection = session.call(SYSTEMS).await.expect("read should succeed");

    // Then: The collection is decoded and exactly one connection was made
    assert_eq!(systems.members.len(), 1);
    assert_eq!(systems.members[0].odata_id, "/redfish/v1/Systems/1");
    assert_eq!(connector.connects("bmc-1"), 1);
    assert_eq!(session.target(), "bmc-1");
}

#[tokio::test]
async fn test_expired_session_reconnects_once_and_retries() {
    // Given: A BMC whose first session has expired
    let connector = MockConnector::single("bmc-1", healthy_bmc().expire_first(1));
    let session = session(&connector, "bmc-1").await;

    // When: Reading a resource
    let systems: Collection = session.call(SYSTEMS).await.expect("retry should succeed");

    // Then: The read succeeds on a fresh connection
    assert_eq!(systems.members.len(), 1);
    assert_eq!(connector.connects("bmc-1"), 2);

    // And: The old connection was logged out exactly once, the new one not at all
    assert_eq!(connector.logouts("bmc-1"), vec![0]);

    // And: The path was read twice, once per connection
    assert_eq!(connector.requests("bmc-1"), vec![SYSTEMS, SYSTEMS]);
}

#[tokio::test]
async fn test_failed_reconnect_reports_both_errors() {
    // Given: An expired session and a BMC refusing new connections
    let connector = MockConnector::single(
        "bmc-1",
        healthy_bmc().expire_first(1).refuse_reconnect(),
    );
    let session = session(&connector, "bmc-1").await;

    // When: Reading a resource
    let error = session
        .call::<Collection>(SYSTEMS)
        .await
        .expect_err("read should fail");

    // Then: The error carries the original auth failure and the reconnect failure
    match &error {
        ExporterError::Reconnect {
            original,
            reconnect,
        } => {
            assert!(matches!(original.as_ref(), ExporterError::Auth(_)));
            assert!(matches!(reconnect.as_ref(), ExporterError::Connect(_)));
        }
        other => panic!("expected Reconnect error, got {:?}", other),
    }
    let message = error.to_string();
    assert!(message.contains("Failed to reconnect"));
    assert!(message.contains("original error"));
}

#[tokio::test]
async fn test_still_unauthorized_after_reconnect_is_not_retried_again() {
    // Given: A BMC whose first two sessions are rejected
    let connector = MockConnector::single("bmc-1", healthy_bmc().expire_first(2));
    let session = session(&connector, "bmc-1").await;

    // When: Reading a resource
    let error = session
        .call::<Collection>(SYSTEMS)
        .await
        .expect_err("second rejection should surface");

    // Then: Only one reconnect was attempted
    assert_eq!(connector.connects("bmc-1"), 2);
    assert!(matches!(error, ExporterError::Transport(_)));
    assert!(!error.is_auth());
}

#[tokio::test]
async fn test_non_auth_errors_do_not_reconnect() {
    // Given: A BMC where the systems collection fails
    let connector = MockConnector::single("bmc-1", healthy_bmc().failing(SYSTEMS));
    let session = session(&connector, "bmc-1").await;

    // When: Reading that resource
    let error = session.call::<Collection>(SYSTEMS).await.expect_err("read should fail");

    // Then: The error is passed through without a reconnect
    assert!(matches!(error, ExporterError::Transport(_)));
    assert_eq!(connector.connects("bmc-1"), 1);
    assert!(connector.logouts("bmc-1").is_empty());
}

#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let connector = MockConnector::single("bmc-1", MockBmc::new());
    let session = session(&connector, "bmc-1").await;

    let error = session
        .call::<Collection>("/redfish/v1/Nope")
        .await
        .expect_err("unknown path");

    assert!(matches!(error, ExporterError::NotFound(_)));
}

#[tokio::test]
async fn test_close_logs_out_exactly_once() {
    // Given: An open session
    let connector = MockConnector::single("bmc-1", healthy_bmc());
    let session = session(&connector, "bmc-1").await;

    // When: Closing it twice
    session.close().await;
    session.close().await;

    // Then: Only one logout reached the BMC
    assert_eq!(connector.logouts("bmc-1"), vec![0]);
}

#[tokio::test]
async fn test_call_after_close_reconnects() {
    // Given: A closed session
    let connector = MockConnector::single("bmc-1", healthy_bmc());
    let session = session(&connector, "bmc-1").await;
    session.close().await;

    // When: Reading again
    let systems: Collection = session.call(SYSTEMS).await.expect("read should succeed");

    // Then: A new connection was opened for the read
    assert_eq!(systems.members.len(), 1);
    assert_eq!(connector.connects("bmc-1"), 2);
}

#[tokio::test]
async fn test_explicit_reconnect_replaces_connection() {
    let connector = MockConnector::single("bmc-1", healthy_bmc());
    let session = session(&connector, "bmc-1").await;

    session.reconnect().await.expect("reconnect should succeed");

    assert_eq!(connector.connects("bmc-1"), 2);
    assert_eq!(connector.logouts("bmc-1"), vec![0]);
}
