//! Integration tests for scan-scoped channels
//!
//! One job, one socket: rebinding closes the previous channel with the
//! normal code, completion surfaces in-band, disposal is idempotent.

mod common;

use common::{wait_until, MockNotifyServer};
use scansocket::{ConnectionState, ScanAffinityController, ScanOutcome, StaticToken};
use serde_json::json;
use std::time::Duration;

/// Macro for verbose test output
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Poll for the completion outcome until the timeout expires
async fn wait_for_outcome(
    controller: &ScanAffinityController,
    timeout: Duration,
) -> Option<ScanOutcome> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Some(outcome) = controller.try_recv_outcome() {
            return Some(outcome);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

#[tokio::test]
async fn test_scoped_uri_carries_the_job_id() {
    verbose_println!("Testing scoped endpoint construction...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"));

    assert!(controller.bind_to_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || controller.is_watching()
        && controller.status() == ConnectionState::Open)
    .await);

    assert!(wait_until(Duration::from_secs(2), || server.uris().len() == 1).await);
    assert_eq!(server.uris()[0], "/ws/notifications?token=tok&scan_id=scan-1");
    assert_eq!(controller.job_id(), Some("scan-1"));

    controller.dispose().await;
}

#[tokio::test]
async fn test_rebind_closes_the_previous_channel_with_normal_code() {
    verbose_println!("Testing close-before-rebind...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"));

    assert!(controller.bind_to_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    // Binding the next job must tear the scan-1 channel down first
    assert!(controller.bind_to_job("scan-2").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    assert!(
        wait_until(Duration::from_secs(2), || server.close_codes().len() == 1).await,
        "the old channel should close before the new one opens"
    );
    assert_eq!(
        server.close_codes()[0],
        Some(1000),
        "rebind closes intentionally, never abnormally"
    );
    assert!(wait_until(Duration::from_secs(2), || server.uris().len() == 2).await);
    assert_eq!(server.uris()[1], "/ws/notifications?token=tok&scan_id=scan-2");
    assert_eq!(controller.job_id(), Some("scan-2"));

    // The intentional close must not come back as a retry
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(server.connection_count(), 2);

    controller.dispose().await;
}

#[tokio::test]
async fn test_completion_surfaces_once_without_forcing_a_close() {
    verbose_println!("Testing completion detection...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"));

    assert!(controller.bind_to_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    server.push(
        &json!({
            "type": "scan_complete",
            "notification": {
                "message": "Scan finished: 3 findings",
                "data": { "scan_id": "scan-1" }
            }
        })
        .to_string(),
    );

    let outcome = wait_for_outcome(&controller, Duration::from_secs(2)).await;
    let outcome = outcome.expect("the completion must surface");
    assert_eq!(outcome.scan_id.as_deref(), Some("scan-1"));
    assert_eq!(outcome.message.as_deref(), Some("Scan finished: 3 findings"));
    assert!(controller.try_recv_outcome().is_none(), "only one outcome");

    // The backend owns the teardown; the controller must not force-close
    assert!(controller.is_watching());
    assert_eq!(server.close_codes().len(), 0);

    // A repeated completion is dropped while ordinary traffic keeps flowing
    server.push(r#"{"type":"scan_complete","scan_id":"scan-1"}"#);
    server.push(r#"{"type":"scan_progress","step":9}"#);
    let mut relayed = Vec::new();
    assert!(
        wait_until(Duration::from_secs(2), || {
            while let Some(frame) = controller.try_recv_progress() {
                relayed.push(frame);
            }
            !relayed.is_empty()
        })
        .await
    );
    assert_eq!(relayed.len(), 1, "the repeated completion must not be relayed");
    assert_eq!(relayed[0]["step"], 9);
    assert!(controller.try_recv_outcome().is_none());

    controller.dispose().await;
}

#[tokio::test]
async fn test_completion_matches_on_owning_repository() {
    verbose_println!("Testing repository-id completion matching...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"))
            .for_repository("repo-9");

    assert!(controller.bind_to_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    // The backend reports a different scan id but the same repository
    server.push(
        &json!({
            "type": "scan_complete",
            "notification": { "data": { "scan_id": "scan-77", "repository_id": "repo-9" } }
        })
        .to_string(),
    );

    let outcome = wait_for_outcome(&controller, Duration::from_secs(2)).await;
    assert!(outcome.is_some(), "a repository match counts as completion");
    assert_eq!(outcome.unwrap().repository_id.as_deref(), Some("repo-9"));

    controller.dispose().await;
}

#[tokio::test]
async fn test_progress_frames_relay_in_order() {
    verbose_println!("Testing progress relay...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"));

    assert!(controller.bind_to_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    for step in 0..3 {
        server.push(&json!({ "type": "scan_progress", "step": step }).to_string());
    }

    let mut received = Vec::new();
    assert!(
        wait_until(Duration::from_secs(2), || {
            while let Some(frame) = controller.try_recv_progress() {
                received.push(frame);
            }
            received.len() >= 3
        })
        .await
    );
    for (i, frame) in received.iter().enumerate() {
        assert_eq!(frame["step"], i, "progress frames must keep arrival order");
    }
    assert!(controller.try_recv_outcome().is_none());

    controller.dispose().await;
}

#[tokio::test]
async fn test_dispose_closes_the_channel_and_is_idempotent() {
    verbose_println!("Testing disposal...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"));

    assert!(controller.bind_to_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    controller.dispose().await;
    assert_eq!(controller.status(), ConnectionState::Idle);
    assert_eq!(controller.job_id(), None);
    assert!(!controller.is_watching());

    assert!(
        wait_until(Duration::from_secs(2), || server.close_codes().len() == 1).await
    );
    assert_eq!(server.close_codes()[0], Some(1000));

    // Disposing again must be harmless
    controller.dispose().await;
    assert_eq!(controller.status(), ConnectionState::Idle);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_adopting_the_watched_job_is_a_noop() {
    verbose_println!("Testing adoption of a running job...");

    let server = MockNotifyServer::start().await;
    let mut controller =
        ScanAffinityController::new(server.backend_url(), StaticToken::new("tok"));

    assert!(controller.adopt_running_job("scan-1").await);
    assert!(wait_until(Duration::from_secs(2), || {
        controller.status() == ConnectionState::Open
    })
    .await);

    // Same job, live channel: nothing to do
    assert!(!controller.adopt_running_job("scan-1").await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), 1);

    // A different job rebinds like bind_to_job would
    assert!(controller.adopt_running_job("scan-2").await);
    assert!(
        wait_until(Duration::from_secs(2), || server.connection_count() == 2).await
    );
    assert!(
        wait_until(Duration::from_secs(2), || server.close_codes().len() == 1).await
    );
    assert_eq!(server.close_codes()[0], Some(1000));
    assert_eq!(controller.job_id(), Some("scan-2"));

    controller.dispose().await;
}
