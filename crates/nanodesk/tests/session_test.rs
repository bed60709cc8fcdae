//! Integration tests for sandbox creation, kill and session state.

use nanodesk::testing::FakeDesktop;
use nanodesk::{CallError, Error, Operation, Scope, SessionState};
use std::time::{Duration, SystemTime};

#[tokio::test]
async fn test_create_returns_ready_sandbox() {
    let fake = FakeDesktop::new().with_pending_polls(3);
    let client = fake.client(&fake.config()).await.expect("Failed to connect");

    let before = SystemTime::now();
    let sandbox = client.sandbox().create().await.expect("Failed to create sandbox");

    assert_eq!(sandbox.state(), SessionState::Ready);
    assert_eq!(sandbox.display(), ":0");
    assert!(sandbox.created_at() >= before);
    assert_eq!(fake.sandbox_ids(), vec![sandbox.sandbox_id().clone()]);
    assert_eq!(fake.calls("status"), 4);
}

#[tokio::test]
async fn test_create_sends_options() {
    let fake = FakeDesktop::new();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");

    let sandbox = client
        .sandbox()
        .template("desktop-xfce")
        .resolution(1280, 800)
        .dpi(120)
        .env("LANG", "en_US.UTF-8")
        .metadata("suite", "integration")
        .lifetime(Duration::from_secs(600))
        .create()
        .await
        .expect("Failed to create sandbox");

    let spec = fake
        .create_spec(sandbox.sandbox_id())
        .expect("Sandbox missing from fake");
    assert_eq!(spec.template, "desktop-xfce");
    assert_eq!(spec.resolution, (1280, 800));
    assert_eq!(spec.dpi, 120);
    assert_eq!(spec.lifetime_secs, Some(600));
    assert_eq!(spec.envs.get("LANG").map(String::as_str), Some("en_US.UTF-8"));
    assert_eq!(spec.envs.get("DISPLAY").map(String::as_str), Some(":0"));
    assert_eq!(spec.metadata.get("suite").map(String::as_str), Some("integration"));

    let size = sandbox.get_screen_size().await.expect("Failed to get size");
    assert_eq!(size, (1280, 800));
}

#[tokio::test]
async fn test_create_rejects_invalid_options_locally() {
    let fake = FakeDesktop::new();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");

    let err = client
        .sandbox()
        .resolution(0, 600)
        .create()
        .await
        .expect_err("Zero width should be rejected");

    assert!(matches!(
        err,
        Error::Validation {
            op: Operation::Create,
            scope: Scope::Client,
            ..
        }
    ));
    assert_eq!(fake.calls("create"), 0);
}

#[tokio::test]
async fn test_create_times_out_when_never_ready() {
    let fake = FakeDesktop::new().never_ready();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");

    let err = client
        .sandbox()
        .ready_timeout(Duration::from_millis(300))
        .create()
        .await
        .expect_err("Creation should time out");

    match err {
        Error::Timeout { op, after, .. } => {
            assert_eq!(op, Operation::Create);
            assert_eq!(after, Duration::from_millis(300));
        }
        other => panic!("Expected timeout, got {other:?}"),
    }
    assert!(fake.calls("status") >= 1);
}

#[tokio::test]
async fn test_create_fails_when_killed_while_pending() {
    let fake = FakeDesktop::new().with_pending_polls(50);
    let client = fake.client(&fake.config()).await.expect("Failed to connect");

    let creating = tokio::spawn({
        let client = client.clone();
        async move { client.sandbox().create().await }
    });

    let id = loop {
        if let Some(id) = fake.sandbox_ids().pop() {
            break id;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    fake.expire(&id);

    let err = creating
        .await
        .expect("Task panicked")
        .expect_err("Creation should fail");
    assert!(matches!(err, Error::State { op: Operation::Create, .. }));
}

#[tokio::test]
async fn test_kill_twice_succeeds() {
    let fake = FakeDesktop::new();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");
    let sandbox = client.sandbox().create().await.expect("Failed to create sandbox");

    sandbox.kill().await.expect("First kill failed");
    sandbox.kill().await.expect("Second kill failed");

    assert_eq!(sandbox.state(), SessionState::Killed);
    assert!(fake.is_killed(sandbox.sandbox_id()));
    assert_eq!(fake.calls("kill"), 1);
}

#[tokio::test]
async fn test_operations_after_kill_fail_locally() {
    let fake = FakeDesktop::new();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");
    let sandbox = client.sandbox().create().await.expect("Failed to create sandbox");

    sandbox.kill().await.expect("Kill failed");
    let calls_after_kill = fake.total_calls();

    let err = sandbox.move_mouse(10, 10).await.expect_err("Move should fail");
    assert!(matches!(err, Error::State { op: Operation::MoveMouse, .. }));

    let err = sandbox
        .files()
        .read("/home/user/a.txt")
        .await
        .expect_err("Read should fail");
    assert!(matches!(err, Error::State { op: Operation::ReadFile, .. }));

    let err = sandbox
        .stream()
        .start(Default::default())
        .await
        .expect_err("Stream start should fail");
    assert!(matches!(err, Error::State { op: Operation::StreamStart, .. }));

    assert_eq!(fake.total_calls(), calls_after_kill);
}

#[tokio::test]
async fn test_expired_sandbox_becomes_killed() {
    let fake = FakeDesktop::new();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");
    let sandbox = client.sandbox().create().await.expect("Failed to create sandbox");

    fake.expire(sandbox.sandbox_id());

    let err = sandbox.left_click().await.expect_err("Click should fail");
    assert!(matches!(err, Error::State { op: Operation::Click, .. }));
    assert_eq!(sandbox.state(), SessionState::Killed);

    sandbox.kill().await.expect("Kill of expired sandbox should succeed");
}

#[tokio::test]
async fn test_wrong_api_key_is_rejected() {
    let fake = FakeDesktop::new().with_api_key("nd_test_right");
    let config = fake.config().with_api_key("nd_test_wrong");

    let err = fake.client(&config).await.expect_err("Auth should fail");
    assert!(matches!(
        err,
        Error::Auth {
            op: Operation::Connect,
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_api_key_fails_first_call() {
    let fake = FakeDesktop::new().with_api_key("nd_test_right");
    let mut config = fake.config();
    config.api_key = None;

    let client = fake.client(&config).await.expect("Client builds without a key");
    let err = client.sandbox().create().await.expect_err("Create should fail");
    assert!(matches!(err, Error::Auth { op: Operation::Create, .. }));
}

#[tokio::test]
async fn test_backend_error_kinds_are_preserved() {
    let fake = FakeDesktop::new();
    let client = fake.client(&fake.config()).await.expect("Failed to connect");
    let sandbox = client.sandbox().create().await.expect("Failed to create sandbox");

    fake.fail_next("screenshot", CallError::Transport("connection reset".into()));
    let err = sandbox
        .screenshot(Default::default())
        .await
        .expect_err("Screenshot should fail");
    match err {
        Error::Transport { op, scope, reason } => {
            assert_eq!(op, Operation::Screenshot);
            assert_eq!(scope, Scope::Sandbox(sandbox.sandbox_id().clone()));
            assert!(reason.contains("connection reset"));
        }
        other => panic!("Expected transport error, got {other:?}"),
    }

    assert_eq!(sandbox.state(), SessionState::Ready);
}
