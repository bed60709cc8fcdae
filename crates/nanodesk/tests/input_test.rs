//! Integration tests for mouse and keyboard input.

use nanodesk::testing::FakeDesktop;
use nanodesk::{
    ClientConfig, CursorPosition, Error, InputAction, MouseButton, Operation, Sandbox,
    ScrollDirection, TypeOptions,
};
use std::time::Duration;

async fn ready_sandbox(fake: &FakeDesktop, config: &ClientConfig) -> Sandbox {
    let client = fake.client(config).await.expect("Failed to connect");
    client.sandbox().create().await.expect("Failed to create sandbox")
}

#[tokio::test]
async fn test_cursor_starts_at_center() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    let size = sandbox.get_screen_size().await.expect("Failed to get size");
    let cursor = sandbox.get_cursor_position().await.expect("Failed to get cursor");

    assert_eq!(size, (1024, 768));
    assert_eq!(cursor, (512, 384));
}

#[tokio::test]
async fn test_move_then_get_position_round_trips() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    sandbox.move_mouse(100, 200).await.expect("Failed to move");
    let cursor = sandbox.get_cursor_position().await.expect("Failed to get cursor");

    assert_eq!(cursor, (100, 200));
}

#[tokio::test]
async fn test_out_of_bounds_move_is_rejected_before_dispatch() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    for (x, y) in [(1024, 10), (10, 768), (-1, 0), (0, -1)] {
        let err = sandbox.move_mouse(x, y).await.expect_err("Move should fail");
        assert!(
            matches!(err, Error::Validation { op: Operation::MoveMouse, .. }),
            "unexpected error for ({x}, {y}): {err}"
        );
    }

    assert_eq!(fake.calls("input"), 0);
    sandbox.move_mouse(1023, 767).await.expect("Corner is on screen");
}

#[tokio::test]
async fn test_click_lands_where_mouse_moved() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    sandbox.move_mouse(300, 300).await.expect("Failed to move");
    sandbox.right_click().await.expect("Failed to click");

    assert!(fake.menu_open(sandbox.sandbox_id()));
    assert_eq!(
        fake.input_log(sandbox.sandbox_id()),
        vec![
            InputAction::MoveMouse {
                to: CursorPosition::new(300, 300)
            },
            InputAction::Click {
                button: MouseButton::Right,
                repeat: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_concurrent_calls_apply_in_issue_order() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    let (moved, clicked) = tokio::join!(sandbox.move_mouse(40, 50), sandbox.left_click());
    moved.expect("Failed to move");
    clicked.expect("Failed to click");

    let log = fake.input_log(sandbox.sandbox_id());
    assert_eq!(log.len(), 2);
    assert!(matches!(log[0], InputAction::MoveMouse { .. }));
    assert!(matches!(log[1], InputAction::Click { .. }));
}

#[tokio::test]
async fn test_click_helpers_send_expected_buttons() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    sandbox.left_click().await.expect("left");
    sandbox.middle_click().await.expect("middle");
    sandbox.double_click().await.expect("double");
    sandbox.click_at(MouseButton::Right, 10, 700).await.expect("click_at");

    let log = fake.input_log(sandbox.sandbox_id());
    assert_eq!(
        log,
        vec![
            InputAction::Click {
                button: MouseButton::Left,
                repeat: 1
            },
            InputAction::Click {
                button: MouseButton::Middle,
                repeat: 1
            },
            InputAction::Click {
                button: MouseButton::Left,
                repeat: 2
            },
            InputAction::MoveMouse {
                to: CursorPosition::new(10, 700)
            },
            InputAction::Click {
                button: MouseButton::Right,
                repeat: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_drag_presses_moves_and_releases() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    sandbox.drag((10, 40), (200, 240)).await.expect("Failed to drag");

    let button = MouseButton::Left;
    assert_eq!(
        fake.input_log(sandbox.sandbox_id()),
        vec![
            InputAction::MoveMouse {
                to: CursorPosition::new(10, 40)
            },
            InputAction::ButtonDown { button },
            InputAction::MoveMouse {
                to: CursorPosition::new(200, 240)
            },
            InputAction::ButtonUp { button },
        ]
    );
}

#[tokio::test]
async fn test_drag_to_off_screen_target_sends_nothing() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    let err = sandbox
        .drag((10, 40), (5000, 40))
        .await
        .expect_err("Drag should fail");
    assert!(matches!(err, Error::Validation { .. }));
    assert!(fake.input_log(sandbox.sandbox_id()).is_empty());
}

#[tokio::test]
async fn test_write_text_is_chunked() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    let options = TypeOptions::default()
        .chunk_size(4)
        .delay(Duration::from_millis(5));
    sandbox
        .write_text_with("hello world", options)
        .await
        .expect("Failed to type");

    let chunks: Vec<_> = fake
        .input_log(sandbox.sandbox_id())
        .into_iter()
        .map(|action| match action {
            InputAction::TypeText { text, delay_ms } => {
                assert_eq!(delay_ms, 5);
                text
            }
            other => panic!("Unexpected action {other:?}"),
        })
        .collect();
    assert_eq!(chunks, vec!["hell", "o wo", "rld"]);
    assert_eq!(fake.typed_text(sandbox.sandbox_id()), "hello world");
}

#[tokio::test]
async fn test_press_maps_key_names() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    sandbox.press("enter").await.expect("Failed to press");
    sandbox.press_combo(&["ctrl", "C"]).await.expect("Failed to press combo");

    assert_eq!(
        fake.input_log(sandbox.sandbox_id()),
        vec![
            InputAction::KeyCombo {
                keys: vec!["Return".to_string()]
            },
            InputAction::KeyCombo {
                keys: vec!["Control_L".to_string(), "c".to_string()]
            },
        ]
    );
}

#[tokio::test]
async fn test_empty_key_combo_is_rejected() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    let err = sandbox.press_combo(&[]).await.expect_err("Should fail");
    assert!(matches!(err, Error::Validation { op: Operation::Press, .. }));
}

#[tokio::test]
async fn test_scroll_and_buttons() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;

    sandbox.scroll(ScrollDirection::Up, 3).await.expect("Failed to scroll");
    sandbox.mouse_press(MouseButton::Middle).await.expect("Failed to press");
    sandbox
        .mouse_release(MouseButton::Middle)
        .await
        .expect("Failed to release");

    let err = sandbox
        .scroll(ScrollDirection::Down, 0)
        .await
        .expect_err("Zero scroll should fail");
    assert!(matches!(err, Error::Validation { op: Operation::Scroll, .. }));
    assert_eq!(fake.input_log(sandbox.sandbox_id()).len(), 3);
}

#[tokio::test]
async fn test_slow_input_times_out_without_retry() {
    let fake = FakeDesktop::new().with_input_delay(Duration::from_secs(2));
    let config = fake
        .config()
        .with_request_timeout(Duration::from_millis(200));
    let sandbox = ready_sandbox(&fake, &config).await;

    let err = sandbox.move_mouse(5, 5).await.expect_err("Move should time out");

    match err {
        Error::Timeout { op, after, .. } => {
            assert_eq!(op, Operation::MoveMouse);
            assert_eq!(after, Duration::from_millis(200));
        }
        other => panic!("Expected timeout, got {other:?}"),
    }
    assert_eq!(fake.calls("input"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_input_within_request_timeout_succeeds() {
    let fake = FakeDesktop::new().with_input_delay(Duration::from_secs(11));
    let config = fake
        .config()
        .with_request_timeout(Duration::from_secs(30));
    let sandbox = ready_sandbox(&fake, &config).await;

    sandbox
        .move_mouse(5, 5)
        .await
        .expect("Move within the request timeout should succeed");

    assert_eq!(fake.cursor(sandbox.sandbox_id()), Some(CursorPosition::new(5, 5)));
    assert_eq!(fake.calls("input"), 1);
}

#[tokio::test]
async fn test_last_known_cursor_tracks_acknowledged_moves() {
    let fake = FakeDesktop::new();
    let sandbox = ready_sandbox(&fake, &fake.config()).await;
    assert_eq!(sandbox.last_known_cursor().await, None);

    sandbox.move_mouse(40, 60).await.expect("Failed to move");
    assert_eq!(sandbox.last_known_cursor().await, Some(CursorPosition::new(40, 60)));

    let err = sandbox.move_mouse(5000, 5).await.expect_err("Off-screen move should fail");
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(sandbox.last_known_cursor().await, Some(CursorPosition::new(40, 60)));

    let remote = sandbox.get_cursor_position().await.expect("Failed to get cursor");
    assert_eq!(sandbox.last_known_cursor().await, Some(remote));
}
