//! Mouse and keyboard input.
//!
//! Input is delivered through the session's ordering guard: every action
//! is acknowledged by the backend before the next one is sent, so a click
//! issued after `move_mouse(x, y)` lands at `(x, y)`.

use crate::session::{Sandbox, Sequenced};
use nanodesk_core::{
    CursorPosition, InputAction, MouseButton, Operation, Result, ScreenSize, ScrollDirection,
};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Characters sent per typing request.
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Delay between keystrokes while typing.
pub const DEFAULT_TYPE_DELAY: Duration = Duration::from_millis(75);

/// Serializes input on one session and remembers what the backend confirmed.
pub(crate) struct InputController {
    state: Mutex<InputState>,
}

pub(crate) struct InputState {
    /// Bounds for pointer coordinates.
    pub(crate) screen: ScreenSize,
    /// Last pointer position the backend acknowledged, if known.
    pub(crate) cursor: Option<CursorPosition>,
}

impl InputController {
    pub(crate) fn new(screen: ScreenSize) -> Self {
        Self {
            state: Mutex::new(InputState {
                screen,
                cursor: None,
            }),
        }
    }

    /// Waits for exclusive access. Waiters are served in FIFO order.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, InputState> {
        self.state.lock().await
    }
}

/// How [`Sandbox::write_text_with`] splits and paces text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeOptions {
    /// Characters per request. Must be greater than zero.
    pub chunk_size: usize,
    /// Delay between keystrokes.
    pub delay: Duration,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delay: DEFAULT_TYPE_DELAY,
        }
    }
}

impl TypeOptions {
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Sequenced<'_> {
    async fn move_to(&mut self, op: Operation, to: CursorPosition) -> Result<()> {
        let screen = self.input.screen;
        if !screen.contains(to.x, to.y) {
            return Err(self.invalid(
                op,
                format!("({}, {}) is outside the {} screen", to.x, to.y, screen),
            ));
        }
        self.dispatch(op, InputAction::MoveMouse { to }).await?;
        self.input.cursor = Some(to);
        Ok(())
    }

    async fn dispatch(&self, op: Operation, action: InputAction) -> Result<()> {
        let session = self.session;
        self.call(op, session.transport().input(session.id(), action))
            .await
    }
}

impl Sandbox {
    /// Moves the pointer to `(x, y)`.
    ///
    /// Coordinates outside `[0, width) × [0, height)` are rejected before
    /// anything is sent.
    pub async fn move_mouse(&self, x: i32, y: i32) -> Result<()> {
        let op = Operation::MoveMouse;
        let mut seq = self.inner().sequence(op).await?;
        seq.move_to(op, CursorPosition::new(x, y)).await
    }

    /// Returns the pointer position as reported by the backend.
    pub async fn get_cursor_position(&self) -> Result<CursorPosition> {
        let op = Operation::GetCursorPosition;
        let mut seq = self.inner().sequence(op).await?;
        let inner = self.inner();
        let position = seq
            .call(op, inner.transport().cursor_position(inner.id()))
            .await?;
        seq.input.cursor = Some(position);
        Ok(position)
    }

    /// Last pointer position the backend acknowledged, without a round trip.
    ///
    /// `None` until a move or a cursor query has completed on this handle.
    pub async fn last_known_cursor(&self) -> Option<CursorPosition> {
        self.inner().input.lock().await.cursor
    }

    /// Clicks `button` `repeat` times at the current pointer position.
    pub async fn click(&self, button: MouseButton, repeat: u32) -> Result<()> {
        let op = Operation::Click;
        let seq = self.inner().sequence(op).await?;
        if repeat == 0 {
            return Err(seq.invalid(op, "repeat must be at least 1"));
        }
        seq.dispatch(op, InputAction::Click { button, repeat }).await
    }

    pub async fn left_click(&self) -> Result<()> {
        self.click(MouseButton::Left, 1).await
    }

    pub async fn right_click(&self) -> Result<()> {
        self.click(MouseButton::Right, 1).await
    }

    pub async fn middle_click(&self) -> Result<()> {
        self.click(MouseButton::Middle, 1).await
    }

    pub async fn double_click(&self) -> Result<()> {
        self.click(MouseButton::Left, 2).await
    }

    /// Moves to `(x, y)` and clicks there without letting other operations
    /// on this sandbox run in between.
    pub async fn click_at(&self, button: MouseButton, x: i32, y: i32) -> Result<()> {
        let mut seq = self.inner().sequence(Operation::Click).await?;
        seq.move_to(Operation::MoveMouse, CursorPosition::new(x, y))
            .await?;
        seq.dispatch(Operation::Click, InputAction::Click { button, repeat: 1 })
            .await
    }

    /// Holds `button` down until [`mouse_release`](Self::mouse_release).
    pub async fn mouse_press(&self, button: MouseButton) -> Result<()> {
        let op = Operation::MousePress;
        let seq = self.inner().sequence(op).await?;
        seq.dispatch(op, InputAction::ButtonDown { button }).await
    }

    pub async fn mouse_release(&self, button: MouseButton) -> Result<()> {
        let op = Operation::MouseRelease;
        let seq = self.inner().sequence(op).await?;
        seq.dispatch(op, InputAction::ButtonUp { button }).await
    }

    /// Drags with the left button from `from` to `to`.
    pub async fn drag(
        &self,
        from: impl Into<CursorPosition>,
        to: impl Into<CursorPosition>,
    ) -> Result<()> {
        let (from, to) = (from.into(), to.into());
        let mut seq = self.inner().sequence(Operation::MoveMouse).await?;
        let screen = seq.input.screen;
        if !screen.contains(to.x, to.y) {
            return Err(seq.invalid(
                Operation::MoveMouse,
                format!("drag target ({}, {}) is outside the {} screen", to.x, to.y, screen),
            ));
        }

        let button = MouseButton::Left;
        seq.move_to(Operation::MoveMouse, from).await?;
        seq.dispatch(Operation::MousePress, InputAction::ButtonDown { button })
            .await?;
        seq.move_to(Operation::MoveMouse, to).await?;
        seq.dispatch(Operation::MouseRelease, InputAction::ButtonUp { button })
            .await
    }

    /// Scrolls by `amount` wheel clicks.
    pub async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<()> {
        let op = Operation::Scroll;
        let seq = self.inner().sequence(op).await?;
        if amount == 0 {
            return Err(seq.invalid(op, "amount must be at least 1"));
        }
        seq.dispatch(op, InputAction::Scroll { direction, amount })
            .await
    }

    /// Types `text` into the focused window.
    pub async fn write_text(&self, text: &str) -> Result<()> {
        self.write_text_with(text, TypeOptions::default()).await
    }

    /// Types `text` in chunks of `options.chunk_size` characters.
    ///
    /// All chunks are sent within one turn; nothing else on this sandbox
    /// interleaves with them.
    pub async fn write_text_with(&self, text: &str, options: TypeOptions) -> Result<()> {
        let op = Operation::WriteText;
        let seq = self.inner().sequence(op).await?;
        if options.chunk_size == 0 {
            return Err(seq.invalid(op, "chunk size must be at least 1"));
        }

        let delay_ms = options.delay.as_millis() as u64;
        for chunk in chunks(text, options.chunk_size) {
            seq.dispatch(
                op,
                InputAction::TypeText {
                    text: chunk,
                    delay_ms,
                },
            )
            .await?;
        }
        Ok(())
    }

    /// Presses and releases a single key, e.g. `"enter"` or `"a"`.
    pub async fn press(&self, key: &str) -> Result<()> {
        self.press_combo(&[key]).await
    }

    /// Presses keys together, e.g. `["ctrl", "c"]`.
    ///
    /// Common names such as `ctrl`, `enter` or `esc` are translated to X
    /// keysyms; anything else is sent lowercased.
    pub async fn press_combo(&self, keys: &[&str]) -> Result<()> {
        let op = Operation::Press;
        let seq = self.inner().sequence(op).await?;
        if keys.is_empty() {
            return Err(seq.invalid(op, "at least one key is required"));
        }
        if keys.iter().any(|key| key.trim().is_empty()) {
            return Err(seq.invalid(op, "key names must not be empty"));
        }

        let keys = keys.iter().map(|key| map_key(key)).collect();
        seq.dispatch(op, InputAction::KeyCombo { keys }).await
    }
}

fn chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Translates a friendly key name to an X keysym.
fn map_key(key: &str) -> String {
    let lower = key.trim().to_lowercase();
    let keysym = match lower.as_str() {
        "alt" | "alt_left" => "Alt_L",
        "alt_right" => "Alt_R",
        "backspace" => "BackSpace",
        "break" | "pause" => "Pause",
        "caps_lock" => "Caps_Lock",
        "cmd" | "command" | "super" | "super_left" | "win" | "windows" => "Super_L",
        "super_right" => "Super_R",
        "control" | "control_left" | "ctrl" => "Control_L",
        "control_right" => "Control_R",
        "del" | "delete" => "Delete",
        "down" => "Down",
        "end" => "End",
        "enter" => "Return",
        "esc" | "escape" => "Escape",
        "f1" => "F1",
        "f2" => "F2",
        "f3" => "F3",
        "f4" => "F4",
        "f5" => "F5",
        "f6" => "F6",
        "f7" => "F7",
        "f8" => "F8",
        "f9" => "F9",
        "f10" => "F10",
        "f11" => "F11",
        "f12" => "F12",
        "home" => "Home",
        "insert" => "Insert",
        "left" => "Left",
        "menu" => "Menu",
        "meta" => "Meta_L",
        "num_lock" => "Num_Lock",
        "page_down" => "Page_Down",
        "page_up" => "Page_Up",
        "print" => "Print",
        "right" => "Right",
        "scroll_lock" => "Scroll_Lock",
        "shift" | "shift_left" => "Shift_L",
        "shift_right" => "Shift_R",
        "space" => "space",
        "tab" => "Tab",
        "up" => "Up",
        _ => return lower,
    };
    keysym.to_string()
}
