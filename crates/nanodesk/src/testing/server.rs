//! Protocol side of the fake backend.

use super::framebuffer::{encode_png, menu_at, render};
use super::{FakeDesktop, FakeSandbox, FakeState, FakeStream};
use nanodesk_core::{
    AuthKey, CallError, CreateSpec, CursorPosition, FileContent, InputAction, MouseButton,
    SandboxId, SandboxStatus, ScreenSize, ScreenshotFormat, StreamOptions, WindowId,
};
use nanodesk_protocol::{DesktopService, RpcResult};
use std::sync::Arc;
use std::sync::MutexGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use tarpc::context::Context;

/// One client connection; authentication is per connection.
#[derive(Clone)]
pub(super) struct FakeConnection {
    desktop: FakeDesktop,
    authenticated: Arc<AtomicBool>,
}

impl FakeConnection {
    pub(super) fn new(desktop: FakeDesktop) -> Self {
        Self {
            desktop,
            authenticated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Records the call and applies auth and injected failures.
    fn enter(&self, method: &'static str) -> RpcResult<MutexGuard<'_, FakeState>> {
        let mut state = self.desktop.state();
        *state.calls.entry(method).or_insert(0) += 1;

        if state.api_key.is_some() && !self.authenticated.load(Ordering::SeqCst) {
            return Err(CallError::Unauthorized(
                "connection is not authenticated".to_string(),
            ));
        }
        if let Some(error) = state.failures.remove(method) {
            return Err(error);
        }
        Ok(state)
    }
}

impl FakeState {
    fn live(&mut self, id: &SandboxId) -> RpcResult<&mut FakeSandbox> {
        match self.sandboxes.get_mut(id) {
            None => Err(CallError::NotFound(format!("sandbox {}", id))),
            Some(sandbox) if sandbox.killed => {
                Err(CallError::SandboxGone(format!("sandbox {} was killed", id)))
            }
            Some(sandbox) if !sandbox.ready => Err(CallError::InvalidState(format!(
                "sandbox {} is not ready",
                id
            ))),
            Some(sandbox) => Ok(sandbox),
        }
    }
}

fn apply_input(sandbox: &mut FakeSandbox, action: &InputAction) -> RpcResult<()> {
    match action {
        InputAction::MoveMouse { to } => {
            if !sandbox.screen().contains(to.x, to.y) {
                return Err(CallError::Rejected(format!(
                    "({}, {}) is off screen",
                    to.x, to.y
                )));
            }
            sandbox.cursor = *to;
        }
        InputAction::Click { button, .. } => match button {
            MouseButton::Right => {
                let cursor = sandbox.cursor;
                if sandbox.clickable.iter().any(|region| region.contains(cursor)) {
                    sandbox.menu = Some(menu_at(cursor, sandbox.screen()));
                }
            }
            MouseButton::Left => sandbox.menu = None,
            MouseButton::Middle => {}
        },
        InputAction::ButtonDown { .. }
        | InputAction::ButtonUp { .. }
        | InputAction::Scroll { .. } => {}
        InputAction::TypeText { text, .. } => sandbox.typed.push_str(text),
        InputAction::KeyCombo { keys } => {
            if keys.len() == 1 && keys[0] == "Escape" {
                sandbox.menu = None;
            }
        }
    }
    sandbox.input_log.push(action.clone());
    Ok(())
}

fn window_title_for(target: &str) -> &str {
    target.rsplit('/').find(|part| !part.is_empty()).unwrap_or(target)
}

impl DesktopService for FakeConnection {
    async fn authenticate(self, _: Context, api_key: String) -> RpcResult<()> {
        let mut state = self.desktop.state();
        *state.calls.entry("authenticate").or_insert(0) += 1;
        match &state.api_key {
            Some(expected) if *expected != api_key => {
                Err(CallError::Unauthorized("invalid API key".to_string()))
            }
            _ => {
                self.authenticated.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn create(self, _: Context, spec: CreateSpec) -> RpcResult<SandboxId> {
        let mut state = self.enter("create")?;
        if spec.resolution.width <= 0 || spec.resolution.height <= 0 {
            return Err(CallError::Rejected(format!(
                "unsupported resolution {}",
                spec.resolution
            )));
        }

        let id = SandboxId::new(format!("sbx-{}", uuid::Uuid::new_v4().simple()));
        let polls_left = (!state.never_ready).then_some(state.pending_polls);
        let sandbox = FakeSandbox::new(spec, polls_left, state.clickable.clone());
        state.sandboxes.insert(id.clone(), sandbox);
        Ok(id)
    }

    async fn status(self, _: Context, id: SandboxId) -> RpcResult<SandboxStatus> {
        let mut state = self.enter("status")?;
        let sandbox = state
            .sandboxes
            .get_mut(&id)
            .ok_or_else(|| CallError::NotFound(format!("sandbox {}", id)))?;

        if sandbox.killed {
            return Ok(SandboxStatus::Killed);
        }
        if sandbox.ready {
            return Ok(SandboxStatus::Ready);
        }
        match sandbox.polls_left {
            Some(0) => {
                sandbox.ready = true;
                Ok(SandboxStatus::Ready)
            }
            Some(n) => {
                sandbox.polls_left = Some(n - 1);
                Ok(SandboxStatus::Pending)
            }
            None => Ok(SandboxStatus::Pending),
        }
    }

    async fn kill(self, _: Context, id: SandboxId) -> RpcResult<()> {
        let mut state = self.enter("kill")?;
        let sandbox = state
            .sandboxes
            .get_mut(&id)
            .ok_or_else(|| CallError::NotFound(format!("sandbox {}", id)))?;
        if sandbox.killed {
            return Err(CallError::SandboxGone(format!(
                "sandbox {} was already killed",
                id
            )));
        }
        sandbox.killed = true;
        sandbox.stream = None;
        Ok(())
    }

    async fn screen_size(self, _: Context, id: SandboxId) -> RpcResult<ScreenSize> {
        let mut state = self.enter("screen_size")?;
        Ok(state.live(&id)?.screen())
    }

    async fn cursor_position(self, _: Context, id: SandboxId) -> RpcResult<CursorPosition> {
        let mut state = self.enter("cursor_position")?;
        Ok(state.live(&id)?.cursor)
    }

    async fn input(self, _: Context, id: SandboxId, action: InputAction) -> RpcResult<()> {
        let delay = {
            let state = self.enter("input")?;
            state.input_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.desktop.state();
        let sandbox = state.live(&id)?;
        apply_input(sandbox, &action)
    }

    async fn screenshot(
        self,
        _: Context,
        id: SandboxId,
        format: ScreenshotFormat,
    ) -> RpcResult<Vec<u8>> {
        let (screen, raw) = {
            let mut state = self.enter("screenshot")?;
            let sandbox = state.live(&id)?;
            (sandbox.screen(), render(sandbox.screen(), sandbox.menu))
        };
        match format {
            ScreenshotFormat::Raw => Ok(raw),
            ScreenshotFormat::Png => encode_png(screen, raw),
        }
    }

    async fn open(self, _: Context, id: SandboxId, target: String) -> RpcResult<()> {
        let mut state = self.enter("open")?;
        let sandbox = state.live(&id)?;
        let class = if target.starts_with("http://") || target.starts_with("https://") {
            "firefox"
        } else {
            "mousepad"
        };
        sandbox.add_window(class, window_title_for(&target));
        sandbox.opened.push(target);
        Ok(())
    }

    async fn launch(
        self,
        _: Context,
        id: SandboxId,
        application: String,
        uri: Option<String>,
    ) -> RpcResult<()> {
        let mut state = self.enter("launch")?;
        let sandbox = state.live(&id)?;
        let title = uri
            .as_deref()
            .map(window_title_for)
            .unwrap_or(application.as_str())
            .to_string();
        sandbox.add_window(&application, &title);
        Ok(())
    }

    async fn current_window(self, _: Context, id: SandboxId) -> RpcResult<WindowId> {
        let mut state = self.enter("current_window")?;
        let sandbox = state.live(&id)?;
        sandbox
            .windows
            .last()
            .map(|window| WindowId::new(window.id.clone()))
            .ok_or_else(|| CallError::NotFound("no focused window".to_string()))
    }

    async fn application_windows(
        self,
        _: Context,
        id: SandboxId,
        application: String,
    ) -> RpcResult<Vec<WindowId>> {
        let mut state = self.enter("application_windows")?;
        let sandbox = state.live(&id)?;
        Ok(sandbox
            .windows
            .iter()
            .filter(|window| window.class.eq_ignore_ascii_case(&application))
            .map(|window| WindowId::new(window.id.clone()))
            .collect())
    }

    async fn window_title(self, _: Context, id: SandboxId, window: WindowId) -> RpcResult<String> {
        let mut state = self.enter("window_title")?;
        let sandbox = state.live(&id)?;
        sandbox
            .windows
            .iter()
            .find(|candidate| candidate.id == window.as_str())
            .map(|found| found.title.clone())
            .ok_or_else(|| CallError::NotFound(format!("window {}", window.as_str())))
    }

    async fn read_file(self, _: Context, id: SandboxId, path: String) -> RpcResult<FileContent> {
        let mut state = self.enter("read_file")?;
        let sandbox = state.live(&id)?;
        sandbox
            .files
            .get(&path)
            .cloned()
            .ok_or(CallError::NotFound(path))
    }

    async fn write_file(
        self,
        _: Context,
        id: SandboxId,
        path: String,
        content: FileContent,
    ) -> RpcResult<()> {
        let mut state = self.enter("write_file")?;
        let sandbox = state.live(&id)?;
        if !path.starts_with('/') {
            return Err(CallError::Rejected(format!("path '{}' is not absolute", path)));
        }
        sandbox.files.insert(path, content);
        Ok(())
    }

    async fn file_exists(self, _: Context, id: SandboxId, path: String) -> RpcResult<bool> {
        let mut state = self.enter("file_exists")?;
        Ok(state.live(&id)?.files.contains_key(&path))
    }

    async fn remove_file(self, _: Context, id: SandboxId, path: String) -> RpcResult<()> {
        let mut state = self.enter("remove_file")?;
        let sandbox = state.live(&id)?;
        match sandbox.files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(CallError::NotFound(path)),
        }
    }

    async fn stream_start(self, _: Context, id: SandboxId, options: StreamOptions) -> RpcResult<()> {
        let mut state = self.enter("stream_start")?;
        let sandbox = state.live(&id)?;
        if sandbox.stream.is_some() {
            return Err(CallError::InvalidState("stream is already running".to_string()));
        }
        sandbox.stream = Some(FakeStream { options, key: None });
        Ok(())
    }

    async fn stream_auth_key(self, _: Context, id: SandboxId) -> RpcResult<AuthKey> {
        let mut state = self.enter("stream_auth_key")?;
        let sandbox = state.live(&id)?;
        let stream = sandbox
            .stream
            .as_mut()
            .ok_or_else(|| CallError::InvalidState("stream is not running".to_string()))?;
        if !stream.options.require_auth {
            return Err(CallError::Unauthorized(
                "stream does not require auth".to_string(),
            ));
        }
        let key = stream
            .key
            .get_or_insert_with(|| AuthKey::new(uuid::Uuid::new_v4().simple().to_string()));
        Ok(key.clone())
    }

    async fn stream_stop(self, _: Context, id: SandboxId) -> RpcResult<()> {
        let mut state = self.enter("stream_stop")?;
        state.live(&id)?.stream = None;
        Ok(())
    }
}
