//! Handle to a running desktop sandbox.
//!
//! A [`Sandbox`] is returned by [`DesktopClient::create`](crate::DesktopClient::create)
//! once the remote desktop is ready. Use it to:
//!
//! - Drive the mouse and keyboard (see the input methods)
//! - Capture the screen via [`Sandbox::screenshot`]
//! - Share the display via [`Sandbox::stream`]
//! - Move files in and out via [`Sandbox::files`]
//!
//! # Lifecycle
//!
//! Handles start in [`SessionState::Ready`]. [`kill`](Sandbox::kill) moves
//! the session to [`SessionState::Killed`]; from then on every operation
//! except `kill` itself fails locally without reaching the backend. A
//! backend reporting that the sandbox is gone has the same effect.
//!
//! # Ordering
//!
//! Operations on one sandbox are applied in the order they are issued, one
//! at a time. Concurrent calls from several tasks queue up behind each other.

use crate::files::Files;
use crate::input::{InputController, InputState};
use crate::stream::StreamHandle;
use nanodesk_core::{
    CallError, CallResult, Error, Operation, Result, SandboxId, Scope, ScreenSize,
    ScreenshotFormat, Transport, WindowId,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::MutexGuard;
use tokio::time::timeout;
use url::Url;

const STATE_PENDING: u8 = 0;
const STATE_READY: u8 = 1;
const STATE_KILLED: u8 = 2;

/// Client-side lifecycle state of a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created on the backend, desktop not yet usable.
    Pending,
    /// Accepting operations.
    Ready,
    /// Killed or expired. Terminal.
    Killed,
}

impl SessionState {
    fn from_atomic(val: u8) -> Self {
        match val {
            STATE_PENDING => SessionState::Pending,
            STATE_READY => SessionState::Ready,
            _ => SessionState::Killed,
        }
    }
}

/// State shared between a sandbox handle and its stream.
pub(crate) struct SessionInner {
    id: SandboxId,
    transport: Arc<dyn Transport>,
    state: AtomicU8,
    created_at: SystemTime,
    display: String,
    request_timeout: Duration,
    pub(crate) input: InputController,
}

impl SessionInner {
    pub(crate) fn new(
        id: SandboxId,
        transport: Arc<dyn Transport>,
        display: String,
        request_timeout: Duration,
        screen: ScreenSize,
    ) -> Self {
        Self {
            id,
            transport,
            state: AtomicU8::new(STATE_PENDING),
            created_at: SystemTime::now(),
            display,
            request_timeout,
            input: InputController::new(screen),
        }
    }

    pub(crate) fn id(&self) -> &SandboxId {
        &self.id
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn scope(&self) -> Scope {
        Scope::Sandbox(self.id.clone())
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_atomic(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.state() == SessionState::Killed
    }

    pub(crate) fn mark_ready(&self) {
        let _ = self.state.compare_exchange(
            STATE_PENDING,
            STATE_READY,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub(crate) fn mark_killed(&self) {
        self.state.store(STATE_KILLED, Ordering::SeqCst);
    }

    /// Fails unless the session accepts operations.
    pub(crate) fn ensure_ready(&self, op: Operation, scope: Scope) -> Result<()> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Pending => Err(Error::State {
                op,
                scope,
                reason: "sandbox is not ready yet".to_string(),
            }),
            SessionState::Killed => Err(Error::State {
                op,
                scope,
                reason: "sandbox has been killed".to_string(),
            }),
        }
    }

    /// Runs one remote call under the request timeout.
    ///
    /// A call that times out is not retried. A backend answer that the
    /// sandbox is gone moves the session to `Killed`.
    pub(crate) async fn invoke<T>(
        &self,
        op: Operation,
        scope: Scope,
        call: impl Future<Output = CallResult<T>>,
    ) -> Result<T> {
        tracing::trace!(sandbox_id = %self.id, %op, "dispatching");
        match timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(CallError::SandboxGone(detail))) => {
                tracing::warn!(sandbox_id = %self.id, %op, "sandbox is gone: {}", detail);
                self.mark_killed();
                Err(Error::from_call(op, scope, CallError::SandboxGone(detail)))
            }
            Ok(Err(e)) => Err(Error::from_call(op, scope, e)),
            Err(_) => {
                tracing::warn!(
                    sandbox_id = %self.id,
                    %op,
                    timeout = ?self.request_timeout,
                    "remote call timed out"
                );
                Err(Error::Timeout {
                    op,
                    scope,
                    after: self.request_timeout,
                })
            }
        }
    }

    /// Waits for this session's turn and returns a guard that keeps it.
    ///
    /// The killed check runs both before and after waiting so an operation
    /// queued behind `kill` fails without dispatching.
    pub(crate) async fn sequence(&self, op: Operation) -> Result<Sequenced<'_>> {
        self.ensure_ready(op, self.scope())?;
        let input = self.input.lock().await;
        self.ensure_ready(op, self.scope())?;
        Ok(Sequenced {
            session: self,
            input,
        })
    }
}

/// Exclusive turn on a session, held for one logical operation.
pub(crate) struct Sequenced<'a> {
    pub(crate) session: &'a SessionInner,
    pub(crate) input: MutexGuard<'a, InputState>,
}

impl Sequenced<'_> {
    pub(crate) async fn call<T>(
        &self,
        op: Operation,
        call: impl Future<Output = CallResult<T>>,
    ) -> Result<T> {
        self.session.invoke(op, self.session.scope(), call).await
    }

    pub(crate) fn invalid(&self, op: Operation, reason: impl Into<String>) -> Error {
        Error::Validation {
            op,
            scope: self.session.scope(),
            reason: reason.into(),
        }
    }
}

/// Handle to a ready desktop sandbox.
///
/// Dropping the handle does not kill the sandbox; the backend reclaims it
/// when its lifetime runs out. Call [`kill`](Sandbox::kill) to release it
/// early.
pub struct Sandbox {
    inner: Arc<SessionInner>,
    stream: StreamHandle,
}

impl Sandbox {
    pub(crate) fn new(inner: Arc<SessionInner>, stream_base: Url) -> Self {
        let stream = StreamHandle::new(Arc::clone(&inner), stream_base);
        Self { inner, stream }
    }

    pub(crate) fn inner(&self) -> &SessionInner {
        &self.inner
    }

    /// Identifier assigned by the backend.
    pub fn sandbox_id(&self) -> &SandboxId {
        self.inner.id()
    }

    /// When the backend accepted the creation request.
    pub fn created_at(&self) -> SystemTime {
        self.inner.created_at
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// X display the desktop runs on, e.g. `:0`.
    pub fn display(&self) -> &str {
        &self.inner.display
    }

    /// The sandbox's display stream.
    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }

    /// Access to the sandbox filesystem.
    pub fn files(&self) -> Files<'_> {
        Files::new(&self.inner)
    }

    /// Returns the display resolution as the backend reports it.
    ///
    /// Mouse coordinates are validated against the latest answer.
    pub async fn get_screen_size(&self) -> Result<ScreenSize> {
        let op = Operation::GetScreenSize;
        let mut seq = self.inner.sequence(op).await?;
        let size = seq
            .call(op, self.inner.transport().screen_size(self.inner.id()))
            .await?;
        seq.input.screen = size;
        Ok(size)
    }

    /// Captures the framebuffer.
    ///
    /// The capture reflects every operation this handle completed before it.
    pub async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>> {
        let op = Operation::Screenshot;
        let seq = self.inner.sequence(op).await?;
        seq.call(op, self.inner.transport().screenshot(self.inner.id(), format))
            .await
    }

    /// Opens a file or URL with the desktop's default handler.
    ///
    /// Returns once the backend accepted the request; the application may
    /// still be starting.
    pub async fn open(&self, target: &str) -> Result<()> {
        let op = Operation::Open;
        let seq = self.inner.sequence(op).await?;
        if target.trim().is_empty() {
            return Err(seq.invalid(op, "target must not be empty"));
        }
        seq.call(
            op,
            self.inner
                .transport()
                .open(self.inner.id(), target.to_string()),
        )
        .await
    }

    /// Starts a desktop application by name, optionally with a URI.
    pub async fn launch(&self, application: &str, uri: Option<&str>) -> Result<()> {
        let op = Operation::Launch;
        let seq = self.inner.sequence(op).await?;
        if application.trim().is_empty() {
            return Err(seq.invalid(op, "application must not be empty"));
        }
        seq.call(
            op,
            self.inner.transport().launch(
                self.inner.id(),
                application.to_string(),
                uri.map(str::to_string),
            ),
        )
        .await
    }

    /// Returns the window that currently has focus.
    pub async fn get_current_window_id(&self) -> Result<WindowId> {
        let op = Operation::GetCurrentWindowId;
        let seq = self.inner.sequence(op).await?;
        seq.call(op, self.inner.transport().current_window(self.inner.id()))
            .await
    }

    /// Returns the visible windows of an application, by window class.
    pub async fn get_application_windows(&self, application: &str) -> Result<Vec<WindowId>> {
        let op = Operation::GetApplicationWindows;
        let seq = self.inner.sequence(op).await?;
        if application.trim().is_empty() {
            return Err(seq.invalid(op, "application must not be empty"));
        }
        seq.call(
            op,
            self.inner
                .transport()
                .application_windows(self.inner.id(), application.to_string()),
        )
        .await
    }

    pub async fn get_window_title(&self, window: &WindowId) -> Result<String> {
        let op = Operation::GetWindowTitle;
        let seq = self.inner.sequence(op).await?;
        seq.call(
            op,
            self.inner
                .transport()
                .window_title(self.inner.id(), window.clone()),
        )
        .await
    }

    /// Terminates the sandbox.
    ///
    /// Stops the stream first if it is running. Killing an already killed
    /// sandbox succeeds without contacting the backend.
    pub async fn kill(&self) -> Result<()> {
        if self.inner.is_killed() {
            tracing::debug!(sandbox_id = %self.inner.id(), "sandbox already killed");
            return Ok(());
        }

        self.stream.release().await;

        let _turn = self.inner.input.lock().await;
        if self.inner.is_killed() {
            return Ok(());
        }

        let op = Operation::Kill;
        match self
            .inner
            .invoke(op, self.inner.scope(), self.inner.transport().kill(self.inner.id()))
            .await
        {
            Ok(()) => {}
            // Already gone on the backend, which is what kill asked for.
            Err(_) if self.inner.is_killed() => {}
            Err(e) => return Err(e),
        }
        self.inner.mark_killed();

        tracing::info!(sandbox_id = %self.inner.id(), "sandbox killed");
        Ok(())
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", self.inner.id())
            .field("state", &self.inner.state())
            .field("display", &self.inner.display)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_from_atomic() {
        assert_eq!(SessionState::from_atomic(STATE_PENDING), SessionState::Pending);
        assert_eq!(SessionState::from_atomic(STATE_READY), SessionState::Ready);
        assert_eq!(SessionState::from_atomic(STATE_KILLED), SessionState::Killed);
    }

    mod lifecycle {
        use super::*;
        use crate::testing::FakeDesktop;

        fn session(fake: &FakeDesktop) -> SessionInner {
            SessionInner::new(
                SandboxId::new("unit"),
                fake.transport(),
                ":0".to_string(),
                Duration::from_secs(1),
                ScreenSize::default(),
            )
        }

        #[tokio::test]
        async fn starts_pending_and_becomes_ready() {
            let fake = FakeDesktop::new();
            let inner = session(&fake);
            assert_eq!(inner.state(), SessionState::Pending);
            assert!(inner.ensure_ready(Operation::Click, inner.scope()).is_err());

            inner.mark_ready();
            assert_eq!(inner.state(), SessionState::Ready);
            assert!(inner.ensure_ready(Operation::Click, inner.scope()).is_ok());
        }

        #[tokio::test]
        async fn killed_is_terminal() {
            let fake = FakeDesktop::new();
            let inner = session(&fake);
            inner.mark_ready();
            inner.mark_killed();
            inner.mark_ready();
            assert_eq!(inner.state(), SessionState::Killed);

            let err = inner.sequence(Operation::MoveMouse).await.err().unwrap();
            assert!(matches!(err, Error::State { op: Operation::MoveMouse, .. }));
        }

        #[tokio::test]
        async fn sandbox_gone_marks_killed() {
            let fake = FakeDesktop::new();
            let inner = session(&fake);
            inner.mark_ready();

            let err = inner
                .invoke(Operation::GetScreenSize, inner.scope(), async {
                    Err::<ScreenSize, _>(CallError::SandboxGone("expired".into()))
                })
                .await
                .unwrap_err();

            assert!(matches!(err, Error::State { .. }));
            assert!(inner.is_killed());
        }

        #[tokio::test]
        async fn other_failures_keep_session_ready() {
            let fake = FakeDesktop::new();
            let inner = session(&fake);
            inner.mark_ready();

            let err = inner
                .invoke(Operation::ReadFile, inner.scope(), async {
                    Err::<(), _>(CallError::NotFound("/nope".into()))
                })
                .await
                .unwrap_err();

            assert!(matches!(err, Error::NotFound { .. }));
            assert_eq!(inner.state(), SessionState::Ready);
        }

        #[tokio::test(start_paused = true)]
        async fn slow_call_times_out() {
            let fake = FakeDesktop::new();
            let inner = session(&fake);
            inner.mark_ready();

            let err = inner
                .invoke(Operation::Screenshot, inner.scope(), async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Vec::<u8>::new())
                })
                .await
                .unwrap_err();

            match err {
                Error::Timeout { op, after, .. } => {
                    assert_eq!(op, Operation::Screenshot);
                    assert_eq!(after, Duration::from_secs(1));
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }
    }
}
