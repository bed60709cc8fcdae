//! Display stream of a sandbox.

use crate::session::SessionInner;
use nanodesk_core::{AuthKey, Error, Operation, Result, Scope, StreamOptions};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use url::Url;

/// How the stream viewer fits the remote display into its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Off,
    Scale,
    Remote,
}

impl ResizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMode::Off => "off",
            ResizeMode::Scale => "scale",
            ResizeMode::Remote => "remote",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`StreamHandle::get_url_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamUrlOptions<'a> {
    pub auth_key: Option<&'a AuthKey>,
    /// Viewer connects as soon as the page loads.
    pub auto_connect: bool,
    /// Viewer cannot send input.
    pub view_only: bool,
    pub resize: Option<ResizeMode>,
}

#[derive(Default)]
struct StreamState {
    active: Option<ActiveStream>,
}

struct ActiveStream {
    auth_required: bool,
    auth_key: Option<AuthKey>,
}

/// Handle to the authenticated display stream of one sandbox.
///
/// At most one stream runs per sandbox. Stream calls are ordered among
/// themselves and with [`Sandbox::kill`](crate::Sandbox::kill), which stops a
/// running stream before the sandbox goes away.
pub struct StreamHandle {
    session: Arc<SessionInner>,
    base: Url,
    state: Mutex<StreamState>,
    active: AtomicBool,
}

impl StreamHandle {
    pub(crate) fn new(session: Arc<SessionInner>, base: Url) -> Self {
        Self {
            session,
            base,
            state: Mutex::new(StreamState::default()),
            active: AtomicBool::new(false),
        }
    }

    fn scope(&self) -> Scope {
        Scope::Stream(self.session.id().clone())
    }

    /// Starts streaming the display.
    pub async fn start(&self, options: StreamOptions) -> Result<()> {
        let op = Operation::StreamStart;
        let mut state = self.state.lock().await;
        self.session.ensure_ready(op, self.scope())?;
        if state.active.is_some() {
            return Err(Error::State {
                op,
                scope: self.scope(),
                reason: "stream is already running".to_string(),
            });
        }

        let auth_required = options.require_auth;
        let session = &self.session;
        session
            .invoke(
                op,
                self.scope(),
                session.transport().stream_start(session.id(), options),
            )
            .await?;

        state.active = Some(ActiveStream {
            auth_required,
            auth_key: None,
        });
        self.active.store(true, Ordering::SeqCst);
        tracing::info!(sandbox_id = %session.id(), auth_required, "stream started");
        Ok(())
    }

    /// Returns the key that unlocks the running stream.
    ///
    /// The first call fetches a key from the backend; later calls return the
    /// same key until the stream is stopped.
    pub async fn get_auth_key(&self) -> Result<AuthKey> {
        let op = Operation::StreamAuthKey;
        let mut state = self.state.lock().await;
        self.session.ensure_ready(op, self.scope())?;

        let Some(active) = state.active.as_mut() else {
            return Err(Error::State {
                op,
                scope: self.scope(),
                reason: "stream is not running".to_string(),
            });
        };
        if !active.auth_required {
            return Err(Error::Auth {
                op,
                scope: self.scope(),
                reason: "stream was started without require_auth".to_string(),
            });
        }
        if let Some(key) = &active.auth_key {
            return Ok(key.clone());
        }

        let session = &self.session;
        let key = session
            .invoke(
                op,
                self.scope(),
                session.transport().stream_auth_key(session.id()),
            )
            .await?;
        if key.is_empty() {
            return Err(Error::Auth {
                op,
                scope: self.scope(),
                reason: "backend issued an empty auth key".to_string(),
            });
        }

        active.auth_key = Some(key.clone());
        tracing::debug!(sandbox_id = %session.id(), "stream auth key issued");
        Ok(key)
    }

    /// Builds the viewer URL: `<stream base>/<sandbox id>`, with
    /// `?token=<key>` when a key is given.
    ///
    /// Purely local; the same inputs always give the same URL.
    pub fn get_url(&self, auth_key: Option<&AuthKey>) -> String {
        self.get_url_with(&StreamUrlOptions {
            auth_key,
            ..Default::default()
        })
    }

    pub fn get_url_with(&self, options: &StreamUrlOptions<'_>) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(self.session.id().as_str());
        }

        let has_query = options.auth_key.is_some()
            || options.auto_connect
            || options.view_only
            || options.resize.is_some();
        if has_query {
            let mut query = url.query_pairs_mut();
            if let Some(key) = options.auth_key {
                query.append_pair("token", key.as_str());
            }
            if options.auto_connect {
                query.append_pair("autoconnect", "true");
            }
            if options.view_only {
                query.append_pair("view_only", "true");
            }
            if let Some(resize) = options.resize {
                query.append_pair("resize", resize.as_str());
            }
        }
        url.into()
    }

    /// Stops the stream and invalidates its key. Stopping a stream that is
    /// not running succeeds.
    pub async fn stop(&self) -> Result<()> {
        let op = Operation::StreamStop;
        let mut state = self.state.lock().await;
        self.session.ensure_ready(op, self.scope())?;
        if state.active.is_none() {
            return Ok(());
        }

        let session = &self.session;
        session
            .invoke(op, self.scope(), session.transport().stream_stop(session.id()))
            .await?;

        state.active = None;
        self.active.store(false, Ordering::SeqCst);
        tracing::info!(sandbox_id = %session.id(), "stream stopped");
        Ok(())
    }

    /// Whether a stream is running, as far as this handle knows.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops a running stream ahead of a kill. Failures are logged, not
    /// returned; the kill proceeds either way.
    pub(crate) async fn release(&self) {
        let mut state = self.state.lock().await;
        if state.active.is_none() {
            return;
        }

        let session = &self.session;
        if !session.is_killed() {
            let stopped = session
                .invoke(
                    Operation::StreamStop,
                    self.scope(),
                    session.transport().stream_stop(session.id()),
                )
                .await;
            if let Err(e) = stopped {
                tracing::warn!(sandbox_id = %session.id(), "failed to stop stream before kill: {}", e);
            }
        }

        state.active = None;
        self.active.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("sandbox_id", self.session.id())
            .field("active", &self.is_active())
            .finish()
    }
}
