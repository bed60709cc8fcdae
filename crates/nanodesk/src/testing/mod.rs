//! In-memory desktop backend for tests.
//!
//! [`FakeDesktop`] serves the real RPC protocol over an in-process channel,
//! so everything above the socket runs exactly as it does against a real
//! backend. The desktop behind it is simulated: a blue desktop with a top
//! panel, where a right click inside a clickable region opens a context
//! menu that shows up in screenshots.
//!
//! ```rust,ignore
//! let fake = FakeDesktop::new();
//! let client = fake.client(&fake.config()).await?;
//! let sandbox = client.sandbox().create().await?;
//! ```

mod framebuffer;
mod server;

pub use framebuffer::{PANEL_HEIGHT, Region};

use crate::client::DesktopClient;
use crate::config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::rpc::RpcTransport;
use futures::prelude::*;
use nanodesk_core::{
    AuthKey, CallError, CreateSpec, CursorPosition, FileContent, InputAction, Result, SandboxId,
    ScreenSize, StreamOptions, Transport,
};
use nanodesk_protocol::{DesktopService, DesktopServiceClient};
use server::FakeConnection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tarpc::server::{self as rpc_server, Channel};

/// Endpoint reported by [`FakeDesktop::config`]. Never dialed.
pub const FAKE_ENDPOINT: &str = "fake.nanodesk.test:49983";

/// Stream base reported by [`FakeDesktop::config`].
pub const FAKE_STREAM_BASE: &str = "https://stream.nanodesk.test/desktop";

/// Simulated desktop backend.
///
/// Clones share state; configure with the `with_*` methods before
/// connecting.
#[derive(Clone, Default)]
pub struct FakeDesktop {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    api_key: Option<String>,
    pending_polls: u32,
    never_ready: bool,
    clickable: Option<Vec<Region>>,
    input_delay: Option<Duration>,
    failures: HashMap<&'static str, CallError>,
    calls: HashMap<&'static str, usize>,
    sandboxes: HashMap<SandboxId, FakeSandbox>,
}

struct FakeSandbox {
    spec: CreateSpec,
    polls_left: Option<u32>,
    ready: bool,
    killed: bool,
    cursor: CursorPosition,
    clickable: Vec<Region>,
    menu: Option<Region>,
    typed: String,
    input_log: Vec<InputAction>,
    windows: Vec<FakeWindow>,
    next_window: u32,
    opened: Vec<String>,
    files: HashMap<String, FileContent>,
    stream: Option<FakeStream>,
}

struct FakeWindow {
    id: String,
    class: String,
    title: String,
}

struct FakeStream {
    options: StreamOptions,
    key: Option<AuthKey>,
}

impl FakeSandbox {
    fn new(spec: CreateSpec, polls_left: Option<u32>, clickable: Option<Vec<Region>>) -> Self {
        let screen = spec.resolution;
        Self {
            polls_left,
            ready: false,
            killed: false,
            cursor: screen.center(),
            clickable: clickable.unwrap_or_else(|| vec![Region::desktop(screen)]),
            menu: None,
            typed: String::new(),
            input_log: Vec::new(),
            windows: vec![FakeWindow {
                id: "0x400001".to_string(),
                class: "xfdesktop".to_string(),
                title: "Desktop".to_string(),
            }],
            next_window: 0x1a00003,
            opened: Vec::new(),
            files: HashMap::new(),
            stream: None,
            spec,
        }
    }

    fn screen(&self) -> ScreenSize {
        self.spec.resolution
    }

    fn add_window(&mut self, class: &str, title: &str) {
        let id = format!("{:#x}", self.next_window);
        self.next_window += 0x200000;
        self.windows.push(FakeWindow {
            id,
            class: class.to_string(),
            title: title.to_string(),
        });
    }
}

impl FakeDesktop {
    /// A backend that accepts any connection and has sandboxes ready on the
    /// first status poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires connections to authenticate with `api_key`.
    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        self.state().api_key = Some(api_key.into());
        self
    }

    /// Answers `Pending` to the first `polls` status queries of each sandbox.
    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.state().pending_polls = polls;
        self
    }

    /// Sandboxes never leave `Pending`.
    pub fn never_ready(self) -> Self {
        self.state().never_ready = true;
        self
    }

    /// Restricts where a right click opens the context menu. Defaults to the
    /// whole desktop below the panel.
    pub fn with_clickable(self, regions: Vec<Region>) -> Self {
        self.state().clickable = Some(regions);
        self
    }

    /// Delays every input action by `delay` before applying it.
    pub fn with_input_delay(self, delay: Duration) -> Self {
        self.state().input_delay = Some(delay);
        self
    }

    /// Makes the next call to `method` fail with `error`.
    pub fn fail_next(&self, method: &'static str, error: CallError) {
        self.state().failures.insert(method, error);
    }

    /// A client config pointing at this fake, with short timeouts.
    pub fn config(&self) -> ClientConfig {
        let config = ClientConfig::new(FAKE_ENDPOINT)
            .with_stream_base_url(FAKE_STREAM_BASE)
            .with_request_timeout(Duration::from_secs(2))
            .with_ready_timeout(Duration::from_secs(5));
        match self.state().api_key.clone() {
            Some(key) => config.with_api_key(key),
            None => config,
        }
    }

    /// Opens a new in-memory connection. Must be called inside a tokio
    /// runtime.
    pub fn connect(&self) -> DesktopServiceClient {
        let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
        let connection = FakeConnection::new(self.clone());

        let server = rpc_server::BaseChannel::with_defaults(server_transport);
        tokio::spawn(
            server
                .execute(connection.serve())
                .for_each(|response| async move {
                    tokio::spawn(response);
                }),
        );

        DesktopServiceClient::new(tarpc::client::Config::default(), client_transport).spawn()
    }

    /// An unauthenticated transport over a fresh connection, using the
    /// default request timeout.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(RpcTransport::from_client(
            self.connect(),
            DEFAULT_REQUEST_TIMEOUT,
        ))
    }

    /// A client connected to this fake and authenticated with `config`.
    pub async fn client(&self, config: &ClientConfig) -> Result<DesktopClient> {
        let transport = RpcTransport::authenticate(self.connect(), config).await?;
        DesktopClient::with_transport(config, Arc::new(transport))
    }

    /// Number of calls `method` received, including rejected ones.
    pub fn calls(&self, method: &str) -> usize {
        self.state().calls.get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn sandbox_ids(&self) -> Vec<SandboxId> {
        self.state().sandboxes.keys().cloned().collect()
    }

    pub fn is_killed(&self, id: &SandboxId) -> bool {
        self.state()
            .sandboxes
            .get(id)
            .is_some_and(|sandbox| sandbox.killed)
    }

    /// Kills a sandbox from the backend side, as a lifetime expiry would.
    pub fn expire(&self, id: &SandboxId) {
        if let Some(sandbox) = self.state().sandboxes.get_mut(id) {
            sandbox.killed = true;
            sandbox.stream = None;
        }
    }

    /// Creation request the sandbox was made from.
    pub fn create_spec(&self, id: &SandboxId) -> Option<CreateSpec> {
        self.with_sandbox(id, |sandbox| sandbox.spec.clone())
    }

    /// Input actions applied to a sandbox, oldest first.
    pub fn input_log(&self, id: &SandboxId) -> Vec<InputAction> {
        self.with_sandbox(id, |sandbox| sandbox.input_log.clone())
            .unwrap_or_default()
    }

    /// All text typed into a sandbox.
    pub fn typed_text(&self, id: &SandboxId) -> String {
        self.with_sandbox(id, |sandbox| sandbox.typed.clone())
            .unwrap_or_default()
    }

    pub fn cursor(&self, id: &SandboxId) -> Option<CursorPosition> {
        self.with_sandbox(id, |sandbox| sandbox.cursor)
    }

    /// Whether the context menu is currently open.
    pub fn menu_open(&self, id: &SandboxId) -> bool {
        self.with_sandbox(id, |sandbox| sandbox.menu.is_some())
            .unwrap_or(false)
    }

    /// Targets passed to `open`, oldest first.
    pub fn opened(&self, id: &SandboxId) -> Vec<String> {
        self.with_sandbox(id, |sandbox| sandbox.opened.clone())
            .unwrap_or_default()
    }

    pub fn file(&self, id: &SandboxId, path: &str) -> Option<FileContent> {
        self.with_sandbox(id, |sandbox| sandbox.files.get(path).cloned())
            .flatten()
    }

    /// Options of the running stream, if any.
    pub fn stream(&self, id: &SandboxId) -> Option<StreamOptions> {
        self.with_sandbox(id, |sandbox| {
            sandbox.stream.as_ref().map(|stream| stream.options.clone())
        })
        .flatten()
    }

    fn with_sandbox<T>(&self, id: &SandboxId, f: impl FnOnce(&FakeSandbox) -> T) -> Option<T> {
        self.state().sandboxes.get(id).map(f)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
