//! RPC service definition for desktop sandbox backends.
//!
//! This crate defines the protocol between the nanodesk client and the
//! backend that runs the remote desktops. Every call after `create` is keyed
//! by the [`SandboxId`] the backend assigned.
//!
//! A connection must call [`DesktopService::authenticate`] before anything
//! else; backends answer [`CallError::Unauthorized`] otherwise.

use nanodesk_core::{
    AuthKey, CallError, CreateSpec, CursorPosition, FileContent, InputAction, SandboxId,
    SandboxStatus, ScreenSize, ScreenshotFormat, StreamOptions, WindowId,
};

/// Default TCP port of a desktop sandbox backend.
pub const DEFAULT_PORT: u16 = 49983;

/// Maximum RPC frame size (32MB).
///
/// Raw screenshots of large displays are the biggest payload.
pub const MAX_RPC_FRAME_SIZE: usize = 32 * 1024 * 1024;

pub type RpcResult<T> = Result<T, CallError>;

/// RPC service exposed by a desktop sandbox backend.
#[tarpc::service]
pub trait DesktopService {
    /// Authenticates this connection with an API key.
    async fn authenticate(api_key: String) -> RpcResult<()>;

    /// Requests a new sandbox; returns while it is still pending.
    async fn create(spec: CreateSpec) -> RpcResult<SandboxId>;

    async fn status(id: SandboxId) -> RpcResult<SandboxStatus>;

    async fn kill(id: SandboxId) -> RpcResult<()>;

    async fn screen_size(id: SandboxId) -> RpcResult<ScreenSize>;

    async fn cursor_position(id: SandboxId) -> RpcResult<CursorPosition>;

    /// Applies one input action; replies after it took effect.
    async fn input(id: SandboxId, action: InputAction) -> RpcResult<()>;

    async fn screenshot(id: SandboxId, format: ScreenshotFormat) -> RpcResult<Vec<u8>>;

    /// Opens a file or URL with the desktop's default handler.
    async fn open(id: SandboxId, target: String) -> RpcResult<()>;

    async fn launch(id: SandboxId, application: String, uri: Option<String>) -> RpcResult<()>;

    async fn current_window(id: SandboxId) -> RpcResult<WindowId>;

    async fn application_windows(id: SandboxId, application: String) -> RpcResult<Vec<WindowId>>;

    async fn window_title(id: SandboxId, window: WindowId) -> RpcResult<String>;

    async fn read_file(id: SandboxId, path: String) -> RpcResult<FileContent>;

    async fn write_file(id: SandboxId, path: String, content: FileContent) -> RpcResult<()>;

    async fn file_exists(id: SandboxId, path: String) -> RpcResult<bool>;

    async fn remove_file(id: SandboxId, path: String) -> RpcResult<()>;

    async fn stream_start(id: SandboxId, options: StreamOptions) -> RpcResult<()>;

    /// Issues the key of the running stream; fails unless it requires auth.
    async fn stream_auth_key(id: SandboxId) -> RpcResult<AuthKey>;

    async fn stream_stop(id: SandboxId) -> RpcResult<()>;
}
