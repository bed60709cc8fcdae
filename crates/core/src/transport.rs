use crate::error::CallResult;
use crate::types::{
    AuthKey, CreateSpec, CursorPosition, FileContent, InputAction, SandboxId, SandboxStatus,
    ScreenSize, ScreenshotFormat, StreamOptions, WindowId,
};
use async_trait::async_trait;

/// Executes remote calls against a desktop sandbox backend.
///
/// One call maps to one request/response exchange. Implementations must not
/// retry on their own; the session layer decides ordering, timeouts and what
/// a failure means for the session.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create(&self, spec: CreateSpec) -> CallResult<SandboxId>;
    async fn status(&self, id: &SandboxId) -> CallResult<SandboxStatus>;
    async fn kill(&self, id: &SandboxId) -> CallResult<()>;

    async fn screen_size(&self, id: &SandboxId) -> CallResult<ScreenSize>;
    async fn cursor_position(&self, id: &SandboxId) -> CallResult<CursorPosition>;
    async fn input(&self, id: &SandboxId, action: InputAction) -> CallResult<()>;
    async fn screenshot(&self, id: &SandboxId, format: ScreenshotFormat) -> CallResult<Vec<u8>>;

    async fn open(&self, id: &SandboxId, target: String) -> CallResult<()>;
    async fn launch(
        &self,
        id: &SandboxId,
        application: String,
        uri: Option<String>,
    ) -> CallResult<()>;
    async fn current_window(&self, id: &SandboxId) -> CallResult<WindowId>;
    async fn application_windows(
        &self,
        id: &SandboxId,
        application: String,
    ) -> CallResult<Vec<WindowId>>;
    async fn window_title(&self, id: &SandboxId, window: WindowId) -> CallResult<String>;

    async fn read_file(&self, id: &SandboxId, path: String) -> CallResult<FileContent>;
    async fn write_file(&self, id: &SandboxId, path: String, content: FileContent)
    -> CallResult<()>;
    async fn file_exists(&self, id: &SandboxId, path: String) -> CallResult<bool>;
    async fn remove_file(&self, id: &SandboxId, path: String) -> CallResult<()>;

    async fn stream_start(&self, id: &SandboxId, options: StreamOptions) -> CallResult<()>;
    async fn stream_auth_key(&self, id: &SandboxId) -> CallResult<AuthKey>;
    async fn stream_stop(&self, id: &SandboxId) -> CallResult<()>;
}
