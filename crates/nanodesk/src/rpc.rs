//! [`Transport`] over a tarpc connection to a desktop sandbox backend.

use crate::config::ClientConfig;
use async_trait::async_trait;
use nanodesk_core::{
    AuthKey, CallError, CallResult, CreateSpec, CursorPosition, Error, FileContent, InputAction,
    Operation, Result, SandboxId, SandboxStatus, Scope, ScreenSize, ScreenshotFormat,
    StreamOptions, Transport, WindowId,
};
use nanodesk_protocol::{DesktopServiceClient, MAX_RPC_FRAME_SIZE, RpcResult};
use secrecy::ExposeSecret;
use std::future::Future;
use std::time::{Duration, Instant};
use tarpc::client::RpcError;
use tarpc::context;
use tarpc::tokio_serde::formats::Bincode;
use tarpc::tokio_util::codec::LengthDelimitedCodec;
use tokio::net::TcpStream;

/// Transport backed by a [`DesktopServiceClient`].
///
/// Every request carries a deadline of `request_timeout` from the moment it
/// is issued.
pub struct RpcTransport {
    client: DesktopServiceClient,
    request_timeout: Duration,
}

impl RpcTransport {
    pub(crate) fn from_client(client: DesktopServiceClient, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    fn context(&self) -> context::Context {
        deadline_context(self.request_timeout)
    }

    async fn call<T>(
        &self,
        response: impl Future<Output = std::result::Result<RpcResult<T>, RpcError>>,
    ) -> CallResult<T> {
        call(response, self.request_timeout).await
    }

    /// Connects to the backend over TCP and authenticates the connection.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect(&config.endpoint)
            .await
            .map_err(|e| Error::Transport {
                op: Operation::Connect,
                scope: Scope::Client,
                reason: format!("failed to connect to {}: {}", config.endpoint, e),
            })?;
        stream.set_nodelay(true).map_err(|e| Error::Transport {
            op: Operation::Connect,
            scope: Scope::Client,
            reason: format!("failed to configure socket: {}", e),
        })?;

        let framed = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_RPC_FRAME_SIZE)
            .new_framed(stream);
        let transport = tarpc::serde_transport::new(framed, Bincode::default());

        let client = DesktopServiceClient::new(tarpc::client::Config::default(), transport).spawn();

        Self::authenticate(client, config).await
    }

    /// Wraps an already connected client, authenticating it first.
    ///
    /// Without an API key in `config` the connection is used as is.
    pub async fn authenticate(
        client: DesktopServiceClient,
        config: &ClientConfig,
    ) -> Result<Self> {
        if let Some(api_key) = &config.api_key {
            let key = api_key.expose_secret().clone();
            let ctx = deadline_context(config.request_timeout);
            call(client.authenticate(ctx, key), config.request_timeout)
                .await
                .map_err(|e| Error::from_call(Operation::Connect, Scope::Client, e))?;
            tracing::debug!(endpoint = %config.endpoint, "connection authenticated");
        }
        Ok(Self::from_client(client, config.request_timeout))
    }
}

fn deadline_context(timeout: Duration) -> context::Context {
    let mut ctx = context::current();
    ctx.deadline = Instant::now() + timeout;
    ctx
}

async fn call<T>(
    response: impl Future<Output = std::result::Result<RpcResult<T>, RpcError>>,
    timeout: Duration,
) -> CallResult<T> {
    match response.await {
        Ok(result) => result,
        Err(RpcError::DeadlineExceeded) => Err(CallError::DeadlineExceeded(timeout)),
        Err(e) => Err(CallError::Transport(format!("rpc failed: {}", e))),
    }
}

#[async_trait]
impl Transport for RpcTransport {
    async fn create(&self, spec: CreateSpec) -> CallResult<SandboxId> {
        self.call(self.client.create(self.context(), spec)).await
    }

    async fn status(&self, id: &SandboxId) -> CallResult<SandboxStatus> {
        self.call(self.client.status(self.context(), id.clone())).await
    }

    async fn kill(&self, id: &SandboxId) -> CallResult<()> {
        self.call(self.client.kill(self.context(), id.clone())).await
    }

    async fn screen_size(&self, id: &SandboxId) -> CallResult<ScreenSize> {
        self.call(self.client.screen_size(self.context(), id.clone())).await
    }

    async fn cursor_position(&self, id: &SandboxId) -> CallResult<CursorPosition> {
        self.call(self.client.cursor_position(self.context(), id.clone())).await
    }

    async fn input(&self, id: &SandboxId, action: InputAction) -> CallResult<()> {
        self.call(self.client.input(self.context(), id.clone(), action)).await
    }

    async fn screenshot(&self, id: &SandboxId, format: ScreenshotFormat) -> CallResult<Vec<u8>> {
        self.call(self.client.screenshot(self.context(), id.clone(), format)).await
    }

    async fn open(&self, id: &SandboxId, target: String) -> CallResult<()> {
        self.call(self.client.open(self.context(), id.clone(), target)).await
    }

    async fn launch(
        &self,
        id: &SandboxId,
        application: String,
        uri: Option<String>,
    ) -> CallResult<()> {
        self.call(
            self.client
                .launch(self.context(), id.clone(), application, uri),
        )
        .await
    }

    async fn current_window(&self, id: &SandboxId) -> CallResult<WindowId> {
        self.call(self.client.current_window(self.context(), id.clone())).await
    }

    async fn application_windows(
        &self,
        id: &SandboxId,
        application: String,
    ) -> CallResult<Vec<WindowId>> {
        self.call(
            self.client
                .application_windows(self.context(), id.clone(), application),
        )
        .await
    }

    async fn window_title(&self, id: &SandboxId, window: WindowId) -> CallResult<String> {
        self.call(
            self.client
                .window_title(self.context(), id.clone(), window),
        )
        .await
    }

    async fn read_file(&self, id: &SandboxId, path: String) -> CallResult<FileContent> {
        self.call(self.client.read_file(self.context(), id.clone(), path)).await
    }

    async fn write_file(
        &self,
        id: &SandboxId,
        path: String,
        content: FileContent,
    ) -> CallResult<()> {
        self.call(
            self.client
                .write_file(self.context(), id.clone(), path, content),
        )
        .await
    }

    async fn file_exists(&self, id: &SandboxId, path: String) -> CallResult<bool> {
        self.call(self.client.file_exists(self.context(), id.clone(), path)).await
    }

    async fn remove_file(&self, id: &SandboxId, path: String) -> CallResult<()> {
        self.call(self.client.remove_file(self.context(), id.clone(), path)).await
    }

    async fn stream_start(&self, id: &SandboxId, options: StreamOptions) -> CallResult<()> {
        self.call(
            self.client
                .stream_start(self.context(), id.clone(), options),
        )
        .await
    }

    async fn stream_auth_key(&self, id: &SandboxId) -> CallResult<AuthKey> {
        self.call(self.client.stream_auth_key(self.context(), id.clone())).await
    }

    async fn stream_stop(&self, id: &SandboxId) -> CallResult<()> {
        self.call(self.client.stream_stop(self.context(), id.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_deadline_follows_request_timeout() {
        let before = Instant::now();
        let ctx = deadline_context(Duration::from_secs(30));
        assert!(ctx.deadline >= before + Duration::from_secs(30));
        assert!(ctx.deadline <= Instant::now() + Duration::from_secs(30));
    }

    #[tokio::test]
    async fn deadline_exceeded_reports_configured_timeout() {
        let err = call::<()>(
            async { Err(RpcError::DeadlineExceeded) },
            Duration::from_secs(30),
        )
        .await
        .unwrap_err();
        assert_eq!(err, CallError::DeadlineExceeded(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn other_rpc_failures_are_transport_errors() {
        let err = call::<()>(async { Err(RpcError::Shutdown) }, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Transport(_)));
    }
}
