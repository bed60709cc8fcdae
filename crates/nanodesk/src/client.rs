//! Entry point: connects to a backend and creates sandboxes.

use crate::builder::{CreateOptions, SandboxBuilder};
use crate::config::ClientConfig;
use crate::rpc::RpcTransport;
use crate::session::{Sandbox, SessionInner};
use nanodesk_core::{
    CallResult, Error, Operation, Result, SandboxId, SandboxStatus, Scope, Transport,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use url::Url;

const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Client for a desktop sandbox backend.
///
/// Cheap to clone; clones share the underlying connection.
///
/// # Example
///
/// ```rust,no_run
/// use nanodesk::{ClientConfig, DesktopClient};
///
/// # async fn example() -> nanodesk::Result<()> {
/// let client = DesktopClient::connect(
///     &ClientConfig::new("desktops.example.com:49983").with_api_key("nd_live_1234"),
/// )
/// .await?;
///
/// let sandbox = client.sandbox().create().await?;
/// sandbox.move_mouse(100, 200).await?;
/// sandbox.left_click().await?;
/// sandbox.kill().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DesktopClient {
    transport: Arc<dyn Transport>,
    stream_base: Url,
    request_timeout: Duration,
    ready_timeout: Duration,
}

impl DesktopClient {
    /// Connects to the endpoint in `config` and authenticates.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = RpcTransport::connect(config).await?;
        tracing::info!(endpoint = %config.endpoint, "connected to desktop backend");
        Self::with_transport(config, Arc::new(transport))
    }

    /// Builds a client on top of an existing transport.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let stream_base = config.validate()?;
        Ok(Self {
            transport,
            stream_base,
            request_timeout: config.request_timeout,
            ready_timeout: config.ready_timeout,
        })
    }

    /// Starts building a sandbox with default options.
    pub fn sandbox(&self) -> SandboxBuilder<'_> {
        SandboxBuilder::new(self)
    }

    /// Creates a sandbox and waits until its desktop is ready.
    ///
    /// The whole creation, including the readiness wait and the initial
    /// screen size query, is bounded by the ready timeout. On timeout no
    /// handle is returned.
    pub async fn create(&self, options: CreateOptions) -> Result<Sandbox> {
        let op = Operation::Create;
        options.validate().map_err(|reason| Error::Validation {
            op,
            scope: Scope::Client,
            reason,
        })?;

        let wait = options.ready_timeout.unwrap_or(self.ready_timeout);
        let started = Instant::now();
        let deadline = started + wait;

        let spec = options.to_spec();
        let id = self
            .bounded(op, Scope::Client, deadline, wait, self.transport.create(spec))
            .await?;
        tracing::debug!(sandbox_id = %id, template = %options.template, "sandbox accepted");

        let inner = SessionInner::new(
            id.clone(),
            Arc::clone(&self.transport),
            options.display.clone(),
            self.request_timeout,
            options.resolution,
        );

        self.wait_ready(&id, deadline, wait).await?;

        let scope = Scope::Sandbox(id.clone());
        let size = self
            .bounded(op, scope, deadline, wait, self.transport.screen_size(&id))
            .await?;
        inner.input.lock().await.screen = size;
        inner.mark_ready();

        tracing::info!(
            sandbox_id = %id,
            screen = %size,
            elapsed = ?started.elapsed(),
            "sandbox ready"
        );
        Ok(Sandbox::new(Arc::new(inner), self.stream_base.clone()))
    }

    /// Polls the backend with exponential backoff until the sandbox is ready.
    async fn wait_ready(&self, id: &SandboxId, deadline: Instant, wait: Duration) -> Result<()> {
        let op = Operation::Create;
        let scope = Scope::Sandbox(id.clone());
        let mut interval = INITIAL_POLL_INTERVAL;

        loop {
            let status = self
                .bounded(op, scope.clone(), deadline, wait, self.transport.status(id))
                .await?;
            match status {
                SandboxStatus::Ready => return Ok(()),
                SandboxStatus::Killed => {
                    return Err(Error::State {
                        op,
                        scope,
                        reason: "sandbox was killed before it became ready".to_string(),
                    });
                }
                SandboxStatus::Pending => {
                    tracing::debug!(sandbox_id = %id, "sandbox pending, retrying in {:?}", interval);
                }
            }

            if timeout_at(deadline, sleep(interval)).await.is_err() {
                tracing::warn!(sandbox_id = %id, "sandbox did not become ready within {:?}", wait);
                return Err(Error::Timeout {
                    op,
                    scope,
                    after: wait,
                });
            }
            interval = (interval * 2).min(MAX_POLL_INTERVAL);
        }
    }

    /// Runs one creation-phase call bounded by both the request timeout and
    /// the overall creation deadline.
    async fn bounded<T>(
        &self,
        op: Operation,
        scope: Scope,
        deadline: Instant,
        wait: Duration,
        call: impl Future<Output = CallResult<T>>,
    ) -> Result<T> {
        let call_deadline = deadline.min(Instant::now() + self.request_timeout);
        match timeout_at(call_deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::from_call(op, scope, e)),
            Err(_) => {
                let after = if call_deadline >= deadline {
                    wait
                } else {
                    self.request_timeout
                };
                Err(Error::Timeout { op, scope, after })
            }
        }
    }
}

impl std::fmt::Debug for DesktopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopClient")
            .field("stream_base", &self.stream_base.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("ready_timeout", &self.ready_timeout)
            .finish()
    }
}
