//! Sandbox creation options and builder.

use crate::client::DesktopClient;
use crate::session::Sandbox;
use nanodesk_core::{CreateSpec, Result, ScreenSize};
use std::collections::HashMap;
use std::time::Duration;

/// Template a sandbox is created from unless another is given.
pub const DEFAULT_TEMPLATE: &str = "desktop";

pub const DEFAULT_DPI: u32 = 96;

pub const DEFAULT_DISPLAY: &str = ":0";

/// Everything [`DesktopClient::create`] needs to start a sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOptions {
    pub template: String,
    pub resolution: ScreenSize,
    pub dpi: u32,
    /// X display name, e.g. `:0`. Exported to the sandbox as `DISPLAY`,
    /// replacing any `DISPLAY` in `envs`.
    pub display: String,
    /// Overrides the client's ready timeout for this sandbox.
    pub ready_timeout: Option<Duration>,
    /// Server-side lifetime; the backend kills the sandbox after it.
    pub lifetime: Option<Duration>,
    pub envs: HashMap<String, String>,
    pub metadata: HashMap<String, String>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            resolution: ScreenSize::default(),
            dpi: DEFAULT_DPI,
            display: DEFAULT_DISPLAY.to_string(),
            ready_timeout: None,
            lifetime: None,
            envs: HashMap::new(),
            metadata: HashMap::new(),
        }
    }
}

impl CreateOptions {
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.template.trim().is_empty() {
            return Err("template must not be empty".to_string());
        }
        if self.resolution.width <= 0 || self.resolution.height <= 0 {
            return Err(format!(
                "resolution must be positive, got {}",
                self.resolution
            ));
        }
        if self.dpi == 0 {
            return Err("dpi must be greater than zero".to_string());
        }
        if !self.display.starts_with(':') {
            return Err(format!(
                "display '{}' must look like ':<number>'",
                self.display
            ));
        }
        if self.ready_timeout.is_some_and(|t| t.is_zero()) {
            return Err("ready timeout must be greater than zero".to_string());
        }
        if self.lifetime.is_some_and(|l| l.as_secs() == 0) {
            return Err("lifetime must be at least one second".to_string());
        }
        Ok(())
    }

    pub(crate) fn to_spec(&self) -> CreateSpec {
        let mut envs = self.envs.clone();
        envs.insert("DISPLAY".to_string(), self.display.clone());

        CreateSpec {
            template: self.template.clone(),
            resolution: self.resolution,
            dpi: self.dpi,
            display: self.display.clone(),
            lifetime_secs: self.lifetime.map(|l| l.as_secs()),
            envs,
            metadata: self.metadata.clone(),
        }
    }
}

/// Fluent builder over [`CreateOptions`].
///
/// # Example
///
/// ```rust,ignore
/// let sandbox = client
///     .sandbox()
///     .resolution(1280, 800)
///     .env("LANG", "en_US.UTF-8")
///     .ready_timeout(Duration::from_secs(30))
///     .create()
///     .await?;
/// ```
pub struct SandboxBuilder<'a> {
    client: &'a DesktopClient,
    options: CreateOptions,
}

impl<'a> SandboxBuilder<'a> {
    pub(crate) fn new(client: &'a DesktopClient) -> Self {
        Self {
            client,
            options: CreateOptions::default(),
        }
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.options.template = template.into();
        self
    }

    pub fn resolution(mut self, width: i32, height: i32) -> Self {
        self.options.resolution = ScreenSize::new(width, height);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.options.dpi = dpi;
        self
    }

    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.options.display = display.into();
        self
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.options.ready_timeout = Some(timeout);
        self
    }

    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.options.lifetime = Some(lifetime);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.envs.insert(key.into(), value.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the options collected so far.
    pub fn options(&self) -> &CreateOptions {
        &self.options
    }

    /// Creates the sandbox and waits until it is ready.
    pub async fn create(self) -> Result<Sandbox> {
        self.client.create(self.options).await
    }
}
