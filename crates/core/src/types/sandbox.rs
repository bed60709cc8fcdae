use super::ScreenSize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier of a remote sandbox, assigned by the backend.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SandboxId(String);

impl SandboxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SandboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    /// Accepted by the backend, desktop not yet usable.
    Pending,
    /// Display server and desktop session are up.
    Ready,
    /// Killed explicitly or expired.
    Killed,
}

/// Creation request sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSpec {
    /// Template name or id the sandbox is created from.
    pub template: String,
    pub resolution: ScreenSize,
    pub dpi: u32,
    /// X display name, e.g. `:0`.
    pub display: String,
    /// Server-side lifetime in seconds after which the backend kills the
    /// sandbox. `None` uses the backend default.
    pub lifetime_secs: Option<u64>,
    #[serde(default)]
    pub envs: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
