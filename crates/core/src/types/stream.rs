use super::WindowId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options for starting the display stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Gate the stream behind an auth key.
    pub require_auth: bool,
    /// Stream a single window instead of the whole display.
    pub window_id: Option<WindowId>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    pub fn window(mut self, window_id: WindowId) -> Self {
        self.window_id = Some(window_id);
        self
    }
}

/// Bearer token granting access to one stream session.
///
/// Treat as a secret: `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthKey(String);

impl AuthKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_key_debug_is_redacted() {
        let key = AuthKey::new("s3cr3t");
        assert_eq!(format!("{key:?}"), "AuthKey(<redacted>)");
        assert_eq!(key.as_str(), "s3cr3t");
    }

    #[test]
    fn stream_options_builder() {
        let options = StreamOptions::new()
            .require_auth(true)
            .window(WindowId::new("0x1a00003"));
        assert!(options.require_auth);
        assert_eq!(options.window_id, Some(WindowId::new("0x1a00003")));
    }
}
