//! File access inside a sandbox.

use crate::session::SessionInner;
use nanodesk_core::{FileContent, Operation, Result};

/// Home directory of the desktop user.
pub const SANDBOX_HOME: &str = "/home/user";

/// Joins `relative` under [`SANDBOX_HOME`].
///
/// ```rust
/// assert_eq!(nanodesk::files::home_path("Desktop/notes.txt"), "/home/user/Desktop/notes.txt");
/// ```
pub fn home_path(relative: &str) -> String {
    format!("{}/{}", SANDBOX_HOME, relative.trim_start_matches('/'))
}

/// Proxy for the sandbox filesystem, obtained from
/// [`Sandbox::files`](crate::Sandbox::files).
///
/// Paths must be absolute. File operations are ordered with input on the
/// same sandbox, so a file written before a click is visible to whatever
/// the click opens.
pub struct Files<'a> {
    session: &'a SessionInner,
}

impl<'a> Files<'a> {
    pub(crate) fn new(session: &'a SessionInner) -> Self {
        Self { session }
    }

    /// Creates or overwrites `path` with `content`.
    pub async fn write(&self, path: &str, content: impl Into<FileContent>) -> Result<()> {
        let op = Operation::WriteFile;
        let seq = self.session.sequence(op).await?;
        validate_path(path).map_err(|reason| seq.invalid(op, reason))?;

        let content = content.into();
        let len = content.len();
        seq.call(
            op,
            self.session
                .transport()
                .write_file(self.session.id(), path.to_string(), content),
        )
        .await?;
        tracing::debug!(sandbox_id = %self.session.id(), path, len, "file written");
        Ok(())
    }

    /// Reads `path` back in the form it was written.
    pub async fn read(&self, path: &str) -> Result<FileContent> {
        let op = Operation::ReadFile;
        let seq = self.session.sequence(op).await?;
        validate_path(path).map_err(|reason| seq.invalid(op, reason))?;

        seq.call(
            op,
            self.session
                .transport()
                .read_file(self.session.id(), path.to_string()),
        )
        .await
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        let op = Operation::FileExists;
        let seq = self.session.sequence(op).await?;
        validate_path(path).map_err(|reason| seq.invalid(op, reason))?;

        seq.call(
            op,
            self.session
                .transport()
                .file_exists(self.session.id(), path.to_string()),
        )
        .await
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        let op = Operation::RemoveFile;
        let seq = self.session.sequence(op).await?;
        validate_path(path).map_err(|reason| seq.invalid(op, reason))?;

        seq.call(
            op,
            self.session
                .transport()
                .remove_file(self.session.id(), path.to_string()),
        )
        .await
    }
}

fn validate_path(path: &str) -> std::result::Result<(), String> {
    if path.is_empty() {
        return Err("path must not be empty".to_string());
    }
    if path.contains('\0') {
        return Err("path must not contain NUL bytes".to_string());
    }
    if !path.starts_with('/') {
        return Err(format!("path '{}' must be absolute", path));
    }
    if path.split('/').any(|component| component == "..") {
        return Err(format!("path '{}' must not contain '..'", path));
    }
    Ok(())
}
