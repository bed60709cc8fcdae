use crate::types::SandboxId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A client operation, used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Create,
    Kill,
    GetScreenSize,
    GetCursorPosition,
    MoveMouse,
    Click,
    MousePress,
    MouseRelease,
    Scroll,
    WriteText,
    Press,
    Screenshot,
    Open,
    Launch,
    GetCurrentWindowId,
    GetApplicationWindows,
    GetWindowTitle,
    ReadFile,
    WriteFile,
    FileExists,
    RemoveFile,
    StreamStart,
    StreamStop,
    StreamAuthKey,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Create => "create",
            Operation::Kill => "kill",
            Operation::GetScreenSize => "get_screen_size",
            Operation::GetCursorPosition => "get_cursor_position",
            Operation::MoveMouse => "move_mouse",
            Operation::Click => "click",
            Operation::MousePress => "mouse_press",
            Operation::MouseRelease => "mouse_release",
            Operation::Scroll => "scroll",
            Operation::WriteText => "write_text",
            Operation::Press => "press",
            Operation::Screenshot => "screenshot",
            Operation::Open => "open",
            Operation::Launch => "launch",
            Operation::GetCurrentWindowId => "get_current_window_id",
            Operation::GetApplicationWindows => "get_application_windows",
            Operation::GetWindowTitle => "get_window_title",
            Operation::ReadFile => "files.read",
            Operation::WriteFile => "files.write",
            Operation::FileExists => "files.exists",
            Operation::RemoveFile => "files.remove",
            Operation::StreamStart => "stream.start",
            Operation::StreamStop => "stream.stop",
            Operation::StreamAuthKey => "stream.get_auth_key",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource an operation was issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// No sandbox exists yet (connecting, or creation before an id is known).
    Client,
    Sandbox(SandboxId),
    Stream(SandboxId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Client => f.write_str("client"),
            Scope::Sandbox(id) => write!(f, "sandbox {id}"),
            Scope::Stream(id) => write!(f, "stream of sandbox {id}"),
        }
    }
}

/// Failure reported by a [`Transport`](crate::Transport) call.
///
/// The server side of the protocol sends the first five variants; the
/// transport itself produces `DeadlineExceeded` and `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CallError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("sandbox no longer exists: {0}")]
    SandboxGone(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rejected by backend: {0}")]
    Rejected(String),

    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("{0}")]
    Transport(String),
}

pub type CallResult<T> = std::result::Result<T, CallError>;

/// Errors returned by the nanodesk client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{op} on {scope}: invalid argument: {reason}")]
    Validation {
        op: Operation,
        scope: Scope,
        reason: String,
    },

    #[error("{op} on {scope}: timed out after {after:?}")]
    Timeout {
        op: Operation,
        scope: Scope,
        after: Duration,
    },

    #[error("{op} on {scope}: not found: {what}")]
    NotFound {
        op: Operation,
        scope: Scope,
        what: String,
    },

    #[error("{op} on {scope}: invalid state: {reason}")]
    State {
        op: Operation,
        scope: Scope,
        reason: String,
    },

    #[error("{op} on {scope}: transport failure: {reason}")]
    Transport {
        op: Operation,
        scope: Scope,
        reason: String,
    },

    #[error("{op} on {scope}: authentication failed: {reason}")]
    Auth {
        op: Operation,
        scope: Scope,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Attaches operation and scope context to a transport-level failure.
    pub fn from_call(op: Operation, scope: Scope, err: CallError) -> Self {
        match err {
            CallError::NotFound(what) => Error::NotFound { op, scope, what },
            CallError::InvalidState(reason) => Error::State { op, scope, reason },
            CallError::SandboxGone(detail) => Error::State {
                op,
                scope,
                reason: format!("sandbox no longer exists: {detail}"),
            },
            CallError::Unauthorized(reason) => Error::Auth { op, scope, reason },
            CallError::Rejected(reason) => Error::Validation { op, scope, reason },
            CallError::DeadlineExceeded(after) => Error::Timeout { op, scope, after },
            CallError::Transport(reason) => Error::Transport { op, scope, reason },
        }
    }

    /// Returns the operation the error occurred in, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Validation { op, .. }
            | Error::Timeout { op, .. }
            | Error::NotFound { op, .. }
            | Error::State { op, .. }
            | Error::Transport { op, .. }
            | Error::Auth { op, .. } => Some(*op),
            Error::InvalidConfig(_) => None,
        }
    }

    /// Returns the session or stream the error occurred on, if any.
    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Error::Validation { scope, .. }
            | Error::Timeout { scope, .. }
            | Error::NotFound { scope, .. }
            | Error::State { scope, .. }
            | Error::Transport { scope, .. }
            | Error::Auth { scope, .. } => Some(scope),
            Error::InvalidConfig(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Scope {
        Scope::Sandbox(SandboxId::new("sbx-1"))
    }

    #[test]
    fn error_display_names_operation_and_sandbox() {
        let err = Error::Validation {
            op: Operation::MoveMouse,
            scope: sandbox(),
            reason: "x=2000 outside 0..1024".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "move_mouse on sandbox sbx-1: invalid argument: x=2000 outside 0..1024"
        );
    }

    #[test]
    fn error_display_names_stream_scope() {
        let err = Error::Auth {
            op: Operation::StreamAuthKey,
            scope: Scope::Stream(SandboxId::new("sbx-1")),
            reason: "stream was started without authentication".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stream.get_auth_key on stream of sandbox sbx-1: authentication failed: \
             stream was started without authentication"
        );
    }

    #[test]
    fn error_display_invalid_config() {
        let err = Error::InvalidConfig("endpoint must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: endpoint must not be empty"
        );
        assert!(err.operation().is_none());
        assert!(err.scope().is_none());
    }

    mod from_call {
        use super::*;

        #[test]
        fn not_found_keeps_detail() {
            let err = Error::from_call(
                Operation::ReadFile,
                sandbox(),
                CallError::NotFound("/home/user/missing.txt".to_string()),
            );
            match err {
                Error::NotFound { op, what, .. } => {
                    assert_eq!(op, Operation::ReadFile);
                    assert_eq!(what, "/home/user/missing.txt");
                }
                other => panic!("expected NotFound, got {other:?}"),
            }
        }

        #[test]
        fn sandbox_gone_is_a_state_error() {
            let err = Error::from_call(
                Operation::Click,
                sandbox(),
                CallError::SandboxGone("expired".to_string()),
            );
            assert!(matches!(err, Error::State { .. }));
            assert!(err.to_string().contains("no longer exists"));
        }

        #[test]
        fn rejected_is_a_validation_error() {
            let err = Error::from_call(
                Operation::Open,
                sandbox(),
                CallError::Rejected("empty target".to_string()),
            );
            assert!(matches!(err, Error::Validation { .. }));
        }

        #[test]
        fn deadline_is_a_timeout() {
            let err = Error::from_call(
                Operation::Screenshot,
                sandbox(),
                CallError::DeadlineExceeded(Duration::from_secs(10)),
            );
            assert!(matches!(err, Error::Timeout { after, .. } if after == Duration::from_secs(10)));
        }

        #[test]
        fn unauthorized_is_an_auth_error() {
            let err = Error::from_call(
                Operation::Connect,
                Scope::Client,
                CallError::Unauthorized("bad api key".to_string()),
            );
            assert!(matches!(err, Error::Auth { .. }));
            assert_eq!(err.scope(), Some(&Scope::Client));
        }
    }

    #[test]
    fn call_error_serialization_roundtrip() {
        let err = CallError::InvalidState("stream already running".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: CallError = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, err);
    }
}
