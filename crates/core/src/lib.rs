//! Core types and traits shared by the nanodesk client and its wire protocol.

pub mod error;
pub mod transport;
pub mod types;

pub use error::{CallError, CallResult, Error, Operation, Result, Scope};
pub use transport::Transport;
pub use types::{
    AuthKey, CreateSpec, CursorPosition, FileContent, InputAction, MouseButton, SandboxId,
    SandboxStatus, ScreenSize, ScreenshotFormat, ScrollDirection, StreamOptions, WindowId,
};
