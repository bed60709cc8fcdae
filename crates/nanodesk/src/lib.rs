//! Client for ephemeral remote desktop sandboxes.
//!
//! nanodesk drives Linux desktops running in disposable sandboxes: it moves
//! the mouse, types, takes screenshots, shares the display through an
//! authenticated stream and moves files in and out. It is built for agents
//! and end-to-end tests that need a real desktop without owning one.
//!
//! # Quick Start
//!
//! All interaction starts with [`DesktopClient`]:
//!
//! ```rust,no_run
//! use nanodesk::{ClientConfig, DesktopClient, ScreenshotFormat};
//!
//! # async fn example() -> nanodesk::Result<()> {
//! let config = ClientConfig::new("desktops.example.com:49983").with_api_key("nd_live_1234");
//! let client = DesktopClient::connect(&config).await?;
//!
//! let sandbox = client.sandbox().resolution(1280, 800).create().await?;
//!
//! let size = sandbox.get_screen_size().await?;
//! sandbox.move_mouse(size.width / 2, size.height / 2).await?;
//! sandbox.right_click().await?;
//! let png = sandbox.screenshot(ScreenshotFormat::Png).await?;
//!
//! sandbox.files().write("/home/user/notes.txt", "hello").await?;
//! sandbox.kill().await?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```
//!
//! # Ordering
//!
//! Every operation on a [`Sandbox`] is applied remotely in the order it was
//! issued, and a screenshot reflects everything completed before it. The
//! stream has its own ordering, shared with [`Sandbox::kill`].
//!
//! # Errors
//!
//! All fallible calls return [`Error`], which carries the [`Operation`] and
//! the [`Scope`] (client, sandbox or stream) it happened in.

mod builder;
mod client;
mod config;
pub mod files;
mod input;
mod rpc;
mod session;
mod stream;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use builder::{
    CreateOptions, DEFAULT_DISPLAY, DEFAULT_DPI, DEFAULT_TEMPLATE, SandboxBuilder,
};
pub use client::DesktopClient;
pub use config::{ClientConfig, DEFAULT_READY_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use files::Files;
pub use input::{DEFAULT_CHUNK_SIZE, DEFAULT_TYPE_DELAY, TypeOptions};
pub use rpc::RpcTransport;
pub use session::{Sandbox, SessionState};
pub use stream::{ResizeMode, StreamHandle, StreamUrlOptions};

pub use nanodesk_protocol::DEFAULT_PORT;

pub use nanodesk_core::{
    AuthKey, CallError, CallResult, CreateSpec, CursorPosition, Error, FileContent, InputAction,
    MouseButton, Operation, Result, SandboxId, SandboxStatus, Scope, ScreenSize,
    ScreenshotFormat, ScrollDirection, StreamOptions, Transport, WindowId,
};
