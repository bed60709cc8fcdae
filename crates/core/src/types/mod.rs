mod display;
mod file;
mod input;
mod sandbox;
mod stream;

pub use display::{CursorPosition, ScreenSize, ScreenshotFormat, WindowId};
pub use file::FileContent;
pub use input::{InputAction, MouseButton, ScrollDirection};
pub use sandbox::{CreateSpec, SandboxId, SandboxStatus};
pub use stream::{AuthKey, StreamOptions};
