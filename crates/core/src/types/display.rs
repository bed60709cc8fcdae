use serde::{Deserialize, Serialize};
use std::fmt;

/// Display resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether `(x, y)` lies within `[0, width) × [0, height)`.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y)
    }

    /// Center of the screen; where a fresh desktop session parks the cursor.
    pub fn center(&self) -> CursorPosition {
        CursorPosition::new(self.width / 2, self.height / 2)
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

impl From<(i32, i32)> for ScreenSize {
    fn from((width, height): (i32, i32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pointer position in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

impl CursorPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for CursorPosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl PartialEq<(i32, i32)> for CursorPosition {
    fn eq(&self, other: &(i32, i32)) -> bool {
        self.x == other.0 && self.y == other.1
    }
}

impl PartialEq<(i32, i32)> for ScreenSize {
    fn eq(&self, other: &(i32, i32)) -> bool {
        self.width == other.0 && self.height == other.1
    }
}

/// Encoding of a captured framebuffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    /// PNG-encoded image.
    #[default]
    Png,
    /// Uncompressed RGBA8 pixels, row-major, `width * height * 4` bytes.
    Raw,
}

/// Opaque X11 window identifier.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod screen_size {
        use super::*;

        #[test]
        fn default_is_1024_by_768() {
            assert_eq!(ScreenSize::default(), (1024, 768));
        }

        #[test]
        fn contains_is_half_open() {
            let size = ScreenSize::new(1024, 768);
            assert!(size.contains(0, 0));
            assert!(size.contains(1023, 767));
            assert!(!size.contains(1024, 0));
            assert!(!size.contains(0, 768));
            assert!(!size.contains(-1, 10));
        }

        #[test]
        fn center_of_default_screen() {
            assert_eq!(ScreenSize::default().center(), (512, 384));
        }

        #[test]
        fn displays_as_xrandr_mode() {
            assert_eq!(ScreenSize::new(1280, 800).to_string(), "1280x800");
        }
    }

    #[test]
    fn screenshot_format_defaults_to_png() {
        assert_eq!(ScreenshotFormat::default(), ScreenshotFormat::Png);
    }
}
