//! Software framebuffer of the fake desktop.

use nanodesk_core::{CallError, CursorPosition, ScreenSize};
use std::io::Cursor;

/// Height of the top panel. The panel itself is not clickable.
pub const PANEL_HEIGHT: i32 = 24;

const DESKTOP: [u8; 4] = [58, 110, 165, 255];
const PANEL: [u8; 4] = [45, 45, 45, 255];
const MENU: [u8; 4] = [240, 240, 240, 255];
const MENU_BORDER: [u8; 4] = [120, 120, 120, 255];

const MENU_WIDTH: i32 = 180;
const MENU_HEIGHT: i32 = 220;

/// Axis-aligned rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, at: CursorPosition) -> bool {
        at.x >= self.x && at.x < self.x + self.width && at.y >= self.y && at.y < self.y + self.height
    }

    /// The desktop area below the panel.
    pub fn desktop(screen: ScreenSize) -> Self {
        Self::new(0, PANEL_HEIGHT, screen.width, screen.height - PANEL_HEIGHT)
    }
}

/// Where a context menu opened at `at` is drawn, kept on screen.
pub(super) fn menu_at(at: CursorPosition, screen: ScreenSize) -> Region {
    let x = (at.x + 1).min(screen.width - MENU_WIDTH).max(0);
    let y = (at.y + 1).min(screen.height - MENU_HEIGHT).max(0);
    Region::new(x, y, MENU_WIDTH, MENU_HEIGHT)
}

/// Renders the desktop as RGBA8, row-major.
pub(super) fn render(screen: ScreenSize, menu: Option<Region>) -> Vec<u8> {
    let (width, height) = (screen.width.max(0) as usize, screen.height.max(0) as usize);
    let mut pixels = Vec::with_capacity(width * height * 4);

    for y in 0..screen.height {
        for x in 0..screen.width {
            let at = CursorPosition::new(x, y);
            let color = match menu {
                Some(menu) if menu.contains(at) => {
                    let edge = x == menu.x
                        || y == menu.y
                        || x == menu.x + menu.width - 1
                        || y == menu.y + menu.height - 1;
                    if edge { MENU_BORDER } else { MENU }
                }
                _ if y < PANEL_HEIGHT => PANEL,
                _ => DESKTOP,
            };
            pixels.extend_from_slice(&color);
        }
    }
    pixels
}

pub(super) fn encode_png(screen: ScreenSize, raw: Vec<u8>) -> Result<Vec<u8>, CallError> {
    let image = image::RgbaImage::from_raw(screen.width as u32, screen.height as u32, raw)
        .ok_or_else(|| CallError::Transport("framebuffer size mismatch".to_string()))?;

    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| CallError::Transport(format!("failed to encode screenshot: {}", e)))?;
    Ok(png)
}
