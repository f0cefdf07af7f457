use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tiny_skia::Color;

/// 8-bit RGB triple as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_color(self) -> Color {
        Color::from_rgba8(self.0, self.1, self.2, 255)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Rgb(c[0], c[1], c[2])
    }
}

/// Screen appearance and window placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub background: Rgb,
    pub text_color: Rgb,
    pub font_path: PathBuf,
    pub text_size: f32,
    /// Windowed instead of fullscreen
    pub window_mode: bool,
    pub window_size: (u32, u32),
    /// Monitor index for fullscreen
    pub display: Option<usize>,
    /// Fullscreen video mode; the monitor's current mode when unset
    pub resolution: Option<(u32, u32)>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            background: Rgb(240, 240, 240),
            text_color: Rgb(0, 0, 0),
            font_path: PathBuf::from("fonts").join("ARIALN.TTF"),
            text_size: 48.0,
            window_mode: false,
            window_size: (1220, 700),
            display: None,
            resolution: None,
        }
    }
}

/// Fixation cross geometry (px)
pub const FIXATION_SIZE: u32 = 25;
pub const FIXATION_LINE_WIDTH: u32 = 3;

/// Text boxes wrap at this fraction of the screen width
pub const TEXT_BOX_WIDTH_RATIO: f32 = 0.8;
