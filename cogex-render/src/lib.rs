pub mod display;
pub mod frame;
pub mod text;

pub use display::{DisplayConfig, Rgb};
pub use frame::{FrameComposer, pixmap_from_rgba};
pub use text::TextRasterizer;
