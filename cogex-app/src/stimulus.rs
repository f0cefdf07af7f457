use std::path::Path;
use std::sync::Arc;

use cogex_core::{AssetKind, AssetRequest, LoadError};
use cogex_render::pixmap_from_rgba;
use tiny_skia::Pixmap;

use crate::audio::SoundClip;

/// Catalog handle of the window backend: a ready-to-blit pixmap or an
/// in-memory sound
#[derive(Clone)]
pub enum Stimulus {
    Visual(Arc<Pixmap>),
    Sound(SoundClip),
}

impl Stimulus {
    pub fn visual(pixmap: Pixmap) -> Self {
        Stimulus::Visual(Arc::new(pixmap))
    }
}

/// Decodes any format the `image` crate knows into a premultiplied pixmap
pub fn load_picture(path: &Path) -> Result<Pixmap, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let decode = |reason: String| LoadError::Decode {
        kind: AssetKind::Picture,
        key: path.display().to_string(),
        reason,
    };
    let rgba = image::open(path)
        .map_err(|e| decode(e.to_string()))?
        .into_rgba8();
    let (width, height) = rgba.dimensions();
    pixmap_from_rgba(width, height, rgba.as_raw()).map_err(|e| decode(e.to_string()))
}

/// Wraps a rendering failure of a text stimulus
pub fn text_error(request: &AssetRequest, e: anyhow::Error) -> LoadError {
    LoadError::Decode {
        kind: request.kind,
        key: request.key.clone(),
        reason: format!("{e:#}"),
    }
}
