use anyhow::{anyhow, bail, Result};
use bytemuck::try_cast_slice;
use tiny_skia::{Color, Paint, Pixmap, PremultipliedColorU8, Rect, Transform};

use crate::display::{FIXATION_LINE_WIDTH, FIXATION_SIZE};

/// Owns the offscreen canvas every screen is composed on before it is
/// copied to the window surface. Screens are always drawn whole: background
/// first, then at most one centred stimulus.
pub struct FrameComposer {
    background: Color,
    canvas: Pixmap,
    cross: Pixmap,
}

impl FrameComposer {
    pub fn new(width: u32, height: u32, background: Color, foreground: Color) -> Result<Self> {
        let canvas = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow!("cannot allocate {width}x{height} canvas"))?;
        let mut composer = Self {
            background,
            canvas,
            cross: fixation_cross(foreground)?,
        };
        composer.compose_blank();
        Ok(composer)
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == (self.width(), self.height()) {
            return Ok(());
        }
        self.canvas = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow!("cannot allocate {width}x{height} canvas"))?;
        self.compose_blank();
        Ok(())
    }

    /// Background only
    pub fn compose_blank(&mut self) {
        self.canvas.fill(self.background);
    }

    pub fn compose_fixation(&mut self) {
        self.compose_blank();
        blit_centered(&mut self.canvas, &self.cross);
    }

    /// Background plus `stimulus` in the middle of the screen
    pub fn compose_centered(&mut self, stimulus: &Pixmap) {
        self.compose_blank();
        blit_centered(&mut self.canvas, stimulus);
    }

    /// Copies the canvas into an RGBA8 surface of the same size. The canvas
    /// is opaque, so premultiplied and straight alpha coincide.
    pub fn copy_to(&self, frame: &mut [u8]) -> Result<()> {
        let src = self.canvas.data();
        if frame.len() != src.len() {
            bail!(
                "surface is {} bytes, canvas {}x{} needs {}",
                frame.len(),
                self.width(),
                self.height(),
                src.len()
            );
        }
        frame.copy_from_slice(src);
        Ok(())
    }
}

/// Draws `pixmap` centred on `canvas`, clipped to its bounds
fn blit_centered(canvas: &mut Pixmap, pixmap: &Pixmap) {
    let w = pixmap.width() as usize;
    let h = pixmap.height() as usize;
    let cx = canvas.width() as f32 * 0.5;
    let cy = canvas.height() as f32 * 0.5;

    let x0 = (cx - w as f32 * 0.5).floor() as i32;
    let y0 = (cy - h as f32 * 0.5).floor() as i32;

    // clip to the canvas
    let dst_x_start = x0.max(0) as usize;
    let dst_y_start = y0.max(0) as usize;
    let dst_x_end = (x0 + w as i32).min(canvas.width() as i32).max(0) as usize;
    let dst_y_end = (y0 + h as i32).min(canvas.height() as i32).max(0) as usize;
    let src_x_start = (-x0).max(0) as usize;
    let src_y_start = (-y0).max(0) as usize;

    let max_w = dst_x_end.saturating_sub(dst_x_start);
    let max_h = dst_y_end.saturating_sub(dst_y_start);
    if max_w == 0 || max_h == 0 {
        return;
    }

    let src_data = pixmap.data();
    let pixmap_stride = w;
    let canvas_stride = canvas.width() as usize;
    let dst_data = canvas.data_mut();

    let fully_opaque = (0..max_h).all(|y| {
        let row = (src_y_start + y) * pixmap_stride + src_x_start;
        (0..max_w).all(|x| src_data[(row + x) * 4 + 3] == 255)
    });

    if fully_opaque {
        for y in 0..max_h {
            let src_row = ((src_y_start + y) * pixmap_stride + src_x_start) * 4;
            let dst_row = ((dst_y_start + y) * canvas_stride + dst_x_start) * 4;
            dst_data[dst_row..dst_row + max_w * 4]
                .copy_from_slice(&src_data[src_row..src_row + max_w * 4]);
        }
        return;
    }

    // premultiplied source-over
    for y in 0..max_h {
        for x in 0..max_w {
            let s = ((src_y_start + y) * pixmap_stride + (src_x_start + x)) * 4;
            let d = ((dst_y_start + y) * canvas_stride + (dst_x_start + x)) * 4;
            let inv_a = 255 - src_data[s + 3] as u32;
            for c in 0..4 {
                let blended = src_data[s + c] as u32 + (dst_data[d + c] as u32 * inv_a + 127) / 255;
                dst_data[d + c] = blended.min(255) as u8;
            }
        }
    }
}

/// Cross of `FIXATION_SIZE` px arms, `FIXATION_LINE_WIDTH` px thick
fn fixation_cross(color: Color) -> Result<Pixmap> {
    let size = FIXATION_SIZE as f32;
    let line = FIXATION_LINE_WIDTH as f32;
    let mut pm = Pixmap::new(FIXATION_SIZE, FIXATION_SIZE)
        .ok_or_else(|| anyhow!("cannot allocate fixation cross"))?;

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(color);

    let bars = [
        Rect::from_xywh(0.0, (size - line) * 0.5, size, line),
        Rect::from_xywh((size - line) * 0.5, 0.0, line, size),
    ];
    for bar in bars {
        let bar = bar.ok_or_else(|| anyhow!("degenerate fixation cross"))?;
        pm.fill_rect(bar, &paint, Transform::identity(), None);
    }
    Ok(pm)
}

/// Wraps straight-alpha RGBA8 pixels (as decoded from an image file) into a
/// premultiplied pixmap
pub fn pixmap_from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Pixmap> {
    let pixels: &[[u8; 4]] =
        try_cast_slice(rgba).map_err(|e| anyhow!("pixel buffer is not RGBA8: {e:?}"))?;
    if pixels.len() != width as usize * height as usize {
        bail!(
            "{} pixels for a {width}x{height} image",
            pixels.len()
        );
    }
    let mut pm = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate {width}x{height} picture"))?;
    for (dst, &[r, g, b, a]) in pm.pixels_mut().iter_mut().zip(pixels) {
        let premul = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
        if let Some(px) = PremultipliedColorU8::from_rgba(premul(r), premul(g), premul(b), a) {
            *dst = px;
        }
    }
    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(pm: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * pm.width() + x) * 4) as usize;
        let d = pm.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    fn composer() -> FrameComposer {
        FrameComposer::new(
            200,
            100,
            Color::from_rgba8(240, 240, 240, 255),
            Color::BLACK,
        )
        .unwrap()
    }

    #[test]
    fn blank_is_background_everywhere() {
        let c = composer();
        assert!(c.canvas().data().chunks(4).all(|p| p == [240, 240, 240, 255]));
    }

    #[test]
    fn fixation_cross_is_centred() {
        let mut c = composer();
        c.compose_fixation();
        assert_eq!(pixel(c.canvas(), 100, 50), [0, 0, 0, 255]);
        // arm tips
        assert_eq!(pixel(c.canvas(), 88, 50), [0, 0, 0, 255]);
        assert_eq!(pixel(c.canvas(), 100, 38), [0, 0, 0, 255]);
        // outside the arms
        assert_eq!(pixel(c.canvas(), 92, 42), [240, 240, 240, 255]);
        assert_eq!(pixel(c.canvas(), 70, 50), [240, 240, 240, 255]);
    }

    #[test]
    fn translucent_stimulus_blends_over_background() {
        let mut c = composer();
        let half_red = pixmap_from_rgba(2, 2, &[255, 0, 0, 128].repeat(4)).unwrap();
        c.compose_centered(&half_red);
        let [r, g, _, a] = pixel(c.canvas(), 100, 50);
        assert_eq!(a, 255);
        assert!(r > 240 && g < 130 && g > 110, "{r} {g}");
        assert_eq!(pixel(c.canvas(), 0, 0), [240, 240, 240, 255]);
    }

    #[test]
    fn oversized_picture_is_clipped() {
        let mut c = composer();
        let big = pixmap_from_rgba(400, 300, &[10, 20, 30, 255].repeat(400 * 300)).unwrap();
        c.compose_centered(&big);
        assert!(c.canvas().data().chunks(4).all(|p| p == [10, 20, 30, 255]));
    }

    #[test]
    fn rgba_conversion_checks_sizes() {
        assert!(pixmap_from_rgba(2, 2, &[0; 15]).is_err());
        assert!(pixmap_from_rgba(2, 2, &[0; 12]).is_err());
        let pm = pixmap_from_rgba(1, 1, &[200, 100, 50, 0]).unwrap();
        assert_eq!(pixel(&pm, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn copy_to_requires_matching_surface() {
        let mut c = composer();
        let mut frame = vec![0u8; 200 * 100 * 4];
        c.copy_to(&mut frame).unwrap();
        assert_eq!(&frame[..4], &[240, 240, 240, 255]);
        c.resize(10, 10).unwrap();
        assert!(c.copy_to(&mut frame).is_err());
    }
}
